use std::cell::{Cell, RefCell};
use std::collections::BinaryHeap;
use std::rc::Rc;

use qsim_core::{IdGen, SimTime};

use crate::client::ClientId;
use crate::client::ClientMark;
use crate::event::{EventHandle, HeapEntry};

/// Summary returned once [`Simulator::run`] exhausts the event queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub events_processed: u64,
    pub final_clock: SimTime,
}

/// The cooperative event-loop core (spec.md §4.C). Owns the clock, the
/// event queue, and the sequence counter that breaks same-instant ties.
/// Stations hold a shared [`SimHandle`] and call back into it from their
/// scheduled closures.
pub struct Simulator {
    clock: SimTime,
    queue: BinaryHeap<HeapEntry>,
    next_sequence: u64,
    client_ids: IdGen<ClientMark>,
}

/// Shared handle stations hold to schedule events and mint client ids.
pub type SimHandle = Rc<RefCell<Simulator>>;

impl Default for Simulator {
    fn default() -> Self {
        Self {
            clock: 0.0,
            queue: BinaryHeap::new(),
            next_sequence: 0,
            client_ids: IdGen::new(),
        }
    }
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_handle() -> SimHandle {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn now(&self) -> SimTime {
        self.clock
    }

    pub fn next_client_id(&mut self) -> ClientId {
        self.client_ids.next_id()
    }

    /// Inserts an event firing at `now + max(0, delay)`. Returns a handle
    /// the caller can use to cancel it before it fires.
    pub fn schedule<F>(&mut self, delay: SimTime, action: F) -> EventHandle
    where
        F: FnOnce() -> anyhow::Result<()> + 'static,
    {
        let fire_time = self.clock + delay.max(0.0);
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        log::trace!("scheduling event #{sequence} at t={fire_time} (delay={delay})");
        let cancelled = Rc::new(Cell::new(false));
        self.queue.push(HeapEntry {
            fire_time,
            sequence,
            cancelled: cancelled.clone(),
            action: Box::new(action),
        });
        EventHandle::new(cancelled)
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Drains the event queue, advancing the clock to each event's
    /// fire_time before invoking it. Stops immediately on the first error,
    /// leaving the remaining queue and any populated recorders intact for
    /// inspection (spec.md §7).
    pub fn run(&mut self) -> anyhow::Result<RunReport> {
        log::debug!("simulator run starting");
        let mut processed = 0u64;
        loop {
            let Some(entry) = self.queue.pop() else {
                break;
            };
            if entry.cancelled.get() {
                log::trace!("skipping cancelled event #{}", entry.sequence);
                continue;
            }
            debug_assert!(entry.fire_time >= self.clock, "clock must not go backward");
            self.clock = entry.fire_time;
            (entry.action)()?;
            processed += 1;
        }
        log::debug!("simulator run finished: {processed} events processed, final clock {}", self.clock);
        Ok(RunReport {
            events_processed: processed,
            final_clock: self.clock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn events_fire_in_nondecreasing_clock_order() {
        let mut sim = Simulator::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for (delay, tag) in [(3.0, "c"), (1.0, "a"), (2.0, "b")] {
            let order = order.clone();
            sim.schedule(delay, move || {
                order.borrow_mut().push(tag);
                Ok(())
            });
        }
        sim.run().unwrap();
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn same_instant_events_fire_in_scheduling_order() {
        let mut sim = Simulator::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            sim.schedule(0.0, move || {
                order.borrow_mut().push(tag);
                Ok(())
            });
        }
        sim.run().unwrap();
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn cancelled_event_is_skipped() {
        let mut sim = Simulator::new();
        let fired = Rc::new(Cell::new(false));
        let f = fired.clone();
        let handle = sim.schedule(1.0, move || {
            f.set(true);
            Ok(())
        });
        handle.cancel();
        sim.run().unwrap();
        assert!(!fired.get());
    }

    #[test]
    fn run_stops_on_first_error_leaving_queue_untouched() {
        let mut sim = Simulator::new();
        sim.schedule(1.0, || Err(qsim_core::error::invariant("boom")));
        sim.schedule(2.0, || Ok(()));
        let err = sim.run();
        assert!(err.is_err());
        assert_eq!(sim.pending_events(), 1);
    }

    #[test]
    fn negative_delay_is_clipped_to_zero() {
        let mut sim = Simulator::new();
        sim.schedule(-5.0, || Ok(()));
        let report = sim.run().unwrap();
        assert_eq!(report.final_clock, 0.0);
    }
}
