use std::cell::Cell;
use std::cmp::Ordering;
use std::rc::Rc;

use qsim_core::SimTime;

/// A handle to a scheduled, not-yet-fired event. Cancellation flags the
/// event in place; the simulator checks the flag on dequeue and skips it
/// rather than paying for heap deletion (spec.md §5).
#[derive(Debug, Clone)]
pub struct EventHandle {
    cancelled: Rc<Cell<bool>>,
}

impl EventHandle {
    pub(crate) fn new(cancelled: Rc<Cell<bool>>) -> Self {
        Self { cancelled }
    }

    pub fn cancel(&self) {
        log::trace!("cancelling event");
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// An entry in the simulator's event queue. Ordered by `fire_time`, ties
/// broken by `sequence` so simultaneous events fire in scheduling order
/// (FCFS, spec.md §3 invariant 1).
pub(crate) struct HeapEntry {
    pub fire_time: SimTime,
    pub sequence: u64,
    pub cancelled: Rc<Cell<bool>>,
    pub action: Box<dyn FnOnce() -> anyhow::Result<()>>,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time && self.sequence == other.sequence
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    /// Reversed against natural order so `BinaryHeap` (a max-heap) pops the
    /// smallest `(fire_time, sequence)` pair first, behaving as a min-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_time
            .partial_cmp(&self.fire_time)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    fn entry(fire_time: SimTime, sequence: u64) -> HeapEntry {
        HeapEntry {
            fire_time,
            sequence,
            cancelled: Rc::new(Cell::new(false)),
            action: Box::new(|| Ok(())),
        }
    }

    #[test]
    fn heap_pops_earliest_fire_time_first() {
        let mut heap = BinaryHeap::new();
        heap.push(entry(5.0, 0));
        heap.push(entry(1.0, 1));
        heap.push(entry(3.0, 2));
        let first = heap.pop().unwrap();
        assert_eq!(first.fire_time, 1.0);
    }

    #[test]
    fn ties_break_by_sequence_number() {
        let mut heap = BinaryHeap::new();
        heap.push(entry(2.0, 5));
        heap.push(entry(2.0, 1));
        heap.push(entry(2.0, 3));
        let first = heap.pop().unwrap();
        assert_eq!(first.sequence, 1);
    }

    #[test]
    fn cancel_flags_the_shared_cell() {
        let cancelled = Rc::new(Cell::new(false));
        let handle = EventHandle::new(cancelled.clone());
        assert!(!handle.is_cancelled());
        handle.cancel();
        assert!(cancelled.get());
        assert!(handle.is_cancelled());
    }
}
