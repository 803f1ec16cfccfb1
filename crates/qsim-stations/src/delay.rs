use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use qsim_engine::{Client, SimHandle};
use qsim_sampler::Sampler;

use crate::station::{Station, Successor};

/// A pure time advance: on receive, draws a delay and schedules a handoff
/// to the successor that many units later. No resource contention, no
/// recorders beyond the client's own ledger (spec.md §4.G).
pub struct Delay {
    sim: SimHandle,
    sampler: Arc<dyn Sampler>,
    next: Option<Successor>,
}

impl Delay {
    pub fn new(sim: SimHandle, sampler: Arc<dyn Sampler>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            sim,
            sampler,
            next: None,
        }))
    }

    pub fn set_next(&mut self, next: Successor) {
        self.next = Some(next);
    }
}

impl Station for Delay {
    fn receive(&mut self, client: Client) -> anyhow::Result<()> {
        let d = qsim_sampler::draw_nonneg(self.sampler.as_ref())?;
        log::trace!("delay holding client {:?} for {d}", client.id());
        let next = self
            .next
            .clone()
            .ok_or_else(|| qsim_core::error::configuration("Delay has no successor"))?;
        self.sim.borrow_mut().schedule(d, move || next.borrow_mut().receive(client));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sink {
        received: Vec<(Client, qsim_core::SimTime)>,
        sim: SimHandle,
    }
    impl Station for Sink {
        fn receive(&mut self, client: Client) -> anyhow::Result<()> {
            let now = self.sim.borrow().now();
            self.received.push((client, now));
            Ok(())
        }
    }

    #[test]
    fn advances_time_by_the_drawn_delay() {
        let sim = qsim_engine::Simulator::new_handle();
        let sink = Rc::new(RefCell::new(Sink {
            received: Vec::new(),
            sim: sim.clone(),
        }));
        let delay = Delay::new(sim.clone(), qsim_sampler::deterministic(25.0));
        delay.borrow_mut().set_next(sink.clone());

        let mut ids = qsim_core::IdGen::<qsim_engine::ClientMark>::new();
        delay.borrow_mut().receive(Client::new(ids.next_id(), None, 0.0)).unwrap();
        sim.borrow_mut().run().unwrap();
        assert_eq!(sink.borrow().received.len(), 1);
        assert_eq!(sink.borrow().received[0].1, 25.0);
    }

    #[test]
    fn missing_successor_fails_fast() {
        let sim = qsim_engine::Simulator::new_handle();
        let delay = Delay::new(sim.clone(), qsim_sampler::deterministic(1.0));
        let mut ids = qsim_core::IdGen::<qsim_engine::ClientMark>::new();
        let err = delay.borrow_mut().receive(Client::new(ids.next_id(), None, 0.0));
        assert!(err.is_err());
    }
}
