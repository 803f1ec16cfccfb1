use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use qsim_engine::{Client, SimHandle};
use qsim_sampler::Sampler;

use crate::station::Successor;

/// Configuration for a [`Source`] (spec.md §4.E).
pub struct SourceConfig {
    pub remaining: u64,
    pub inter_arrival: Arc<dyn Sampler>,
    pub batch_size: Option<Arc<dyn Sampler>>,
    pub client_type: Option<String>,
}

impl SourceConfig {
    pub fn new(remaining: u64, inter_arrival: Arc<dyn Sampler>) -> Self {
        Self {
            remaining,
            inter_arrival,
            batch_size: None,
            client_type: None,
        }
    }

    pub fn with_batch_size(mut self, sampler: Arc<dyn Sampler>) -> Self {
        self.batch_size = Some(sampler);
        self
    }

    pub fn with_client_type(mut self, type_name: impl Into<String>) -> Self {
        self.client_type = Some(type_name.into());
        self
    }
}

/// Generates clients from nothing. The only station that does; everything
/// downstream is a derived reaction to what a Source emits.
pub struct Source {
    sim: SimHandle,
    remaining: u64,
    inter_arrival: Arc<dyn Sampler>,
    batch_size: Option<Arc<dyn Sampler>>,
    client_type: Option<String>,
    next: Option<Successor>,
    self_ref: Weak<RefCell<Source>>,
}

impl Source {
    /// Builds the station and schedules its first arrival at `I()`
    /// (spec.md §9 open question, resolved: not at `t=0`). Safe to call
    /// before wiring `set_next` — that event only fires once
    /// `Simulator::run` starts.
    pub fn new(sim: SimHandle, config: SourceConfig) -> anyhow::Result<Rc<RefCell<Self>>> {
        let station = Rc::new(RefCell::new(Self {
            sim,
            remaining: config.remaining,
            inter_arrival: config.inter_arrival,
            batch_size: config.batch_size,
            client_type: config.client_type,
            next: None,
            self_ref: Weak::new(),
        }));
        station.borrow_mut().self_ref = Rc::downgrade(&station);
        if station.borrow().remaining > 0 {
            let delay = qsim_sampler::draw_nonneg(station.borrow().inter_arrival.as_ref())?;
            log::trace!("source scheduling first arrival at t={delay}");
            let handle = station.clone();
            station
                .borrow()
                .sim
                .clone()
                .borrow_mut()
                .schedule(delay, move || handle.borrow_mut().arrive());
        }
        Ok(station)
    }

    pub fn set_next(&mut self, next: Successor) {
        self.next = Some(next);
    }

    fn handle(&self) -> Rc<RefCell<Source>> {
        self.self_ref.upgrade().expect("source dropped while an arrival was scheduled")
    }

    fn arrive(&mut self) -> anyhow::Result<()> {
        let now = self.sim.borrow().now();
        let batch = match &self.batch_size {
            Some(sampler) => qsim_sampler::draw_nonneg(sampler.as_ref())?.round().max(1.0) as u64,
            None => 1,
        };
        let n = batch.min(self.remaining);
        let next = self
            .next
            .clone()
            .ok_or_else(|| qsim_core::error::configuration("Source has no successor"))?;
        for _ in 0..n {
            let id = self.sim.borrow_mut().next_client_id();
            let client = Client::new(id, self.client_type.clone(), now);
            next.borrow_mut().receive(client)?;
        }
        self.remaining -= n;
        log::debug!("source emitted {n} client(s), {} remaining", self.remaining);
        if self.remaining > 0 {
            let delay = qsim_sampler::draw_nonneg(self.inter_arrival.as_ref())?;
            let handle = self.handle();
            self.sim.borrow_mut().schedule(delay, move || handle.borrow_mut().arrive());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::Station;

    struct Sink {
        received: Vec<Client>,
    }
    impl Station for Sink {
        fn receive(&mut self, client: Client) -> anyhow::Result<()> {
            self.received.push(client);
            Ok(())
        }
    }

    #[test]
    fn emits_exactly_n_clients_then_stops() {
        let sim = qsim_engine::Simulator::new_handle();
        let sink = Rc::new(RefCell::new(Sink { received: Vec::new() }));
        let source = Source::new(sim.clone(), SourceConfig::new(5, qsim_sampler::deterministic(10.0))).unwrap();
        source.borrow_mut().set_next(sink.clone());
        sim.borrow_mut().run().unwrap();
        assert_eq!(sink.borrow().received.len(), 5);
    }

    #[test]
    fn first_arrival_fires_at_inter_arrival_draw_not_at_zero() {
        let sim = qsim_engine::Simulator::new_handle();
        let sink = Rc::new(RefCell::new(Sink { received: Vec::new() }));
        let source = Source::new(sim.clone(), SourceConfig::new(1, qsim_sampler::deterministic(42.0))).unwrap();
        source.borrow_mut().set_next(sink.clone());
        let report = sim.borrow_mut().run().unwrap();
        assert_eq!(report.final_clock, 42.0);
    }

    #[test]
    fn overshooting_batch_emits_only_remaining_count() {
        let sim = qsim_engine::Simulator::new_handle();
        let sink = Rc::new(RefCell::new(Sink { received: Vec::new() }));
        let source = Source::new(
            sim.clone(),
            SourceConfig::new(5, qsim_sampler::deterministic(1.0)).with_batch_size(qsim_sampler::deterministic(3.0)),
        )
        .unwrap();
        source.borrow_mut().set_next(sink.clone());
        sim.borrow_mut().run().unwrap();
        assert_eq!(sink.borrow().received.len(), 5);
    }

    #[test]
    fn zero_arrivals_schedules_nothing() {
        let sim = qsim_engine::Simulator::new_handle();
        let source = Source::new(sim.clone(), SourceConfig::new(0, qsim_sampler::deterministic(1.0))).unwrap();
        let _ = source;
        assert_eq!(sim.borrow().pending_events(), 0);
    }
}
