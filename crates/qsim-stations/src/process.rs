use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use qsim_core::{SimTime, Unique};
use qsim_engine::{Client, ClientId, EventHandle, SimHandle};
use qsim_sampler::{Sampler, SamplerHandle};
use qsim_stats::{ContinuousRecord, DiscreteRecord, OptionsRecord};

use crate::station::{Station, Successor};

/// Queue discipline. `Priority` overrides a `LIFO` request if both are
/// configured (spec.md §9 open question, resolved: priority wins — the
/// caller expresses that by calling `with_priority` last).
pub enum Discipline {
    Fifo,
    Lifo,
    Priority(Rc<dyn Fn(&Client, SimTime) -> f64>),
}

impl Default for Discipline {
    fn default() -> Self {
        Discipline::Fifo
    }
}

/// Configuration for a [`Process`] (spec.md §4.F, keys enumerated in §6).
pub struct ProcessConfig {
    pub capacity: u32,
    pub batch_size: u32,
    pub service: SamplerHandle,
    pub service_by_type: HashMap<String, SamplerHandle>,
    pub patience: Option<SamplerHandle>,
    pub patience_by_type: HashMap<String, SamplerHandle>,
    pub post_processing: Option<SamplerHandle>,
    pub max_system: Option<u32>,
    pub discipline: Discipline,
}

impl ProcessConfig {
    pub fn new(capacity: u32, service: SamplerHandle) -> Self {
        Self {
            capacity,
            batch_size: 1,
            service,
            service_by_type: HashMap::new(),
            patience: None,
            patience_by_type: HashMap::new(),
            post_processing: None,
            max_system: None,
            discipline: Discipline::Fifo,
        }
    }

    pub fn with_batch_size(mut self, b: u32) -> Self {
        self.batch_size = b;
        self
    }
    pub fn with_patience(mut self, sampler: SamplerHandle) -> Self {
        self.patience = Some(sampler);
        self
    }
    pub fn with_post_processing(mut self, sampler: SamplerHandle) -> Self {
        self.post_processing = Some(sampler);
        self
    }
    pub fn with_max_system(mut self, k: u32) -> Self {
        self.max_system = Some(k);
        self
    }
    pub fn with_service_override(mut self, type_name: impl Into<String>, sampler: SamplerHandle) -> Self {
        self.service_by_type.insert(type_name.into(), sampler);
        self
    }
    pub fn with_patience_override(mut self, type_name: impl Into<String>, sampler: SamplerHandle) -> Self {
        self.patience_by_type.insert(type_name.into(), sampler);
        self
    }
    /// Selects the LIFO discipline. Overridden by a later `with_priority`.
    pub fn with_lifo(mut self) -> Self {
        self.discipline = Discipline::Lifo;
        self
    }
    /// Selects the priority discipline, overriding any earlier `with_lifo`.
    pub fn with_priority(mut self, f: impl Fn(&Client, SimTime) -> f64 + 'static) -> Self {
        self.discipline = Discipline::Priority(Rc::new(f));
        self
    }
}

/// The eight recorders a Process maintains (spec.md §4.B).
#[derive(Default)]
pub struct ProcessRecorders {
    pub station_waiting: DiscreteRecord,
    pub station_service: DiscreteRecord,
    pub station_post_processing: DiscreteRecord,
    pub station_residence: DiscreteRecord,
    pub success: OptionsRecord,
    pub queue_length: ContinuousRecord,
    pub wip: ContinuousRecord,
    pub workload: ContinuousRecord,
}

struct Waiting {
    client: Client,
    enqueued_at: SimTime,
    patience_handle: Option<EventHandle>,
}

/// A bank of `c` identical servers fed by one waiting queue, with optional
/// batching, patience, per-type overrides, post-processing, and a system
/// capacity bound (spec.md §4.F — the most involved station in the model).
pub struct Process {
    sim: SimHandle,
    capacity: u32,
    batch_size: u32,
    service: Arc<dyn Sampler>,
    service_by_type: HashMap<String, Arc<dyn Sampler>>,
    patience: Option<Arc<dyn Sampler>>,
    patience_by_type: HashMap<String, Arc<dyn Sampler>>,
    post_processing: Option<Arc<dyn Sampler>>,
    max_system: Option<u32>,
    discipline: Discipline,
    queue: VecDeque<Waiting>,
    busy: u32,
    next: Option<Successor>,
    next_cancel: Option<Successor>,
    recorders: ProcessRecorders,
    self_ref: Weak<RefCell<Process>>,
}

impl Process {
    pub fn new(sim: SimHandle, config: ProcessConfig) -> anyhow::Result<Rc<RefCell<Self>>> {
        if config.capacity < 1 {
            return Err(qsim_core::error::configuration("Process capacity c must be >= 1"));
        }
        if config.batch_size < 1 {
            return Err(qsim_core::error::configuration("Process batch size b must be >= 1"));
        }
        let service = config.service.resolve()?;
        let service_by_type = resolve_map(config.service_by_type)?;
        let patience = config.patience.map(|h| h.resolve()).transpose()?;
        let patience_by_type = resolve_map(config.patience_by_type)?;
        let post_processing = config.post_processing.map(|h| h.resolve()).transpose()?;

        let station = Rc::new(RefCell::new(Self {
            sim,
            capacity: config.capacity,
            batch_size: config.batch_size,
            service,
            service_by_type,
            patience,
            patience_by_type,
            post_processing,
            max_system: config.max_system,
            discipline: config.discipline,
            queue: VecDeque::new(),
            busy: 0,
            next: None,
            next_cancel: None,
            recorders: ProcessRecorders::default(),
            self_ref: Weak::new(),
        }));
        station.borrow_mut().self_ref = Rc::downgrade(&station);
        Ok(station)
    }

    pub fn set_next(&mut self, next: Successor) {
        self.next = Some(next);
    }
    pub fn set_next_cancel(&mut self, next: Successor) {
        self.next_cancel = Some(next);
    }
    pub fn recorders(&self) -> &ProcessRecorders {
        &self.recorders
    }
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
    pub fn busy_servers(&self) -> u32 {
        self.busy
    }

    fn handle(&self) -> Rc<RefCell<Process>> {
        self.self_ref.upgrade().expect("process dropped while an event was scheduled")
    }

    fn in_system(&self) -> usize {
        self.queue.len() + self.busy as usize * self.batch_size as usize
    }

    fn update_continuous(&mut self) {
        let now = self.sim.borrow().now();
        self.recorders.queue_length.update(now, self.queue.len() as f64);
        self.recorders.wip.update(now, self.in_system() as f64);
        self.recorders.workload.update(now, self.busy as f64 / self.capacity as f64);
    }

    fn service_sampler_for(&self, client: &Client) -> Arc<dyn Sampler> {
        client
            .type_name()
            .and_then(|t| self.service_by_type.get(t))
            .unwrap_or(&self.service)
            .clone()
    }

    fn patience_sampler_for(&self, client: &Client) -> Option<Arc<dyn Sampler>> {
        if let Some(t) = client.type_name() {
            if let Some(s) = self.patience_by_type.get(t) {
                return Some(s.clone());
            }
        }
        self.patience.clone()
    }

    fn cancel_patience(&mut self, client_id: ClientId) -> anyhow::Result<()> {
        let now = self.sim.borrow().now();
        let idx = self
            .queue
            .iter()
            .position(|w| w.client.id() == client_id)
            .ok_or_else(|| qsim_core::error::invariant("patience event fired for a client no longer queued"))?;
        let mut waiting = self.queue.remove(idx).expect("index just located");
        let waited = now - waiting.enqueued_at;
        log::debug!("client {client_id:?} lost patience after waiting {waited}");
        self.recorders.station_waiting.observe(waited);
        waiting.client.ledger_mut().waiting += waited;
        self.recorders.success.observe("cancel");
        self.update_continuous();
        let successor = self
            .next_cancel
            .clone()
            .ok_or_else(|| qsim_core::error::configuration("Process has no cancel successor"))?;
        successor.borrow_mut().receive(waiting.client)
    }

    fn select_next(&mut self, now: SimTime) -> anyhow::Result<Waiting> {
        match &self.discipline {
            Discipline::Fifo => Ok(self.queue.pop_front().expect("caller checked queue is non-empty")),
            Discipline::Lifo => Ok(self.queue.pop_back().expect("caller checked queue is non-empty")),
            Discipline::Priority(f) => {
                let mut best_idx = 0usize;
                let mut best_priority = f64::NEG_INFINITY;
                let mut best_enqueued = f64::INFINITY;
                for (i, w) in self.queue.iter().enumerate() {
                    let waited = now - w.enqueued_at;
                    let p = f(&w.client, waited);
                    if !p.is_finite() {
                        return Err(qsim_core::error::invariant("priority function returned a non-finite value"));
                    }
                    if p > best_priority || (p == best_priority && w.enqueued_at < best_enqueued) {
                        best_priority = p;
                        best_idx = i;
                        best_enqueued = w.enqueued_at;
                    }
                }
                Ok(self.queue.remove(best_idx).expect("index computed over the current queue"))
            }
        }
    }

    /// Idempotent: safe to call after every state change that could make a
    /// new batch startable (spec.md §9 — "data-dependence, not control
    /// flow"). Cascades: starting one batch may free capacity to look for
    /// the next only if the queue still holds a full batch and a server.
    fn try_start_service(&mut self) -> anyhow::Result<()> {
        loop {
            if self.busy >= self.capacity || self.queue.len() < self.batch_size as usize {
                return Ok(());
            }
            let now = self.sim.borrow().now();
            let mut selected = Vec::with_capacity(self.batch_size as usize);
            for _ in 0..self.batch_size {
                selected.push(self.select_next(now)?);
            }
            for w in &selected {
                if let Some(h) = &w.patience_handle {
                    h.cancel();
                }
            }
            let mut clients = Vec::with_capacity(selected.len());
            let mut waited_times = Vec::with_capacity(selected.len());
            for mut w in selected {
                let waited = now - w.enqueued_at;
                self.recorders.station_waiting.observe(waited);
                w.client.ledger_mut().waiting += waited;
                waited_times.push(waited);
                clients.push(w.client);
            }
            self.busy += 1;
            log::trace!("process starting service for a batch of {}, now busy={}/{}", clients.len(), self.busy, self.capacity);
            self.update_continuous();
            let sampler = self.service_sampler_for(&clients[0]);
            let s = qsim_sampler::draw_nonneg(sampler.as_ref())?;
            let handle = self.handle();
            self.sim
                .borrow_mut()
                .schedule(s, move || handle.borrow_mut().complete_service(clients, waited_times, s));
        }
    }

    fn complete_service(&mut self, clients: Vec<Client>, waited_times: Vec<SimTime>, service_time: SimTime) -> anyhow::Result<()> {
        let next = self
            .next
            .clone()
            .ok_or_else(|| qsim_core::error::configuration("Process has no successor"))?;
        for (mut client, waited) in clients.into_iter().zip(waited_times) {
            self.recorders.station_service.observe(service_time);
            client.ledger_mut().service += service_time;
            self.recorders.success.observe("success");
            self.recorders.station_residence.observe(waited + service_time);
            next.borrow_mut().receive(client)?;
        }
        if let Some(sampler) = self.post_processing.clone() {
            let p = qsim_sampler::draw_nonneg(sampler.as_ref())?;
            self.recorders.station_post_processing.observe(p);
            let handle = self.handle();
            self.sim.borrow_mut().schedule(p, move || handle.borrow_mut().finish_post_processing());
        } else {
            self.busy -= 1;
            self.update_continuous();
            self.try_start_service()?;
        }
        Ok(())
    }

    fn finish_post_processing(&mut self) -> anyhow::Result<()> {
        self.busy -= 1;
        self.update_continuous();
        self.try_start_service()
    }
}

impl Station for Process {
    fn receive(&mut self, mut client: Client) -> anyhow::Result<()> {
        let now = self.sim.borrow().now();
        if let Some(k) = self.max_system {
            if self.in_system() >= k as usize {
                log::debug!("process blocking client: system at capacity {k}");
                self.recorders.success.observe("blocked");
                self.update_continuous();
                let successor = self
                    .next_cancel
                    .clone()
                    .ok_or_else(|| qsim_core::error::configuration("Process has no cancel successor for a blocked client"))?;
                return successor.borrow_mut().receive(client);
            }
        }
        let patience_handle = if let Some(sampler) = self.patience_sampler_for(&client) {
            let nu = qsim_sampler::draw_nonneg(sampler.as_ref())?;
            let handle = self.handle();
            let client_id = client.id();
            Some(self.sim.borrow_mut().schedule(nu, move || handle.borrow_mut().cancel_patience(client_id)))
        } else {
            None
        };
        self.queue.push_back(Waiting {
            client,
            enqueued_at: now,
            patience_handle,
        });
        self.update_continuous();
        self.try_start_service()
    }
}

fn resolve_map(map: HashMap<String, SamplerHandle>) -> anyhow::Result<HashMap<String, Arc<dyn Sampler>>> {
    map.into_iter().map(|(k, v)| Ok((k, v.resolve()?))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Sink {
        received: Vec<Client>,
    }
    impl Station for Sink {
        fn receive(&mut self, client: Client) -> anyhow::Result<()> {
            self.received.push(client);
            Ok(())
        }
    }

    fn handle(sampler: Arc<dyn Sampler>) -> SamplerHandle {
        SamplerHandle::direct(sampler)
    }

    #[test]
    fn single_server_serves_one_at_a_time() {
        let sim = qsim_engine::Simulator::new_handle();
        let sink = Rc::new(RefCell::new(Sink { received: Vec::new() }));
        let process = Process::new(sim.clone(), ProcessConfig::new(1, handle(qsim_sampler::deterministic(10.0)))).unwrap();
        process.borrow_mut().set_next(sink.clone());

        let mut ids = qsim_core::IdGen::<qsim_engine::ClientMark>::new();
        process.borrow_mut().receive(Client::new(ids.next_id(), None, 0.0)).unwrap();
        process.borrow_mut().receive(Client::new(ids.next_id(), None, 0.0)).unwrap();
        assert_eq!(process.borrow().queue_len(), 1);
        assert_eq!(process.borrow().busy_servers(), 1);

        sim.borrow_mut().run().unwrap();
        assert_eq!(sink.borrow().received.len(), 2);
        assert_eq!(process.borrow().recorders().station_waiting.count(), 2);
    }

    #[test]
    fn capacity_k_diverts_to_cancel_successor_when_full() {
        let sim = qsim_engine::Simulator::new_handle();
        let success = Rc::new(RefCell::new(Sink { received: Vec::new() }));
        let blocked = Rc::new(RefCell::new(Sink { received: Vec::new() }));
        let process = Process::new(
            sim.clone(),
            ProcessConfig::new(1, handle(qsim_sampler::deterministic(1000.0))).with_max_system(1),
        )
        .unwrap();
        process.borrow_mut().set_next(success.clone());
        process.borrow_mut().set_next_cancel(blocked.clone());

        let mut ids = qsim_core::IdGen::<qsim_engine::ClientMark>::new();
        process.borrow_mut().receive(Client::new(ids.next_id(), None, 0.0)).unwrap();
        process.borrow_mut().receive(Client::new(ids.next_id(), None, 0.0)).unwrap();
        assert_eq!(blocked.borrow().received.len(), 1);
        assert_eq!(process.borrow().recorders().success.count("blocked"), 1);
    }

    #[test]
    fn patience_cancels_and_routes_to_cancel_successor() {
        let sim = qsim_engine::Simulator::new_handle();
        let success = Rc::new(RefCell::new(Sink { received: Vec::new() }));
        let cancel = Rc::new(RefCell::new(Sink { received: Vec::new() }));
        let process = Process::new(
            sim.clone(),
            ProcessConfig::new(1, handle(qsim_sampler::deterministic(100.0))).with_patience(handle(qsim_sampler::deterministic(5.0))),
        )
        .unwrap();
        process.borrow_mut().set_next(success.clone());
        process.borrow_mut().set_next_cancel(cancel.clone());

        let mut ids = qsim_core::IdGen::<qsim_engine::ClientMark>::new();
        process.borrow_mut().receive(Client::new(ids.next_id(), None, 0.0)).unwrap();
        process.borrow_mut().receive(Client::new(ids.next_id(), None, 0.0)).unwrap();
        sim.borrow_mut().run().unwrap();
        assert_eq!(cancel.borrow().received.len(), 1);
        assert_eq!(process.borrow().recorders().success.count("cancel"), 1);
    }

    #[test]
    fn lifo_selects_most_recently_enqueued_first() {
        let sim = qsim_engine::Simulator::new_handle();
        let sink = Rc::new(RefCell::new(Sink { received: Vec::new() }));
        let process = Process::new(
            sim.clone(),
            ProcessConfig::new(1, handle(qsim_sampler::deterministic(10.0))).with_lifo(),
        )
        .unwrap();
        process.borrow_mut().set_next(sink.clone());

        let mut ids = qsim_core::IdGen::<qsim_engine::ClientMark>::new();
        let first = ids.next_id();
        let second = ids.next_id();
        let third = ids.next_id();
        process.borrow_mut().receive(Client::new(first, None, 0.0)).unwrap();
        process.borrow_mut().receive(Client::new(second, None, 0.0)).unwrap();
        process.borrow_mut().receive(Client::new(third, None, 0.0)).unwrap();
        sim.borrow_mut().run().unwrap();
        let order: Vec<_> = sink.borrow().received.iter().map(|c| c.id()).collect();
        assert_eq!(order, vec![first, third, second]);
    }
}
