//! Shared helpers for the end-to-end scenario tests (spec.md §8). Not part
//! of the library surface — `cargo test` compiles this only as a module
//! included by the integration test binaries that need it.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use qsim::{Client, Dispose, Process, SimHandle, Simulator, Source, Station, Successor};

/// Erlang-C probability that an arriving customer must wait, for `c` servers
/// and offered load `a = lambda * mean_service`. A private test oracle for
/// S1/S2 (spec.md §1 treats analytical calculators as an external
/// collaborator, not a library feature).
pub fn erlang_c_wait_probability(c: usize, a: f64) -> f64 {
    let mut sum = 0.0;
    let mut term = 1.0;
    for k in 0..c {
        if k > 0 {
            term *= a / k as f64;
        }
        sum += term;
    }
    let last = term * (a / c as f64);
    let denominator = sum + last / (1.0 - a / c as f64);
    last / (1.0 - a / c as f64) / denominator
}

/// Mean waiting time in queue for an M/M/c system, via Erlang-C.
pub fn erlang_c_mean_wait(c: usize, mean_arrival: f64, mean_service: f64) -> f64 {
    let lambda = 1.0 / mean_arrival;
    let a = lambda * mean_service;
    let p_wait = erlang_c_wait_probability(c, a);
    p_wait * mean_service / (c as f64 - a)
}

/// A sink station that just counts received clients and, optionally, tags
/// them for inspection. Used where a full `Dispose` isn't needed.
pub struct CountingSink {
    pub received: Vec<Client>,
}
impl Default for CountingSink {
    fn default() -> Self {
        Self { received: Vec::new() }
    }
}
impl Station for CountingSink {
    fn receive(&mut self, client: Client) -> anyhow::Result<()> {
        self.received.push(client);
        Ok(())
    }
}

pub fn sink() -> Rc<RefCell<CountingSink>> {
    Rc::new(RefCell::new(CountingSink::default()))
}

pub fn dispose(sim: SimHandle) -> Rc<RefCell<Dispose>> {
    Rc::new(RefCell::new(Dispose::new(sim)))
}

/// Builds a single source -> process -> dispose chain and runs it to
/// completion, returning the process and dispose stations for inspection.
pub fn run_single_queue(
    sim: SimHandle,
    source: Rc<RefCell<Source>>,
    process: Rc<RefCell<Process>>,
    dispose_station: Rc<RefCell<Dispose>>,
) -> anyhow::Result<qsim::RunReport> {
    source.borrow_mut().set_next(process.clone() as Successor);
    process.borrow_mut().set_next(dispose_station.clone() as Successor);
    process.borrow_mut().set_next_cancel(dispose_station as Successor);
    sim.borrow_mut().run()
}

pub fn new_sim() -> SimHandle {
    Simulator::new_handle()
}
