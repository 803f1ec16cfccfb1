//! The network builder (spec component N, §4.L): wires a bipartite set of
//! sources and processes, and a tripartite set of processes and disposes,
//! from two transition-rate matrices. Has no runtime role beyond
//! configuration — once wiring completes, every routing decision it made
//! lives inside the `Decide` stations it created.
use std::cell::RefCell;
use std::rc::Rc;

use qsim_engine::SimHandle;
use qsim_stations::{Decide, DecideConfig, Dispose, Process, Source, Successor};

/// Arrival rates from `m1` sources to `m2` processes, row-major: `rates[i][j]`
/// is the rate from source `i` to process `j`.
pub type ArrivalMatrix = Vec<Vec<f64>>;
/// Departure rates from `m2` processes to `m2 + m3` (processes ∪ disposes),
/// row-major: `rates[j]` has `processes.len() + disposes.len()` entries, the
/// first `processes.len()` addressing other processes and the rest
/// addressing disposes, in the order the caller passed them.
pub type DepartureMatrix = Vec<Vec<f64>>;

/// Validates and wires a network from two rate matrices. This is the only
/// entry point; it has no state of its own to own across calls.
pub struct NetworkBuilder;

impl NetworkBuilder {
    /// Runs the matrix sanity pass spec.md §7 requires ("detected at a
    /// sanity pass", not deferred to `run()`), then creates one `Decide`
    /// per source and per process and wires `set_next` accordingly. `seed`
    /// seeds the uniform(0,1) draw each created `Decide` uses; each gets a
    /// distinct derived seed so two `Decide`s never share a draw sequence.
    pub fn wire(
        sim: SimHandle,
        sources: &[Rc<RefCell<Source>>],
        processes: &[Rc<RefCell<Process>>],
        disposes: &[Rc<RefCell<Dispose>>],
        arrivals: &ArrivalMatrix,
        departures: &DepartureMatrix,
        seed: u64,
    ) -> anyhow::Result<()> {
        Self::validate(sources.len(), processes.len(), disposes.len(), arrivals, departures)?;

        for (i, row) in arrivals.iter().enumerate() {
            let mut config = DecideConfig::new();
            for (j, &rate) in row.iter().enumerate() {
                config = config.add_next(processes[j].clone() as Successor, rate);
            }
            let draw = qsim_sampler::uniform(0.0, 1.0, seed.wrapping_add(i as u64).wrapping_add(1))?;
            let decide = Decide::new(config, draw)?;
            sources[i].borrow_mut().set_next(decide);
        }

        let tail_seed = seed.wrapping_add(sources.len() as u64).wrapping_add(1_000_000);
        for (j, row) in departures.iter().enumerate() {
            let mut config = DecideConfig::new();
            for (k, &rate) in row.iter().enumerate() {
                let successor: Successor = if k < processes.len() {
                    processes[k].clone() as Successor
                } else {
                    disposes[k - processes.len()].clone() as Successor
                };
                config = config.add_next(successor, rate);
            }
            let draw = qsim_sampler::uniform(0.0, 1.0, tail_seed.wrapping_add(j as u64))?;
            let decide = Decide::new(config, draw)?;
            processes[j].borrow_mut().set_next(decide);
            // The departure matrix models routing of successfully served
            // clients only; a process's cancel successor (blocked/impatient
            // clients) is outside §4.L's scope and is wired by the caller
            // via `set_next_cancel` after `wire` returns.
        }

        Ok(())
    }

    fn validate(
        m1: usize,
        m2: usize,
        m3: usize,
        arrivals: &ArrivalMatrix,
        departures: &DepartureMatrix,
    ) -> anyhow::Result<()> {
        anyhow::ensure!(
            arrivals.len() == m1,
            "arrival matrix must have one row per source ({} sources, {} rows)",
            m1,
            arrivals.len()
        );
        for (i, row) in arrivals.iter().enumerate() {
            anyhow::ensure!(
                row.len() == m2,
                "arrival matrix row {i} must have one column per process ({m2} processes, {} columns)",
                row.len()
            );
            anyhow::ensure!(row.iter().all(|&r| r >= 0.0), "arrival matrix row {i} has a negative rate");
            anyhow::ensure!(
                row.iter().any(|&r| r > 0.0),
                "arrival matrix row {i} is all zero: source {i} has no reachable process"
            );
        }
        anyhow::ensure!(
            departures.len() == m2,
            "departure matrix must have one row per process ({m2} processes, {} rows)",
            departures.len()
        );
        for (j, row) in departures.iter().enumerate() {
            anyhow::ensure!(
                row.len() == m2 + m3,
                "departure matrix row {j} must have {} columns (processes + disposes), found {}",
                m2 + m3,
                row.len()
            );
            anyhow::ensure!(row.iter().all(|&r| r >= 0.0), "departure matrix row {j} has a negative rate");
            anyhow::ensure!(
                row.iter().any(|&r| r > 0.0),
                "departure matrix row {j} is all zero: process {j} has no reachable successor"
            );
        }
        Ok(())
    }
}
