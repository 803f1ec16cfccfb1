use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use qsim_engine::Client;
use qsim_sampler::Sampler;

use crate::station::{Station, Successor};

/// Configuration for a [`Decide`]: an ordered list of `(successor, rate)`
/// pairs, normalized to a cumulative probability vector at construction
/// (spec.md §4.I). All rates must be non-negative and sum to a positive
/// value, or the all-zero-row configuration error fires (spec.md §7).
pub struct DecideConfig {
    outputs: Vec<(Successor, f64)>,
}

impl DecideConfig {
    pub fn new() -> Self {
        Self { outputs: Vec::new() }
    }

    pub fn add_next(mut self, successor: Successor, rate: f64) -> Self {
        self.outputs.push((successor, rate));
        self
    }
}

impl Default for DecideConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes each arriving client to one of `k` outputs with probability
/// proportional to its configured rate. Single-stage, no queue.
pub struct Decide {
    successors: Vec<Successor>,
    cumulative: Vec<f64>,
    draw: Arc<dyn Sampler>,
}

impl Decide {
    pub fn new(config: DecideConfig, draw: Arc<dyn Sampler>) -> anyhow::Result<Rc<RefCell<Self>>> {
        anyhow::ensure!(!config.outputs.is_empty(), "Decide requires at least one output");
        let total: f64 = config.outputs.iter().map(|(_, r)| *r).sum();
        anyhow::ensure!(
            config.outputs.iter().all(|(_, r)| *r >= 0.0),
            "Decide rates must be non-negative"
        );
        anyhow::ensure!(total > 0.0, "Decide rate vector must not be all zero");
        let mut cumulative = Vec::with_capacity(config.outputs.len());
        let mut successors = Vec::with_capacity(config.outputs.len());
        let mut running = 0.0;
        for (successor, rate) in config.outputs {
            running += rate / total;
            cumulative.push(running);
            successors.push(successor);
        }
        Ok(Rc::new(RefCell::new(Self {
            successors,
            cumulative,
            draw,
        })))
    }
}

impl Station for Decide {
    fn receive(&mut self, client: Client) -> anyhow::Result<()> {
        let u = qsim_sampler::draw_nonneg(self.draw.as_ref())?.min(1.0);
        let idx = self
            .cumulative
            .iter()
            .position(|&bound| u <= bound)
            .unwrap_or(self.cumulative.len() - 1);
        log::trace!("decide routing draw {u} to output {idx}/{}", self.successors.len());
        self.successors[idx].borrow_mut().receive(client)
    }
}
