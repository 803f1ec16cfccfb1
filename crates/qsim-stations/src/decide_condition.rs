use std::cell::RefCell;
use std::rc::Rc;

use qsim_engine::Client;

use crate::station::{Station, Successor};

/// Routes via a user-supplied predicate returning a 0-based output index
/// (spec.md §4.J). An out-of-range index is a routing error: fatal, not a
/// routed outcome.
pub struct DecideCondition {
    successors: Vec<Successor>,
    predicate: Box<dyn Fn(&Client) -> usize>,
}

impl DecideCondition {
    pub fn new(successors: Vec<Successor>, predicate: impl Fn(&Client) -> usize + 'static) -> anyhow::Result<Rc<RefCell<Self>>> {
        anyhow::ensure!(!successors.is_empty(), "DecideCondition requires at least one successor");
        Ok(Rc::new(RefCell::new(Self {
            successors,
            predicate: Box::new(predicate),
        })))
    }
}

impl Station for DecideCondition {
    fn receive(&mut self, client: Client) -> anyhow::Result<()> {
        let i = (self.predicate)(&client);
        log::trace!("decide_condition routing to output {i}");
        let successor = self
            .successors
            .get(i)
            .ok_or_else(|| qsim_core::error::routing(format!("predicate returned out-of-range index {i}")))?
            .clone();
        successor.borrow_mut().receive(client)
    }
}
