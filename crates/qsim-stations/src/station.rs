use std::cell::RefCell;
use std::rc::Rc;

use qsim_engine::Client;

/// The contract every network node satisfies (spec.md §4.D): receive a
/// client handed off by another station at the current clock. Wiring
/// methods (`set_next`, `set_next_cancel`, `add_next`, ...) are
/// component-specific and live on the concrete types, not on this trait.
pub trait Station {
    fn receive(&mut self, client: Client) -> anyhow::Result<()>;
}

/// A shared, dynamically-dispatched successor. Every station wiring method
/// takes one of these.
pub type Successor = Rc<RefCell<dyn Station>>;
