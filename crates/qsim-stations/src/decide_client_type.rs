use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use qsim_engine::Client;

use crate::station::{Station, Successor};

/// Routes by the client's type tag, falling back to a default successor
/// when one is configured; with neither a match nor a default, routing
/// fails fast (spec.md §4.K).
#[derive(Default)]
pub struct DecideClientType {
    by_type: HashMap<String, Successor>,
    default: Option<Successor>,
}

impl DecideClientType {
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn set_next(&mut self, type_name: impl Into<String>, successor: Successor) {
        self.by_type.insert(type_name.into(), successor);
    }

    pub fn set_next_default(&mut self, successor: Successor) {
        self.default = Some(successor);
    }
}

impl Station for DecideClientType {
    fn receive(&mut self, client: Client) -> anyhow::Result<()> {
        log::trace!("decide_client_type routing client of type {:?}", client.type_name());
        let successor = client
            .type_name()
            .and_then(|t| self.by_type.get(t))
            .or(self.default.as_ref())
            .ok_or_else(|| {
                qsim_core::error::routing(format!(
                    "no successor for client type {:?} and no default configured",
                    client.type_name()
                ))
            })?
            .clone();
        successor.borrow_mut().receive(client)
    }
}
