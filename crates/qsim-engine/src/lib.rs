//! The engine core (spec components C/D/E's shared plumbing): clients, the
//! cancellable event queue, and the cooperative simulator clock.
mod client;
mod event;
mod simulator;

pub use client::{Client, ClientId, ClientMark, Ledger};
pub use event::EventHandle;
pub use simulator::{RunReport, SimHandle, Simulator};
