//! The station contract (spec component F) and the concrete station types
//! that compose into a network: [`Source`], [`Process`], [`Delay`],
//! [`Dispose`], [`Decide`], [`DecideCondition`], and [`DecideClientType`].
mod decide;
mod decide_client_type;
mod decide_condition;
mod delay;
mod dispose;
mod process;
mod source;
mod station;

pub use decide::{Decide, DecideConfig};
pub use decide_client_type::DecideClientType;
pub use decide_condition::DecideCondition;
pub use delay::Delay;
pub use dispose::{Dispose, DisposeRecorders};
pub use process::{Discipline, Process, ProcessConfig, ProcessRecorders};
pub use source::{Source, SourceConfig};
pub use station::{Station, Successor};
