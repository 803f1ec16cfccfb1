//! `qsim` — a discrete-event stochastic simulator for open queueing networks
//! of arbitrary topology. This crate is a facade: it re-exports the pieces
//! built out across the workspace (samplers, statistic recorders, the
//! engine core, the station library, the network builder, and the
//! parameter-study driver) so a downstream crate depends on one name.
//!
//! Build a model by creating a [`Simulator`], constructing stations against
//! it, wiring their successors, and calling [`Simulator::run`]. See the
//! `tests/` directory for complete end-to-end models (an M/M/1 queue, an
//! M/M/c queue, impatience with retry, batch service, and others).
pub use qsim_core::{Arbitrary, ID, IdGen, Probability, Rate, SimTime, Unique, error};
pub use qsim_engine::{Client, ClientId, ClientMark, EventHandle, Ledger, RunReport, SimHandle, Simulator};
pub use qsim_network::{ArrivalMatrix, DepartureMatrix, NetworkBuilder};
pub use qsim_sampler::{Sampler, SamplerHandle, SamplerSpec};
pub use qsim_stations::{
    Decide, DecideClientType, DecideCondition, DecideConfig, Delay, Discipline, Dispose, DisposeRecorders, Process, ProcessConfig,
    ProcessRecorders, Source, SourceConfig, Station, Successor,
};
pub use qsim_stats::{ContinuousRecord, DiscreteRecord, Histogram, OptionsRecord};
pub use qsim_study::{Mergeable, StudyResult, merge_all, run_study};
