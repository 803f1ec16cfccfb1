//! The parameter-study driver (spec component O): runs `N` independent
//! [`qsim_engine::Simulator`] instances across a `rayon` thread pool and
//! merges their recorders. A thin wrapper, per spec.md §1 — there is no
//! shared mutable state between runs; each worker builds and owns its own
//! simulator, and results are merged only after every worker finishes
//! (spec.md §5, "Shared-resource policy").
use rayon::prelude::*;

/// One independent run's outcome: whatever `build_and_run` returned for it.
pub struct StudyResult<T> {
    pub run_index: usize,
    pub report: qsim_engine::RunReport,
    pub outcome: T,
}

/// Runs `count` independent instances of a model in parallel. `build_and_run`
/// receives the run index (e.g. to derive a distinct sampler seed) and must
/// construct its own `Simulator`/stations and call `run()` on them — nothing
/// about the engine is shared across the closure's invocations, so `T` need
/// not be `Send` beyond what the closure's return value requires.
///
/// Returns one [`StudyResult`] per run, in run-index order, or the first
/// error encountered (spec.md §7: the core never swallows errors).
pub fn run_study<T, F>(count: usize, build_and_run: F) -> anyhow::Result<Vec<StudyResult<T>>>
where
    T: Send,
    F: Fn(usize) -> anyhow::Result<(qsim_engine::RunReport, T)> + Sync,
{
    (0..count)
        .into_par_iter()
        .map(|run_index| {
            log::debug!("parameter study: starting run {run_index}");
            let (report, outcome) = build_and_run(run_index)?;
            log::debug!("parameter study: run {run_index} finished at clock {}", report.final_clock);
            Ok(StudyResult {
                run_index,
                report,
                outcome,
            })
        })
        .collect()
}

/// Merges a per-run `DiscreteRecord` (or any type implementing the same
/// `merge` shape) across all study results into one aggregate statistic,
/// serving component O's "collect results" responsibility without
/// re-exposing each run's raw samples.
pub fn merge_all<T, R>(results: &[StudyResult<T>], extract: impl Fn(&T) -> &R) -> R
where
    R: Clone + Mergeable,
{
    let mut iter = results.iter().map(|r| extract(&r.outcome));
    let mut merged = iter.next().cloned().unwrap_or_default();
    for other in iter {
        merged.merge(other);
    }
    merged
}

/// Anything that can fold another instance of itself into `self` and has a
/// sensible empty starting value. Implemented for the three recorders in
/// `qsim-stats`.
pub trait Mergeable: Default {
    fn merge(&mut self, other: &Self);
}

impl Mergeable for qsim_stats::DiscreteRecord {
    fn merge(&mut self, other: &Self) {
        qsim_stats::DiscreteRecord::merge(self, other)
    }
}
impl Mergeable for qsim_stats::ContinuousRecord {
    fn merge(&mut self, other: &Self) {
        qsim_stats::ContinuousRecord::merge(self, other)
    }
}
impl Mergeable for qsim_stats::OptionsRecord {
    fn merge(&mut self, other: &Self) {
        qsim_stats::OptionsRecord::merge(self, other)
    }
}
