//! The sampler capability (spec component A) and the distribution factories
//! that satisfy it.
//!
//! The engine only ever consumes a sampler through [`Sampler::next`] — it
//! never inspects which distribution produced the value. Everything else in
//! this crate exists to build one of those.
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use qsim_core::SimTime;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand_distr::Distribution;

/// Returns the next non-negative real sample. The sole operation the engine
/// depends on; everything below exists only to build implementations of it.
pub trait Sampler: fmt::Debug {
    fn next(&self) -> SimTime;
}

/// Draws from `sampler`, applying spec.md §7's sampling-error policy: a NaN
/// draw is fatal, a negative draw is clipped to zero and the run continues.
pub fn draw_nonneg(sampler: &dyn Sampler) -> anyhow::Result<SimTime> {
    let v = sampler.next();
    if v.is_nan() {
        return Err(qsim_core::error::sampling("sampler produced NaN"));
    }
    Ok(v.max(0.0))
}

// ============================================================================
// CONCRETE SAMPLERS
// ============================================================================

#[derive(Debug)]
pub struct Exponential {
    dist: rand_distr::Exp<f64>,
    rng: RefCell<SmallRng>,
}
impl Exponential {
    pub fn new(mean: f64, seed: u64) -> anyhow::Result<Self> {
        anyhow::ensure!(mean > 0.0, "exponential mean must be positive");
        Ok(Self {
            dist: rand_distr::Exp::new(1.0 / mean)?,
            rng: RefCell::new(SmallRng::seed_from_u64(seed)),
        })
    }
}
impl Sampler for Exponential {
    fn next(&self) -> SimTime {
        self.dist.sample(&mut self.rng.borrow_mut())
    }
}

#[derive(Debug)]
pub struct LogNormalSampler {
    dist: rand_distr::LogNormal<f64>,
    rng: RefCell<SmallRng>,
}
impl LogNormalSampler {
    /// `mean`/`sd` are the moments of the sampled variable itself, not of
    /// the underlying normal — converted via the standard log-normal
    /// moment-matching identities.
    pub fn new(mean: f64, sd: f64, seed: u64) -> anyhow::Result<Self> {
        anyhow::ensure!(mean > 0.0, "log-normal mean must be positive");
        let variance = sd * sd;
        let mu = (mean * mean / (variance + mean * mean).sqrt()).ln();
        let sigma = (1.0 + variance / (mean * mean)).ln().sqrt();
        Ok(Self {
            dist: rand_distr::LogNormal::new(mu, sigma)?,
            rng: RefCell::new(SmallRng::seed_from_u64(seed)),
        })
    }
}
impl Sampler for LogNormalSampler {
    fn next(&self) -> SimTime {
        self.dist.sample(&mut self.rng.borrow_mut())
    }
}

#[derive(Debug)]
pub struct GammaSampler {
    dist: rand_distr::Gamma<f64>,
    rng: RefCell<SmallRng>,
}
impl GammaSampler {
    pub fn new(mean: f64, sd: f64, seed: u64) -> anyhow::Result<Self> {
        anyhow::ensure!(mean > 0.0 && sd > 0.0, "gamma mean and sd must be positive");
        let shape = (mean / sd).powi(2);
        let scale = (sd * sd) / mean;
        Ok(Self {
            dist: rand_distr::Gamma::new(shape, scale)?,
            rng: RefCell::new(SmallRng::seed_from_u64(seed)),
        })
    }
}
impl Sampler for GammaSampler {
    fn next(&self) -> SimTime {
        self.dist.sample(&mut self.rng.borrow_mut())
    }
}

#[derive(Debug)]
pub struct UniformSampler {
    dist: rand::distr::Uniform<f64>,
    rng: RefCell<SmallRng>,
}
impl UniformSampler {
    pub fn new(a: f64, b: f64, seed: u64) -> anyhow::Result<Self> {
        anyhow::ensure!(a < b, "uniform bounds must satisfy a < b");
        Ok(Self {
            dist: rand::distr::Uniform::new(a, b)?,
            rng: RefCell::new(SmallRng::seed_from_u64(seed)),
        })
    }
}
impl Sampler for UniformSampler {
    fn next(&self) -> SimTime {
        self.dist.sample(&mut self.rng.borrow_mut())
    }
}

#[derive(Debug)]
pub struct TriangularSampler {
    dist: rand_distr::Triangular<f64>,
    rng: RefCell<SmallRng>,
}
impl TriangularSampler {
    pub fn new(a: f64, m: f64, b: f64, seed: u64) -> anyhow::Result<Self> {
        anyhow::ensure!(a <= m && m <= b, "triangular requires a <= m <= b");
        Ok(Self {
            dist: rand_distr::Triangular::new(a, b, m)?,
            rng: RefCell::new(SmallRng::seed_from_u64(seed)),
        })
    }
}
impl Sampler for TriangularSampler {
    fn next(&self) -> SimTime {
        self.dist.sample(&mut self.rng.borrow_mut())
    }
}

#[derive(Debug)]
pub struct Deterministic {
    value: f64,
}
impl Deterministic {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}
impl Sampler for Deterministic {
    fn next(&self) -> SimTime {
        self.value
    }
}

/// A value -> rate mapping, normalized to a probability distribution at
/// construction time and sampled via a weighted index.
#[derive(Debug)]
pub struct Empirical {
    values: Vec<f64>,
    dist: rand_distr::weighted::WeightedIndex<f64>,
    rng: RefCell<SmallRng>,
}
impl Empirical {
    pub fn new(weighted_values: Vec<(f64, f64)>, seed: u64) -> anyhow::Result<Self> {
        anyhow::ensure!(!weighted_values.is_empty(), "empirical sampler needs at least one value");
        let (values, rates): (Vec<f64>, Vec<f64>) = weighted_values.into_iter().unzip();
        anyhow::ensure!(rates.iter().all(|&r| r >= 0.0), "empirical rates must be non-negative");
        anyhow::ensure!(rates.iter().sum::<f64>() > 0.0, "empirical rates must not all be zero");
        Ok(Self {
            values,
            dist: rand_distr::weighted::WeightedIndex::new(rates)?,
            rng: RefCell::new(SmallRng::seed_from_u64(seed)),
        })
    }
}
impl Sampler for Empirical {
    fn next(&self) -> SimTime {
        let idx = self.dist.sample(&mut self.rng.borrow_mut());
        self.values[idx]
    }
}

// ============================================================================
// FACTORIES
// ============================================================================
pub fn exponential(mean: f64, seed: u64) -> anyhow::Result<Arc<dyn Sampler>> {
    Ok(Arc::new(Exponential::new(mean, seed)?))
}
pub fn log_normal(mean: f64, sd: f64, seed: u64) -> anyhow::Result<Arc<dyn Sampler>> {
    Ok(Arc::new(LogNormalSampler::new(mean, sd, seed)?))
}
pub fn gamma(mean: f64, sd: f64, seed: u64) -> anyhow::Result<Arc<dyn Sampler>> {
    Ok(Arc::new(GammaSampler::new(mean, sd, seed)?))
}
pub fn uniform(a: f64, b: f64, seed: u64) -> anyhow::Result<Arc<dyn Sampler>> {
    Ok(Arc::new(UniformSampler::new(a, b, seed)?))
}
pub fn triangular(a: f64, m: f64, b: f64, seed: u64) -> anyhow::Result<Arc<dyn Sampler>> {
    Ok(Arc::new(TriangularSampler::new(a, m, b, seed)?))
}
pub fn deterministic(value: f64) -> Arc<dyn Sampler> {
    Arc::new(Deterministic::new(value))
}
pub fn empirical(weighted_values: Vec<(f64, f64)>, seed: u64) -> anyhow::Result<Arc<dyn Sampler>> {
    Ok(Arc::new(Empirical::new(weighted_values, seed)?))
}

// ============================================================================
// SERIALISABLE DESCRIPTOR FORM
// ============================================================================
/// Plain-data description of a sampler, for parameter-study workers that
/// serialize model configuration across process/thread boundaries and
/// materialize the actual [`Sampler`] on first use.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum SamplerSpec {
    Exponential { mean: f64 },
    LogNormal { mean: f64, sd: f64 },
    Gamma { mean: f64, sd: f64 },
    Uniform { a: f64, b: f64 },
    Triangular { a: f64, m: f64, b: f64 },
    Deterministic { value: f64 },
    Empirical { values: Vec<(f64, f64)> },
}

impl SamplerSpec {
    pub fn materialize(&self, seed: u64) -> anyhow::Result<Arc<dyn Sampler>> {
        match self.clone() {
            SamplerSpec::Exponential { mean } => exponential(mean, seed),
            SamplerSpec::LogNormal { mean, sd } => log_normal(mean, sd, seed),
            SamplerSpec::Gamma { mean, sd } => gamma(mean, sd, seed),
            SamplerSpec::Uniform { a, b } => uniform(a, b, seed),
            SamplerSpec::Triangular { a, m, b } => triangular(a, m, b, seed),
            SamplerSpec::Deterministic { value } => Ok(deterministic(value)),
            SamplerSpec::Empirical { values } => empirical(values, seed),
        }
    }
}

/// Either a live, in-process sampler or a spec that materializes lazily.
/// Station configuration accepts both forms (spec.md §4.A).
#[derive(Clone)]
pub enum SamplerHandle {
    Direct(Arc<dyn Sampler>),
    Described(SamplerSpec, u64),
}

impl fmt::Debug for SamplerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplerHandle::Direct(_) => write!(f, "SamplerHandle::Direct(..)"),
            SamplerHandle::Described(spec, seed) => {
                f.debug_tuple("SamplerHandle::Described").field(spec).field(seed).finish()
            }
        }
    }
}

impl SamplerHandle {
    pub fn direct(sampler: Arc<dyn Sampler>) -> Self {
        SamplerHandle::Direct(sampler)
    }
    pub fn described(spec: SamplerSpec, seed: u64) -> Self {
        SamplerHandle::Described(spec, seed)
    }
    /// Materializes the underlying sampler. Called once, at station
    /// construction time, so the resulting sampler's internal RNG state
    /// persists across every later draw.
    pub fn resolve(&self) -> anyhow::Result<Arc<dyn Sampler>> {
        match self {
            SamplerHandle::Direct(s) => Ok(s.clone()),
            SamplerHandle::Described(spec, seed) => spec.materialize(*seed),
        }
    }
}

impl From<Arc<dyn Sampler>> for SamplerHandle {
    fn from(sampler: Arc<dyn Sampler>) -> Self {
        SamplerHandle::Direct(sampler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_samples_are_nonnegative_and_seed_determines_sequence() {
        let a = Exponential::new(80.0, 42).unwrap();
        let b = Exponential::new(80.0, 42).unwrap();
        for _ in 0..100 {
            let (x, y) = (a.next(), b.next());
            assert!(x >= 0.0);
            assert_eq!(x, y, "same seed must produce the same sequence");
        }
    }

    #[test]
    fn deterministic_always_returns_the_configured_value() {
        let d = Deterministic::new(12.5);
        assert_eq!(d.next(), 12.5);
        assert_eq!(d.next(), 12.5);
    }

    #[test]
    fn empirical_only_returns_configured_values() {
        let e = Empirical::new(vec![(1.0, 1.0), (2.0, 3.0)], 7).unwrap();
        for _ in 0..50 {
            let v = e.next();
            assert!(v == 1.0 || v == 2.0);
        }
    }

    #[test]
    fn draw_nonneg_clips_negative_and_rejects_nan() {
        let neg = Deterministic::new(-5.0);
        assert_eq!(draw_nonneg(&neg).unwrap(), 0.0);
        let nan = Deterministic::new(f64::NAN);
        assert!(draw_nonneg(&nan).is_err());
    }

    #[test]
    fn sampler_spec_round_trips_through_materialize() {
        let spec = SamplerSpec::Exponential { mean: 100.0 };
        let s = spec.materialize(1).unwrap();
        assert!(s.next() >= 0.0);
    }
}
