//! Statistic recorders (spec component B): a discrete-value recorder with an
//! adaptive histogram, a time-weighted continuous recorder, and a
//! categorical counter. All three support [`merge`] so a parameter study can
//! aggregate independent runs into one set of statistics.
#![allow(dead_code)]

use qsim_core::{DEFAULT_HISTOGRAM_BINS, DEFAULT_HISTOGRAM_BIN_WIDTH};
use std::collections::HashMap;

// ============================================================================
// ADAPTIVE HISTOGRAM
// ============================================================================
/// A fixed-bin-count histogram over `[0, bins.len() * bin_width)`. When a
/// value lands outside the current range, adjacent bin pairs are summed and
/// the bin width doubles, repeating until the value fits. This keeps memory
/// bounded without requiring the value range up front.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    bins: Vec<u64>,
    bin_width: f64,
    bin_count: usize,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            bins: vec![0; DEFAULT_HISTOGRAM_BINS],
            bin_width: DEFAULT_HISTOGRAM_BIN_WIDTH,
            bin_count: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

impl Histogram {
    pub fn new(bin_count: usize, bin_width: f64) -> Self {
        let bin_count = bin_count.max(1);
        Self {
            bins: vec![0; bin_count],
            bin_width: bin_width.max(f64::MIN_POSITIVE),
            bin_count,
        }
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    pub fn bins(&self) -> &[u64] {
        &self.bins
    }

    /// Records one occurrence of `value`, growing the histogram's range as
    /// needed. `value` must be non-negative and finite.
    pub fn insert(&mut self, value: f64) {
        debug_assert!(value.is_finite() && value >= 0.0);
        loop {
            let idx = (value / self.bin_width) as usize;
            if idx < self.bins.len() {
                self.bins[idx] += 1;
                return;
            }
            self.double_width();
        }
    }

    fn double_width(&mut self) {
        let merged = self
            .bins
            .chunks(2)
            .map(|pair| pair.iter().sum())
            .collect::<Vec<u64>>();
        self.bins = merged;
        self.bin_width *= 2.0;
        while self.bins.len() < self.bin_count {
            self.bins.push(0);
        }
    }

    /// Combines `other` into `self`, growing whichever side has the finer
    /// resolution until both share a bin width.
    pub fn merge(&mut self, other: &Histogram) {
        let mut other = other.clone();
        while self.bin_width < other.bin_width {
            self.double_width();
        }
        while other.bin_width < self.bin_width {
            other.double_width();
        }
        for (i, count) in other.bins.iter().enumerate() {
            if i < self.bins.len() {
                self.bins[i] += count;
            }
        }
    }
}

// ============================================================================
// DISCRETE RECORD
// ============================================================================
/// Online statistics over a stream of discrete-event values (e.g. wait
/// times, batch sizes): count, mean, standard deviation, coefficient of
/// variation, min, max, plus a value histogram. Uses Welford's algorithm so
/// the running mean/variance never require storing the raw samples.
#[derive(Debug, Clone)]
pub struct DiscreteRecord {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
    histogram: Histogram,
}

impl Default for DiscreteRecord {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            histogram: Histogram::default(),
        }
    }
}

impl DiscreteRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        if value >= 0.0 {
            self.histogram.insert(value);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    pub fn variance(&self) -> f64 {
        if self.count < 2 { 0.0 } else { self.m2 / (self.count - 1) as f64 }
    }

    pub fn sd(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Coefficient of variation; `0.0` when the mean is zero so division
    /// never produces NaN/infinity for a caller that forgets to check.
    pub fn cv(&self) -> f64 {
        if self.mean() == 0.0 { 0.0 } else { self.sd() / self.mean() }
    }

    pub fn min(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.min }
    }

    pub fn max(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.max }
    }

    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    /// Aggregates `other`'s samples into `self`, combining counts, means,
    /// and variances via the parallel form of Welford's algorithm so the
    /// merged statistics equal what a single recorder fed both streams
    /// would have produced.
    pub fn merge(&mut self, other: &DiscreteRecord) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        let (n_a, n_b) = (self.count as f64, other.count as f64);
        let delta = other.mean - self.mean;
        let total = n_a + n_b;
        let new_mean = self.mean + delta * n_b / total;
        let new_m2 = self.m2 + other.m2 + delta * delta * n_a * n_b / total;
        self.count += other.count;
        self.mean = new_mean;
        self.m2 = new_m2;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.histogram.merge(&other.histogram);
    }
}

// ============================================================================
// CONTINUOUS RECORD
// ============================================================================
/// Time-weighted statistics over a piecewise-constant signal (e.g. queue
/// length, number busy) sampled at the instants it changes. `mean` is the
/// time-weighted average: the area under the signal divided by elapsed
/// time.
#[derive(Debug, Clone)]
pub struct ContinuousRecord {
    last_value: f64,
    last_time: qsim_core::SimTime,
    start_time: Option<qsim_core::SimTime>,
    area: f64,
    min: f64,
    max: f64,
}

impl Default for ContinuousRecord {
    fn default() -> Self {
        Self {
            last_value: 0.0,
            last_time: 0.0,
            start_time: None,
            area: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl ContinuousRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the signal took `value` from the previous update until
    /// `now`. The first call only establishes the starting value and time;
    /// the area under the curve accumulates from the second call onward.
    pub fn update(&mut self, now: qsim_core::SimTime, value: f64) {
        if let Some(_start) = self.start_time {
            let dt = now - self.last_time;
            debug_assert!(dt >= 0.0, "continuous recorder time must not go backward");
            self.area += self.last_value * dt;
        } else {
            self.start_time = Some(now);
        }
        self.min = self.min.min(self.last_value.min(value));
        self.max = self.max.max(self.last_value.max(value));
        self.last_value = value;
        self.last_time = now;
    }

    pub fn mean(&self) -> f64 {
        match self.start_time {
            Some(start) if self.last_time > start => self.area / (self.last_time - start),
            _ => self.last_value,
        }
    }

    pub fn min(&self) -> f64 {
        if self.min.is_finite() { self.min } else { 0.0 }
    }

    pub fn max(&self) -> f64 {
        if self.max.is_finite() { self.max } else { 0.0 }
    }

    pub fn current(&self) -> f64 {
        self.last_value
    }

    /// Aggregates `other` into `self` by summing areas and elapsed time,
    /// so the merged mean is the pooled time-weighted average.
    pub fn merge(&mut self, other: &ContinuousRecord) {
        let (Some(self_start), Some(other_start)) = (self.start_time, other.start_time) else {
            if other.start_time.is_some() {
                *self = other.clone();
            }
            return;
        };
        let self_span = self.last_time - self_start;
        let other_span = other.last_time - other_start;
        self.area += other.area;
        self.start_time = Some(0.0);
        self.last_time = self_span + other_span;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

// ============================================================================
// OPTIONS RECORD
// ============================================================================
/// A categorical counter over a small fixed set of labels (e.g. which
/// outbound edge a `Decide` station chose).
#[derive(Debug, Clone, Default)]
pub struct OptionsRecord {
    counts: HashMap<String, u64>,
}

impl OptionsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, label: impl Into<String>) {
        *self.counts.entry(label.into()).or_insert(0) += 1;
    }

    pub fn count(&self, label: &str) -> u64 {
        self.counts.get(label).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn fraction(&self, label: &str) -> f64 {
        let total = self.total();
        if total == 0 { 0.0 } else { self.count(label) as f64 / total as f64 }
    }

    pub fn merge(&mut self, other: &OptionsRecord) {
        for (label, count) in &other.counts {
            *self.counts.entry(label.clone()).or_insert(0) += count;
        }
    }
}
