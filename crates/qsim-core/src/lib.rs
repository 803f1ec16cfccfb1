//! Core type aliases, identifiers, error taxonomy, and logging bootstrap
//! shared across the qsim workspace.
#![allow(dead_code)]

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Simulated clock value. Non-negative, monotonically non-decreasing across
/// executed events.
pub type SimTime = f64;
/// A normalized probability in `[0, 1]`.
pub type Probability = f64;
/// A positive rate parameter (e.g. arrivals/unit-time) used by Decide stations.
pub type Rate = f64;

// ============================================================================
// TRAITS
// ============================================================================
/// Random instance generation for property tests and Monte Carlo sampling.
pub trait Arbitrary {
    /// Generate a uniformly random instance.
    fn random() -> Self;
}

/// Unique identifier trait for domain entities.
pub trait Unique<T = Self> {
    fn id(&self) -> ID<T>;
}

// ============================================================================
// IDENTITY TYPES
// ============================================================================
use std::cmp::Ordering;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::hash::Hash;
use std::hash::Hasher;
use std::marker::PhantomData;

/// Generic ID wrapper providing compile-time type safety over a plain `u64`.
///
/// Unlike a UUID-backed identifier, `ID<T>` is a monotonically increasing
/// counter value handed out by an [`IdGen<T>`]. That keeps client and event
/// identity reproducible across runs of the same model with the same seed,
/// which a wall-clock-derived identifier (e.g. `Uuid::now_v7`) would not be.
pub struct ID<T> {
    inner: u64,
    marker: PhantomData<fn() -> T>,
}

impl<T> ID<T> {
    pub const fn new(inner: u64) -> Self {
        Self {
            inner,
            marker: PhantomData,
        }
    }
    pub const fn inner(&self) -> u64 {
        self.inner
    }
}

impl<T> Copy for ID<T> {}
impl<T> Clone for ID<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Eq for ID<T> {}
impl<T> PartialEq for ID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}
impl<T> Ord for ID<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<T> PartialOrd for ID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<T> Hash for ID<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}
impl<T> Debug for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ID").field(&self.inner).finish()
    }
}
impl<T> Display for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

/// Hands out monotonically increasing [`ID<T>`] values. One generator is
/// shared (via `Rc<RefCell<_>>`) across every station that mints entities of
/// type `T` within a single run, so identity stays unique per run without
/// coordinating across threads.
#[derive(Debug)]
pub struct IdGen<T> {
    next: u64,
    marker: PhantomData<fn() -> T>,
}

impl<T> Default for IdGen<T> {
    fn default() -> Self {
        Self {
            next: 0,
            marker: PhantomData,
        }
    }
}

impl<T> IdGen<T> {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn next_id(&mut self) -> ID<T> {
        let id = ID::new(self.next);
        self.next += 1;
        id
    }
}

// ============================================================================
// ERROR TAXONOMY (spec.md §7)
// ============================================================================
/// Categorizes the fatal error conditions the engine can raise. Domain
/// outcomes that merely look like failures — a blocked or canceled client —
/// are never represented this way; they are routed handoffs, not `Err`s.
pub mod error {
    use std::fmt;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ErrorKind {
        /// Raised at wiring time: missing sampler, terminal station with no
        /// successor, an all-zero rate vector, non-positive `c` or `b`.
        Configuration,
        /// Raised at event time: a routing function returned an
        /// out-of-range index, or a client type had no successor and no
        /// default.
        Routing,
        /// A sampler yielded NaN.
        Sampling,
        /// An internal consistency check failed (e.g. busy servers exceed
        /// capacity). Indicates an engine bug, not a modeling mistake.
        Invariant,
    }

    impl fmt::Display for ErrorKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let s = match self {
                ErrorKind::Configuration => "configuration error",
                ErrorKind::Routing => "routing error",
                ErrorKind::Sampling => "sampling error",
                ErrorKind::Invariant => "invariant violation",
            };
            write!(f, "{s}")
        }
    }

    pub fn configuration(msg: impl fmt::Display) -> anyhow::Error {
        anyhow::anyhow!("{}: {msg}", ErrorKind::Configuration)
    }
    pub fn routing(msg: impl fmt::Display) -> anyhow::Error {
        anyhow::anyhow!("{}: {msg}", ErrorKind::Routing)
    }
    pub fn sampling(msg: impl fmt::Display) -> anyhow::Error {
        anyhow::anyhow!("{}: {msg}", ErrorKind::Sampling)
    }
    pub fn invariant(msg: impl fmt::Display) -> anyhow::Error {
        anyhow::anyhow!("{}: {msg}", ErrorKind::Invariant)
    }
}

// ============================================================================
// CONSTANTS
// ============================================================================
/// Default bin count for the adaptive discrete-value histogram (§4.B).
pub const DEFAULT_HISTOGRAM_BINS: usize = 128;
/// Initial bin width before any overflow-driven doubling.
pub const DEFAULT_HISTOGRAM_BIN_WIDTH: f64 = 1.0;

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize dual logging (terminal + file) with a timestamped log file.
/// Creates a `logs/` directory and writes DEBUG level to file, INFO to
/// terminal. Mirrors the teacher crate's `server`-gated logger bootstrap.
#[cfg(feature = "logging")]
pub fn init_logging() -> anyhow::Result<()> {
    std::fs::create_dir_all("logs")?;
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{time}.log"))?,
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file])
        .map_err(|e| anyhow::anyhow!("initialize logger: {e}"))
}
