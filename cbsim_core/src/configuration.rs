//! Process wide defaults used when building models and solving problems
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::{LazyLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

#[derive(Clone, Debug)]
pub struct Configuration {
    /// Lower bound given to reversible reactions when the model file doesn't specify one
    pub lower_bound: f64,
    /// Upper bound given to reactions when the model file doesn't specify one
    pub upper_bound: f64,
    /// Tolerance used when comparing fluxes and objective values
    pub tolerance: f64,
    /// Preferred solver, used whenever it can handle the problem type
    pub solver: Solver,
    /// Relative tolerance of ROOM
    pub room_delta: f64,
    /// Absolute tolerance of ROOM
    pub room_epsilon: f64,
    /// Magnitude substituted for infinite bounds where a finite bound is required (ROOM)
    pub unbounded_flux: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            tolerance: 1e-07,
            solver: Solver::Clarabel,
            room_delta: 0.03,
            room_epsilon: 0.001,
            unbounded_flux: 1e4,
        }
    }
}

/// Read access to the configuration, recovering the guard if a writer panicked
pub fn read() -> RwLockReadGuard<'static, Configuration> {
    CONFIGURATION.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Write access to the configuration, recovering the guard if a writer panicked
pub fn write() -> RwLockWriteGuard<'static, Configuration> {
    CONFIGURATION
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn default_lower_bound() -> f64 {
    read().lower_bound
}

pub(crate) fn default_upper_bound() -> f64 {
    read().upper_bound
}

/// Enum used to specify the default solver to use
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Solver {
    /// Use the Clarabel interior point solver (LP and QP)
    Clarabel,
    /// Use the microlp simplex solver (LP and MILP), requires the microlp feature to be enabled
    MicroLp,
}

impl Display for Solver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Solver::Clarabel => write!(f, "clarabel"),
            Solver::MicroLp => write!(f, "microlp"),
        }
    }
}

impl FromStr for Solver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clarabel" => Ok(Solver::Clarabel),
            "microlp" | "minilp" => Ok(Solver::MicroLp),
            other => Err(format!("unknown solver `{other}`")),
        }
    }
}
