//! Run configuration
//!
//! [`RunConfig`] collects the knobs that change how a program executes without
//! changing the program itself: vector growth policy, call-depth limit, the
//! largest single allocation, the step budget used by headless runs and the
//! seed behind `rand_int`.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Default maximum number of frames on the call stack
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Default limit on the cells one array or heap block may take
pub const DEFAULT_MAX_ALLOC_CELLS: usize = 1 << 16;

/// Default step budget for `run_to_end`
pub const DEFAULT_MAX_STEPS: usize = 10_000;

/// Default seed for `rand_int`
pub const DEFAULT_SEED: u64 = 0x5EED;

/// How a full vector picks its next capacity when it reallocates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum GrowthPolicy {
    /// Double the capacity (an empty vector grows to 1)
    #[default]
    Double,
    /// Add a fixed number of elements
    Increment(usize),
}

impl GrowthPolicy {
    /// Capacity after growing a full block of `capacity` elements.
    ///
    /// Always at least `capacity + 1`.
    pub fn next_capacity(self, capacity: usize) -> usize {
        let grown = match self {
            GrowthPolicy::Double => capacity.saturating_mul(2),
            GrowthPolicy::Increment(n) => capacity.saturating_add(n),
        };
        grown.max(capacity + 1)
    }
}

impl fmt::Display for GrowthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrowthPolicy::Double => write!(f, "double"),
            GrowthPolicy::Increment(n) => write!(f, "+{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid growth policy '{0}' (expected `double` or `+N`)")]
pub struct GrowthPolicyParseError(String);

impl FromStr for GrowthPolicy {
    type Err = GrowthPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("double") {
            return Ok(GrowthPolicy::Double);
        }
        s.strip_prefix('+')
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .map(GrowthPolicy::Increment)
            .ok_or_else(|| GrowthPolicyParseError(s.to_string()))
    }
}

/// Settings for one interpreter run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    pub growth: GrowthPolicy,
    pub max_call_depth: usize,
    /// Largest array, `Vec` capacity or boxed value, in cells
    pub max_alloc_cells: usize,
    pub max_steps: usize,
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            growth: GrowthPolicy::Double,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_alloc_cells: DEFAULT_MAX_ALLOC_CELLS,
            max_steps: DEFAULT_MAX_STEPS,
            seed: DEFAULT_SEED,
        }
    }
}
