//! Operation cost model — maps a processed-key occurrence count to a cycle cost.
//!
//! Modeled as a closed sum type rather than a trait object, following the same
//! pattern `rust_gds`'s Pregel configuration module uses for its small
//! closed-set enums (see `Partitioning`): a handful of fixed variants, an
//! inherent method that dispatches on them, and a `parse`/`Display` pair so
//! configuration strings round-trip cleanly.

use std::fmt;

/// A cost function applied to the number of times a key has occurred so far
/// within the window currently being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Constant,
    Log,
    Linear,
    NLogN,
    Quadratic,
}

impl Operation {
    /// Cycles required to account for `n` occurrences of a single key.
    pub fn cycles(&self, n: u64) -> u64 {
        match self {
            Operation::Constant => 1,
            Operation::Log => log2_ceil(n + 1),
            Operation::Linear => n,
            Operation::NLogN => nlogn_ceil(n),
            Operation::Quadratic => n.saturating_mul(n),
        }
    }

    /// Whether this operation materializes every occurrence of a key downstream
    /// (sort/nested-loop style) rather than emitting each distinct key once.
    pub fn is_materializing(&self) -> bool {
        matches!(self, Operation::NLogN | Operation::Quadratic)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Constant" => Some(Operation::Constant),
            "Log" => Some(Operation::Log),
            "Linear" => Some(Operation::Linear),
            "NLogN" => Some(Operation::NLogN),
            "Quadratic" => Some(Operation::Quadratic),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Constant => "Constant",
            Operation::Log => "Log",
            Operation::Linear => "Linear",
            Operation::NLogN => "NLogN",
            Operation::Quadratic => "Quadratic",
        };
        write!(f, "{s}")
    }
}

fn log2_ceil(n: u64) -> u64 {
    if n <= 1 {
        return 0;
    }
    (n as f64).log2().ceil() as u64
}

fn nlogn_ceil(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    ((n as f64) * ((n as f64 + 1.0).log10())).ceil() as u64
}
