//! A discrete-step simulator of a staged stream-processing dataflow: keys
//! arrive in per-step batches, are routed by a closed set of partitioning
//! strategies, and accumulate in sliding time windows that are processed
//! under a per-step cycle budget.
//!
//! Module layout mirrors the component design: cost model and window
//! mechanics at the bottom (`operation`, `window`), per-node state machines
//! above them (`worker`, `aggregator`), routing and assembly above that
//! (`strategy`, `stage`, `topology`), and the ambient stack alongside
//! (`config`, `error`, `logging`, `keygen`).

pub mod aggregator;
pub mod config;
pub mod error;
pub mod keygen;
pub mod logging;
pub mod operation;
pub mod simulator;
pub mod stage;
pub mod stats;
pub mod strategy;
pub mod topology;
pub mod window;
pub mod worker;

/// A short identifier drawn from a bounded alphabet (§3).
pub type Key = String;

/// Reserved token that carries no data; it only advances the recipient's
/// clock (§3, §4.6).
pub const STEP_UPDATE: &str = "step_update";

/// Sentinel appended to a drained window's emission so an aggregator can tell
/// a worker has nothing more to contribute to that window (§4.3 step 2).
pub const FINISHED: &str = "finished";
