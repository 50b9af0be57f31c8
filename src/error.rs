//! Error types — configuration, input, and CLI usage failures.
//!
//! Grounded on `src/errors.rs`'s `ApiError` (`#[derive(Error)]` enum of named
//! variants, one `#[error("...")]` template each) generalized to the kinds
//! named in SPEC_FULL §7: every configuration problem gets its own variant so
//! callers can match on kind rather than parse a message.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("field `{field}` is out of range: {value}")]
    OutOfRange { field: String, value: String },

    #[error("unknown value `{value}` for field `{field}`")]
    UnknownEnumValue { field: String, value: String },

    #[error("duplicate node id `{0}`")]
    DuplicateNodeId(String),

    #[error("stage ids must be sequential starting at 0: expected {expected}, found {found}")]
    NonSequentialStageId { expected: usize, found: usize },

    #[error("stage {stage_id} declares type `{stage_type}` but node `{node_id}` is a `{node_type}`")]
    MismatchedNodeType {
        stage_id: usize,
        stage_type: String,
        node_id: String,
        node_type: String,
    },

    #[error("topology must declare a stage with id 0")]
    MissingStageZero,

    #[error("stage {0} sets key_splitting but declares no worker nodes")]
    KeySplittingRequiresWorker(usize),
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration document: {0}")]
    InvalidFormat(String),

    #[error("usage error: {0}")]
    Usage(String),
}

impl SimulationError {
    /// Exit code contract from SPEC_FULL §6A: usage errors exit 2, everything
    /// else that reaches `main` exits 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            SimulationError::Usage(_) => 2,
            _ => 1,
        }
    }
}
