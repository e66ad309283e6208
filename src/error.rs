//! Error types for weight search and constraint blocking.

use thiserror::Error;

/// Main error type for u-weightsearch operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration, rejected before any work is done.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument passed to an otherwise valid operation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation that the receiving structure cannot support.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Operation attempted in the wrong lifecycle state (e.g. after close).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The scoring hook failed or produced an unusable score.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// The embedded weight learner failed.
    #[error("Learner error: {0}")]
    Learner(String),
}

/// Result type alias for u-weightsearch operations.
pub type Result<T> = std::result::Result<T, Error>;
