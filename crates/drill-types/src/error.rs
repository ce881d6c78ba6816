//! Type-level error types

use thiserror::Error;

/// Errors raised while parsing or assembling drill types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("Unknown resource kind: {0}")]
    UnknownKind(String),

    #[error("Target parameters for {params} cannot restore a {kind} recovery point")]
    KindMismatch { kind: String, params: String },

    #[error("Invalid target spec: {0}")]
    InvalidTarget(String),

    #[error("Inconsistent result: {0}")]
    InconsistentResult(String),
}

/// Result type for type-level operations
pub type Result<T> = std::result::Result<T, TypeError>;
