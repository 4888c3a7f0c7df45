//! Error types for Credex core.

use thiserror::Error;

/// Errors that can occur while validating or encoding domain data.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid percent: {0}")]
    InvalidPercent(String),

    #[error("unknown equivalence status: {0}")]
    UnknownStatus(String),

    #[error("unknown group type: {0}")]
    UnknownGroupType(String),

    #[error("unknown subject type: {0}")]
    UnknownSubjectType(String),

    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    #[error("{0} cannot be zero")]
    ZeroField(&'static str),

    #[error("source and target subjects cannot be the same")]
    SameSubject,

    #[error("content hash and locator must be set together")]
    DanglingContentRef,

    #[error("encoding error: {0}")]
    Encoding(String),
}
