//! Error types for the engines.

use credex_cas::CasError;
use credex_store::StoreError;
use thiserror::Error;

/// Errors that can occur during engine operations.
///
/// Validation errors are raised before any mutation; storage errors abort
/// the enclosing operation with no partial writes.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The named entity does not exist.
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// The request failed validation before any mutation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The external analysis provider failed or returned a malformed
    /// response; the record is left unchanged.
    #[error("analysis failed: {0}")]
    AnalysisFailed(String),

    /// A stored hash does not match its fresh recomputation.
    #[error("integrity failure for {index}: stored {stored}, calculated {calculated}")]
    IntegrityFailure {
        index: String,
        stored: String,
        calculated: String,
    },

    /// The content-addressed blob store is unreachable.
    #[error("content storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Reanalysis was requested but no contract address is available.
    #[error("no contract address available for analysis")]
    InvalidContractAddress,

    /// A payload could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<CasError> for EngineError {
    fn from(e: CasError) -> Self {
        EngineError::StorageUnavailable(e.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
