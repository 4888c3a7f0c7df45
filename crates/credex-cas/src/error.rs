//! Error types for the content store.

use thiserror::Error;

/// Errors that can occur during blob operations.
#[derive(Debug, Error)]
pub enum CasError {
    /// No blob at the given locator.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The locator is not in a recognized form.
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    /// The gateway answered with an error status.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// The backing store could not be reached.
    #[error("content store unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for CasError {
    fn from(e: reqwest::Error) -> Self {
        CasError::Unavailable(e.to_string())
    }
}

/// Result type for content-store operations.
pub type Result<T> = std::result::Result<T, CasError>;
