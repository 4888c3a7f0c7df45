//! The analysis-provider boundary.
//!
//! Equivalence scoring is external: a contract, a service, a model. The
//! engine only depends on this trait, so production and test
//! implementations are interchangeable without touching the state machine.

use async_trait::async_trait;
use credex_core::Percent;
use thiserror::Error;

/// Outcome of one analysis-provider invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    /// The computed equivalence percentage.
    pub percent: Percent,

    /// Free-form payload describing how the score was derived.
    pub metadata: serde_json::Value,

    /// The provider version that produced this result.
    pub contract_version: String,
}

/// Error from the analysis provider.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

/// External component that computes an equivalence percentage and
/// supporting metadata for a pair of subjects.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(
        &self,
        source_subject_id: &str,
        target_subject_id: &str,
    ) -> Result<AnalysisOutcome, ProviderError>;
}
