//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: in-memory backends plus
//! canned analysis providers.

use std::sync::Arc;

use async_trait::async_trait;
use credex::provider::{AnalysisOutcome, AnalysisProvider, ProviderError};
use credex::{
    AnalysisIntegrityVerifier, EngineConfig, EquivalenceEngine, NewSubject, Percent,
    SubjectContentEngine, SubjectType,
};
use credex_cas::MemoryContentStore;
use credex_store::MemoryStore;

/// Provider that always returns the same outcome.
#[derive(Clone)]
pub struct FixedProvider {
    outcome: AnalysisOutcome,
}

impl FixedProvider {
    /// A provider whose score clears the default approval threshold.
    pub fn approving() -> Self {
        Self::with_percent("85.50")
    }

    /// A provider whose score misses the default approval threshold.
    pub fn rejecting() -> Self {
        Self::with_percent("60.00")
    }

    /// A provider returning the given percent.
    pub fn with_percent(percent: &str) -> Self {
        Self {
            outcome: AnalysisOutcome {
                percent: Percent::parse(percent).expect("fixture percent parses"),
                metadata: serde_json::json!({
                    "analysis_method": "content_comparison",
                    "confidence_level": "high",
                    "similarity_score": percent,
                }),
                contract_version: "v1.0.0".to_string(),
            },
        }
    }
}

#[async_trait]
impl AnalysisProvider for FixedProvider {
    async fn analyze(
        &self,
        _source: &str,
        _target: &str,
    ) -> Result<AnalysisOutcome, ProviderError> {
        Ok(self.outcome.clone())
    }
}

/// Provider that always fails.
pub struct FailingProvider;

#[async_trait]
impl AnalysisProvider for FailingProvider {
    async fn analyze(
        &self,
        _source: &str,
        _target: &str,
    ) -> Result<AnalysisOutcome, ProviderError> {
        Err(ProviderError("contract unreachable".to_string()))
    }
}

/// A test fixture sharing one in-memory record store.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// An equivalence engine over the shared store.
    pub fn equivalence_engine<P: AnalysisProvider>(
        &self,
        provider: P,
    ) -> EquivalenceEngine<MemoryStore, P> {
        EquivalenceEngine::new(self.store.clone(), provider, EngineConfig::default())
    }

    /// A subject engine over the shared store and a fresh blob store.
    pub fn subject_engine(&self) -> SubjectContentEngine<MemoryStore, MemoryContentStore> {
        SubjectContentEngine::new(self.store.clone(), MemoryContentStore::new())
    }

    /// An integrity verifier over the shared store.
    pub fn verifier(&self) -> AnalysisIntegrityVerifier<MemoryStore> {
        AnalysisIntegrityVerifier::new(self.store.clone())
    }

    /// A valid subject input with the given code and credits.
    pub fn new_subject(&self, code: &str, credits: u32) -> NewSubject {
        NewSubject {
            institution: "inst1".to_string(),
            course_id: "cs".to_string(),
            title: format!("Subject {code}"),
            code: code.to_string(),
            credits,
            workload_hours: 15 * credits,
            subject_type: SubjectType::Required,
            knowledge_area: "computing".to_string(),
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
