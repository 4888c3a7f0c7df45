//! # Credex
//!
//! Academic-credit equivalence resolution over a deterministic record
//! store, with hybrid on-ledger/content-addressed subject storage.
//!
//! ## Overview
//!
//! - [`EquivalenceEngine`] drives the equivalence-record lifecycle:
//!   request, analysis through an external [`AnalysisProvider`], and the
//!   approve/reject transition with an integrity hash over the result.
//! - [`SubjectContentEngine`] keeps essential subject fields in the record
//!   store and pushes extended curriculum content into the
//!   content-addressed blob store, plus prerequisite-group management and
//!   eligibility evaluation.
//! - [`AnalysisIntegrityVerifier`] recomputes stored analysis hashes to
//!   detect tampering or corruption.
//!
//! Execution is single-writer-per-operation and deterministic; the store
//! supplies atomicity, and no operation leaves partial state behind on
//! failure.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use credex::{EngineConfig, EquivalenceEngine};
//! use credex_store::SqliteStore;
//!
//! # use credex::provider::{AnalysisOutcome, AnalysisProvider, ProviderError};
//! # struct MyProvider;
//! # #[async_trait::async_trait]
//! # impl AnalysisProvider for MyProvider {
//! #     async fn analyze(&self, _: &str, _: &str) -> Result<AnalysisOutcome, ProviderError> {
//! #         unimplemented!()
//! #     }
//! # }
//! async fn example() {
//!     let store = Arc::new(SqliteStore::open("credex.db").unwrap());
//!     let engine = EquivalenceEngine::new(store, MyProvider, EngineConfig::default());
//!     let index = engine
//!         .create_request("subject-1", "subject-2", "inst-1", false)
//!         .await
//!         .unwrap();
//!     engine.execute_analysis(&index, "contract-c1").await.unwrap();
//! }
//! ```

pub mod config;
pub mod equivalence;
pub mod error;
pub mod events;
pub mod provider;
pub mod subject;
pub mod verifier;

pub use config::EngineConfig;
pub use equivalence::{
    BatchItem, BatchItemOutcome, BatchOutcome, EquivalenceEngine, EquivalenceRequest,
    EquivalenceStats,
};
pub use error::{EngineError, Result};
pub use events::{CollectingEventSink, DomainEvent, EventSink, TracingEventSink};
pub use provider::{AnalysisOutcome, AnalysisProvider, ProviderError};
pub use subject::{EligibilityReport, NewSubject, SubjectContentEngine};
pub use verifier::{AnalysisIntegrityVerifier, IntegrityReport};

// Domain types most callers need alongside the engines.
pub use credex_core::{
    CompletedSubjects, CreditsPolicy, EquivalenceRecord, EquivalenceStatus, ExtendedContent,
    ExtendedContentPatch, GroupType, Percent, PrerequisiteGroup, SubjectContent, SubjectType,
};
pub use credex_store::{PageRequest, PageResponse};
