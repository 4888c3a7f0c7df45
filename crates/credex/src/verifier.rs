//! Analysis integrity verification.
//!
//! Recomputes the digest over a record's stored analysis result and
//! compares it with the hash stamped at write time. Read-only; never
//! mutates.

use std::sync::Arc;

use credex_core::{analysis_digest, EquivalenceRecord};
use credex_store::RecordStore;

use crate::error::{EngineError, Result};

/// Result of an integrity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    pub is_valid: bool,
    pub stored_hash: String,
    pub calculated_hash: String,
}

/// Verifier over stored analysis metadata.
pub struct AnalysisIntegrityVerifier<S> {
    store: Arc<S>,
}

impl<S: RecordStore> AnalysisIntegrityVerifier<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Verify the integrity hash of a record.
    ///
    /// The recomputation uses the identical canonicalization as the write
    /// path, so an unmodified record always verifies. A record that never
    /// completed an analysis has no hash on file and reports invalid.
    pub async fn verify(&self, index: &str) -> Result<IntegrityReport> {
        let record: EquivalenceRecord = self
            .store
            .get(index)
            .await?
            .ok_or_else(|| EngineError::NotFound("equivalence", index.to_string()))?;

        let percent = record
            .equivalence_percent
            .as_ref()
            .map(|p| p.as_str())
            .unwrap_or("");
        let calculated_hash =
            analysis_digest(&record.analysis_metadata, percent, &record.contract_address)
                .to_hex();

        Ok(IntegrityReport {
            is_valid: record.analysis_hash == calculated_hash,
            stored_hash: record.analysis_hash,
            calculated_hash,
        })
    }
}
