//! Equivalence records: the unit of state tracking whether and how
//! strongly two subjects are deemed academically equivalent.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::percent::Percent;
use crate::record::{dim, IndexEntry, Record};

/// Status of an equivalence record.
///
/// `Pending` is the initial state. The other three are terminal in the
/// sense that no further transition happens on its own, but all of them
/// are re-enterable through reanalysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquivalenceStatus {
    Pending,
    Approved,
    Rejected,
    Error,
}

impl EquivalenceStatus {
    /// The persisted string form, also used in status index keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Error => "error",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "error" => Ok(Self::Error),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for EquivalenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single equivalence record.
///
/// Records are append-only: they are never deleted, and the index is
/// immutable once assigned. Analysis execution overwrites the result
/// fields in place; the previous percent and metadata stay visible until
/// then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquivalenceRecord {
    /// Primary index, assigned by the store's monotonic counter.
    pub index: String,

    pub source_subject_id: String,
    pub target_subject_id: String,
    pub target_institution: String,

    pub status: EquivalenceStatus,

    /// Set by the first successful analysis; `None` while pending.
    pub equivalence_percent: Option<Percent>,

    /// The analysis-provider invocation that produced the current result.
    pub contract_address: String,
    pub contract_version: String,

    /// Free-form payload describing how the score was derived.
    pub analysis_metadata: serde_json::Value,

    /// SHA-256 hex digest over the analysis result. Empty until the first
    /// successful analysis; must match a fresh recomputation at all times
    /// after one.
    pub analysis_hash: String,

    /// Incremented exactly once per successful analysis execution.
    pub analysis_count: u64,

    /// Unix milliseconds.
    pub request_timestamp: i64,
    pub last_update_timestamp: i64,
}

impl EquivalenceRecord {
    /// Build a fresh pending request. The index is assigned on append.
    pub fn new_request(
        source_subject_id: impl Into<String>,
        target_subject_id: impl Into<String>,
        target_institution: impl Into<String>,
        now: i64,
    ) -> Self {
        Self {
            index: String::new(),
            source_subject_id: source_subject_id.into(),
            target_subject_id: target_subject_id.into(),
            target_institution: target_institution.into(),
            status: EquivalenceStatus::Pending,
            equivalence_percent: None,
            contract_address: String::new(),
            contract_version: String::new(),
            analysis_metadata: serde_json::Value::Null,
            analysis_hash: String::new(),
            analysis_count: 0,
            request_timestamp: now,
            last_update_timestamp: now,
        }
    }

    /// Validate the request fields before any mutation happens.
    pub fn validate_request(&self) -> Result<(), CoreError> {
        if self.source_subject_id.is_empty() {
            return Err(CoreError::EmptyField("source subject id"));
        }
        if self.target_subject_id.is_empty() {
            return Err(CoreError::EmptyField("target subject id"));
        }
        if self.target_institution.is_empty() {
            return Err(CoreError::EmptyField("target institution"));
        }
        if self.source_subject_id == self.target_subject_id {
            return Err(CoreError::SameSubject);
        }
        Ok(())
    }
}

impl Record for EquivalenceRecord {
    const KIND: &'static str = "equivalence";

    fn index(&self) -> &str {
        &self.index
    }

    fn set_index(&mut self, index: String) {
        self.index = index;
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        let mut entries = vec![
            IndexEntry::new(dim::SOURCE, &self.source_subject_id),
            IndexEntry::new(dim::TARGET, &self.target_subject_id),
            IndexEntry::new(dim::INSTITUTION, &self.target_institution),
            IndexEntry::new(dim::STATUS, self.status.as_str()),
        ];
        if !self.contract_address.is_empty() {
            entries.push(IndexEntry::new(dim::CONTRACT, &self.contract_address));
        }
        if !self.contract_version.is_empty() {
            entries.push(IndexEntry::new(
                dim::CONTRACT_VERSION,
                &self.contract_version,
            ));
        }
        entries
    }
}
