//! The record contract: the abstract interface between domain types and
//! the record store.
//!
//! Every persisted type declares a kind (its key space), carries a primary
//! index assigned by the store's monotonic counter, and derives the
//! secondary-index entries that must be maintained alongside it.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Secondary-index dimension names.
///
/// These form the first segment of every index key and must remain stable:
/// existing data is keyed by them.
pub mod dim {
    pub const SOURCE: &str = "source";
    pub const TARGET: &str = "target";
    pub const INSTITUTION: &str = "institution";
    pub const STATUS: &str = "status";
    pub const CONTRACT: &str = "contract";
    pub const CONTRACT_VERSION: &str = "contract-version";
    pub const COURSE: &str = "course";
    pub const SUBJECT: &str = "subject";
}

/// One secondary-index marker for a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// The dimension this entry belongs to (one of [`dim`]).
    pub dimension: &'static str,
    /// The lookup key within the dimension.
    pub key: String,
}

impl IndexEntry {
    pub fn new(dimension: &'static str, key: impl Into<String>) -> Self {
        Self {
            dimension,
            key: key.into(),
        }
    }

    /// The full storage key: `{dimension}/{key}/{index}`.
    pub fn storage_key(&self, index: &str) -> String {
        format!("{}/{}/{}", self.dimension, self.key, index)
    }
}

/// The contract every persisted record type fulfils.
///
/// The store assigns the primary index (a monotonic counter rendered as
/// text) via [`Record::set_index`] during append; the index is immutable
/// afterwards.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// The key space this record type lives in.
    const KIND: &'static str;

    /// The primary index (empty before the record is appended).
    fn index(&self) -> &str;

    /// Assign the primary index. Called exactly once, by the store.
    fn set_index(&mut self, index: String);

    /// The secondary-index entries to maintain for this record's current
    /// state. Recomputed on every write; stale entries are removed.
    fn index_entries(&self) -> Vec<IndexEntry>;
}
