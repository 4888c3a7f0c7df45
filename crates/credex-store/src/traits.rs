//! RecordStore trait: the abstract interface for record persistence.
//!
//! This trait allows the engines to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use credex_core::Record;

use crate::error::Result;

/// Page size applied when a request carries no limit.
pub const DEFAULT_PAGE_LIMIT: u64 = 100;

/// A pagination request: continue from a cursor, or skip `offset` entries.
///
/// When both are present the cursor wins; a cursor from a previous page is
/// always the cheaper continuation.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    /// Opaque continuation cursor from a previous [`PageResponse`].
    pub cursor: Option<String>,
    /// Entries to skip from the start of the matching set.
    pub offset: u64,
    /// Maximum entries to return; 0 means [`DEFAULT_PAGE_LIMIT`].
    pub limit: u64,
}

impl PageRequest {
    /// A request for the first `limit` entries.
    pub fn with_limit(limit: u64) -> Self {
        Self {
            cursor: None,
            offset: 0,
            limit,
        }
    }

    /// A request for `limit` entries starting at `offset`.
    pub fn at_offset(offset: u64, limit: u64) -> Self {
        Self {
            cursor: None,
            offset,
            limit,
        }
    }

    /// A continuation request from a cursor.
    pub fn from_cursor(cursor: impl Into<String>, limit: u64) -> Self {
        Self {
            cursor: Some(cursor.into()),
            offset: 0,
            limit,
        }
    }

    /// The effective page size.
    pub fn effective_limit(&self) -> u64 {
        if self.limit == 0 {
            DEFAULT_PAGE_LIMIT
        } else {
            self.limit
        }
    }
}

/// Pagination metadata returned with every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    /// Cursor for the next page; `None` when the set is exhausted.
    pub next_cursor: Option<String>,
    /// Count of all matching entries, not just this page.
    pub total: u64,
}

/// The RecordStore trait: async interface for record persistence.
///
/// # Design Notes
///
/// - **Atomic appends**: `append` assigns the next counter value as the
///   primary index, writes the record, bumps the counter, and writes one
///   marker entry per secondary-index dimension, all in one atomic unit.
/// - **Index maintenance**: `update` overwrites the record and replaces
///   its secondary-index entries in the same atomic unit, so a record is
///   never listed under a stale dimension key.
/// - **Ordering**: `list` walks records in insertion (counter) order;
///   `list_by_prefix` walks index entries lexicographically.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append a new record, assigning its primary index.
    ///
    /// Returns the stored record with the index filled in.
    async fn append<R: Record>(&self, record: R) -> Result<R>;

    /// Get a record by its primary index.
    async fn get<R: Record>(&self, index: &str) -> Result<Option<R>>;

    /// Overwrite an existing record, refreshing its secondary indexes.
    ///
    /// Fails with [`StoreError::NotFound`] if the index was never assigned.
    ///
    /// [`StoreError::NotFound`]: crate::error::StoreError::NotFound
    async fn update<R: Record>(&self, record: &R) -> Result<()>;

    /// List records of a kind in insertion order.
    async fn list<R: Record>(&self, page: &PageRequest) -> Result<(Vec<R>, PageResponse)>;

    /// List records matching one secondary-index dimension key,
    /// lexicographically by index entry.
    async fn list_by_prefix<R: Record>(
        &self,
        dimension: &str,
        key: &str,
        page: &PageRequest,
    ) -> Result<(Vec<R>, PageResponse)>;

    /// Count of all records of a kind.
    async fn count<R: Record>(&self) -> Result<u64>;
}
