//! In-memory implementation of the RecordStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::RwLock;

use async_trait::async_trait;
use credex_core::Record;

use crate::error::{Result, StoreError};
use crate::keys::{decode_cursor, dimension_prefix, encode_cursor, prefix_upper_bound};
use crate::traits::{PageRequest, PageResponse, RecordStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock;
/// every operation holds the lock for its full duration, which preserves
/// the single-writer atomicity the append/update contracts require.
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    /// One table per record kind.
    tables: HashMap<&'static str, Table>,
}

#[derive(Default)]
struct Table {
    /// Primary records keyed by counter value.
    records: BTreeMap<u64, serde_json::Value>,

    /// Secondary-index entries: full storage key -> primary index.
    entries: BTreeMap<String, String>,

    /// The monotonic counter; the last assigned index.
    count: u64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a primary index back to its counter value.
fn parse_index(index: &str) -> Option<u64> {
    index.parse().ok()
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn append<R: Record>(&self, mut record: R) -> Result<R> {
        let mut inner = self.inner.write().unwrap();
        let table = inner.tables.entry(R::KIND).or_default();

        let seq = table.count + 1;
        record.set_index(seq.to_string());

        let value = serde_json::to_value(&record)?;
        table.records.insert(seq, value);
        table.count = seq;

        let index = record.index().to_string();
        for entry in record.index_entries() {
            table.entries.insert(entry.storage_key(&index), index.clone());
        }

        tracing::debug!(kind = R::KIND, index = %index, "record appended");
        Ok(record)
    }

    async fn get<R: Record>(&self, index: &str) -> Result<Option<R>> {
        let inner = self.inner.read().unwrap();
        let Some(table) = inner.tables.get(R::KIND) else {
            return Ok(None);
        };
        let Some(seq) = parse_index(index) else {
            return Ok(None);
        };
        match table.records.get(&seq) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    async fn update<R: Record>(&self, record: &R) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let table = inner
            .tables
            .get_mut(R::KIND)
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", R::KIND, record.index())))?;

        let seq = parse_index(record.index())
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", R::KIND, record.index())))?;
        let old_value = table
            .records
            .get(&seq)
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", R::KIND, record.index())))?;

        // Serialize up front: past this point nothing can fail, so the
        // entry swap below is all-or-nothing.
        let new_value = serde_json::to_value(record)?;
        let old: R = serde_json::from_value(old_value.clone())?;

        for entry in old.index_entries() {
            table.entries.remove(&entry.storage_key(old.index()));
        }

        table.records.insert(seq, new_value);
        for entry in record.index_entries() {
            table
                .entries
                .insert(entry.storage_key(record.index()), record.index().to_string());
        }

        Ok(())
    }

    async fn list<R: Record>(&self, page: &PageRequest) -> Result<(Vec<R>, PageResponse)> {
        let inner = self.inner.read().unwrap();
        let Some(table) = inner.tables.get(R::KIND) else {
            return Ok((
                Vec::new(),
                PageResponse {
                    next_cursor: None,
                    total: 0,
                },
            ));
        };

        let limit = page.effective_limit() as usize;
        let total = table.records.len() as u64;

        let mut selected: Vec<(u64, &serde_json::Value)> = match &page.cursor {
            Some(cursor) => {
                let after: u64 = decode_cursor(cursor)?
                    .parse()
                    .map_err(|_| StoreError::InvalidCursor(cursor.clone()))?;
                table
                    .records
                    .range((Bound::Excluded(after), Bound::Unbounded))
                    .map(|(seq, v)| (*seq, v))
                    .take(limit + 1)
                    .collect()
            }
            None => table
                .records
                .iter()
                .skip(page.offset as usize)
                .map(|(seq, v)| (*seq, v))
                .take(limit + 1)
                .collect(),
        };

        let has_more = selected.len() > limit;
        selected.truncate(limit);

        let next_cursor = if has_more {
            selected
                .last()
                .map(|(seq, _)| encode_cursor(&seq.to_string()))
        } else {
            None
        };

        let mut records = Vec::with_capacity(selected.len());
        for (_, value) in selected {
            records.push(serde_json::from_value(value.clone())?);
        }

        Ok((records, PageResponse { next_cursor, total }))
    }

    async fn list_by_prefix<R: Record>(
        &self,
        dimension: &str,
        key: &str,
        page: &PageRequest,
    ) -> Result<(Vec<R>, PageResponse)> {
        let inner = self.inner.read().unwrap();
        let Some(table) = inner.tables.get(R::KIND) else {
            return Ok((
                Vec::new(),
                PageResponse {
                    next_cursor: None,
                    total: 0,
                },
            ));
        };

        let prefix = dimension_prefix(dimension, key);
        let upper = match prefix_upper_bound(&prefix) {
            Some(u) => Bound::Excluded(u),
            None => Bound::Unbounded,
        };
        let range = || {
            table
                .entries
                .range::<String, _>((Bound::Included(prefix.clone()), upper.clone()))
        };

        let total = range().count() as u64;
        let limit = page.effective_limit() as usize;

        let after = match &page.cursor {
            Some(cursor) => Some(decode_cursor(cursor)?),
            None => None,
        };

        let mut selected: Vec<(&String, &String)> = match &after {
            Some(after_key) => range()
                .filter(|(entry, _)| entry.as_str() > after_key.as_str())
                .take(limit + 1)
                .collect(),
            None => range().skip(page.offset as usize).take(limit + 1).collect(),
        };

        let has_more = selected.len() > limit;
        selected.truncate(limit);

        let next_cursor = if has_more {
            selected.last().map(|(entry, _)| encode_cursor(entry))
        } else {
            None
        };

        let mut records = Vec::with_capacity(selected.len());
        for (entry, index) in selected {
            let seq = parse_index(index)
                .ok_or_else(|| StoreError::Corrupted(format!("index entry {entry}")))?;
            let value = table
                .records
                .get(&seq)
                .ok_or_else(|| StoreError::Corrupted(format!("index entry {entry}")))?;
            records.push(serde_json::from_value(value.clone())?);
        }

        Ok((records, PageResponse { next_cursor, total }))
    }

    async fn count<R: Record>(&self) -> Result<u64> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .tables
            .get(R::KIND)
            .map(|t| t.records.len() as u64)
            .unwrap_or(0))
    }
}
