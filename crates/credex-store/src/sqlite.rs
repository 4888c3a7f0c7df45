//! SQLite implementation of the RecordStore trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking. Appends and updates
//! run inside SQLite transactions so the counter bump, primary write, and
//! secondary-index maintenance commit as one atomic unit.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use credex_core::Record;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::keys::{decode_cursor, dimension_prefix, encode_cursor, prefix_upper_bound};
use crate::migration;
use crate::traits::{PageRequest, PageResponse, RecordStore};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn lock_conn(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| StoreError::Background(format!("connection mutex poisoned: {}", e)))
}

fn join_error(e: tokio::task::JoinError) -> StoreError {
    StoreError::Background(format!("spawn_blocking failed: {}", e))
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn append<R: Record>(&self, mut record: R) -> Result<R> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = lock_conn(&conn)?;
            let tx = conn.transaction()?;

            let count: u64 = tx
                .query_row(
                    "SELECT count FROM record_counters WHERE kind = ?1",
                    params![R::KIND],
                    |row| row.get(0),
                )
                .optional()?
                .unwrap_or(0);

            let seq = count + 1;
            record.set_index(seq.to_string());
            let body = serde_json::to_string(&record)?;
            let now = now_millis();

            tx.execute(
                "INSERT INTO records (kind, seq, idx, body, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![R::KIND, seq, record.index(), body, now],
            )?;

            tx.execute(
                "INSERT INTO record_counters (kind, count) VALUES (?1, ?2)
                 ON CONFLICT(kind) DO UPDATE SET count = ?2",
                params![R::KIND, seq],
            )?;

            for entry in record.index_entries() {
                tx.execute(
                    "INSERT INTO record_indexes (kind, entry, idx) VALUES (?1, ?2, ?3)",
                    params![R::KIND, entry.storage_key(record.index()), record.index()],
                )?;
            }

            tx.commit()?;
            tracing::debug!(kind = R::KIND, index = %record.index(), "record appended");
            Ok(record)
        })
        .await
        .map_err(join_error)?
    }

    async fn get<R: Record>(&self, index: &str) -> Result<Option<R>> {
        let conn = self.conn.clone();
        let index = index.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = lock_conn(&conn)?;
            let body: Option<String> = conn
                .query_row(
                    "SELECT body FROM records WHERE kind = ?1 AND idx = ?2",
                    params![R::KIND, index],
                    |row| row.get(0),
                )
                .optional()?;

            match body {
                Some(body) => Ok(Some(serde_json::from_str(&body)?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(join_error)?
    }

    async fn update<R: Record>(&self, record: &R) -> Result<()> {
        let conn = self.conn.clone();
        let record = record.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = lock_conn(&conn)?;
            let tx = conn.transaction()?;

            let old_body: Option<String> = tx
                .query_row(
                    "SELECT body FROM records WHERE kind = ?1 AND idx = ?2",
                    params![R::KIND, record.index()],
                    |row| row.get(0),
                )
                .optional()?;
            let old_body = old_body.ok_or_else(|| {
                StoreError::NotFound(format!("{}/{}", R::KIND, record.index()))
            })?;

            // Drop the previous state's index entries before writing the new ones.
            let old: R = serde_json::from_str(&old_body)?;
            for entry in old.index_entries() {
                tx.execute(
                    "DELETE FROM record_indexes WHERE kind = ?1 AND entry = ?2",
                    params![R::KIND, entry.storage_key(old.index())],
                )?;
            }

            let body = serde_json::to_string(&record)?;
            tx.execute(
                "UPDATE records SET body = ?3, updated_at = ?4 WHERE kind = ?1 AND idx = ?2",
                params![R::KIND, record.index(), body, now_millis()],
            )?;

            for entry in record.index_entries() {
                tx.execute(
                    "INSERT INTO record_indexes (kind, entry, idx) VALUES (?1, ?2, ?3)",
                    params![R::KIND, entry.storage_key(record.index()), record.index()],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(join_error)?
    }

    async fn list<R: Record>(&self, page: &PageRequest) -> Result<(Vec<R>, PageResponse)> {
        let conn = self.conn.clone();
        let page = page.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock_conn(&conn)?;

            let total: u64 = conn.query_row(
                "SELECT COUNT(*) FROM records WHERE kind = ?1",
                params![R::KIND],
                |row| row.get(0),
            )?;

            let limit = page.effective_limit();
            let mut rows: Vec<(u64, String)> = match &page.cursor {
                Some(cursor) => {
                    let after: u64 = decode_cursor(cursor)?
                        .parse()
                        .map_err(|_| StoreError::InvalidCursor(cursor.clone()))?;
                    let mut stmt = conn.prepare(
                        "SELECT seq, body FROM records
                         WHERE kind = ?1 AND seq > ?2 ORDER BY seq LIMIT ?3",
                    )?;
                    let mapped = stmt.query_map(params![R::KIND, after, limit + 1], |row| {
                        Ok((row.get(0)?, row.get(1)?))
                    })?;
                    mapped.collect::<std::result::Result<_, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT seq, body FROM records
                         WHERE kind = ?1 ORDER BY seq LIMIT ?2 OFFSET ?3",
                    )?;
                    let mapped =
                        stmt.query_map(params![R::KIND, limit + 1, page.offset], |row| {
                            Ok((row.get(0)?, row.get(1)?))
                        })?;
                    mapped.collect::<std::result::Result<_, _>>()?
                }
            };

            let has_more = rows.len() as u64 > limit;
            rows.truncate(limit as usize);

            let next_cursor = if has_more {
                rows.last().map(|(seq, _)| encode_cursor(&seq.to_string()))
            } else {
                None
            };

            let mut records = Vec::with_capacity(rows.len());
            for (_, body) in rows {
                records.push(serde_json::from_str(&body)?);
            }

            Ok((records, PageResponse { next_cursor, total }))
        })
        .await
        .map_err(join_error)?
    }

    async fn list_by_prefix<R: Record>(
        &self,
        dimension: &str,
        key: &str,
        page: &PageRequest,
    ) -> Result<(Vec<R>, PageResponse)> {
        let conn = self.conn.clone();
        let page = page.clone();
        let prefix = dimension_prefix(dimension, key);

        tokio::task::spawn_blocking(move || {
            let conn = lock_conn(&conn)?;

            // Key material is ASCII, so a finite upper bound always exists.
            let upper = prefix_upper_bound(&prefix)
                .ok_or_else(|| StoreError::Corrupted(format!("unbounded prefix {prefix}")))?;

            let total: u64 = conn.query_row(
                "SELECT COUNT(*) FROM record_indexes
                 WHERE kind = ?1 AND entry >= ?2 AND entry < ?3",
                params![R::KIND, prefix, upper],
                |row| row.get(0),
            )?;

            let limit = page.effective_limit();
            let mut rows: Vec<(String, String)> = match &page.cursor {
                Some(cursor) => {
                    let after = decode_cursor(cursor)?;
                    let mut stmt = conn.prepare(
                        "SELECT i.entry, r.body FROM record_indexes i
                         JOIN records r ON r.kind = i.kind AND r.idx = i.idx
                         WHERE i.kind = ?1 AND i.entry >= ?2 AND i.entry < ?3 AND i.entry > ?4
                         ORDER BY i.entry LIMIT ?5",
                    )?;
                    let mapped = stmt.query_map(
                        params![R::KIND, prefix, upper, after, limit + 1],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )?;
                    mapped.collect::<std::result::Result<_, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT i.entry, r.body FROM record_indexes i
                         JOIN records r ON r.kind = i.kind AND r.idx = i.idx
                         WHERE i.kind = ?1 AND i.entry >= ?2 AND i.entry < ?3
                         ORDER BY i.entry LIMIT ?4 OFFSET ?5",
                    )?;
                    let mapped = stmt.query_map(
                        params![R::KIND, prefix, upper, limit + 1, page.offset],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )?;
                    mapped.collect::<std::result::Result<_, _>>()?
                }
            };

            let has_more = rows.len() as u64 > limit;
            rows.truncate(limit as usize);

            let next_cursor = if has_more {
                rows.last().map(|(entry, _)| encode_cursor(entry))
            } else {
                None
            };

            let mut records = Vec::with_capacity(rows.len());
            for (_, body) in rows {
                records.push(serde_json::from_str(&body)?);
            }

            Ok((records, PageResponse { next_cursor, total }))
        })
        .await
        .map_err(join_error)?
    }

    async fn count<R: Record>(&self) -> Result<u64> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock_conn(&conn)?;
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM records WHERE kind = ?1",
                params![R::KIND],
                |row| row.get(0),
            )?)
        })
        .await
        .map_err(join_error)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credex_core::IndexEntry;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Enrollment {
        index: String,
        student: String,
        state: String,
    }

    impl Enrollment {
        fn new(student: &str, state: &str) -> Self {
            Self {
                index: String::new(),
                student: student.to_string(),
                state: state.to_string(),
            }
        }
    }

    impl Record for Enrollment {
        const KIND: &'static str = "enrollment";

        fn index(&self) -> &str {
            &self.index
        }

        fn set_index(&mut self, index: String) {
            self.index = index;
        }

        fn index_entries(&self) -> Vec<IndexEntry> {
            vec![
                IndexEntry::new("student", &self.student),
                IndexEntry::new("state", &self.state),
            ]
        }
    }

    #[tokio::test]
    async fn test_sqlite_append_and_get() {
        let store = SqliteStore::open_memory().unwrap();

        let a = store.append(Enrollment::new("s1", "active")).await.unwrap();
        let b = store.append(Enrollment::new("s2", "active")).await.unwrap();
        assert_eq!(a.index, "1");
        assert_eq!(b.index, "2");

        let fetched: Enrollment = store.get(&a.index).await.unwrap().unwrap();
        assert_eq!(fetched, a);
    }

    #[tokio::test]
    async fn test_sqlite_update_refreshes_indexes() {
        let store = SqliteStore::open_memory().unwrap();
        let mut record = store.append(Enrollment::new("s1", "active")).await.unwrap();

        record.state = "done".to_string();
        store.update(&record).await.unwrap();

        let (active, page) = store
            .list_by_prefix::<Enrollment>("state", "active", &PageRequest::default())
            .await
            .unwrap();
        assert!(active.is_empty());
        assert_eq!(page.total, 0);

        let (done, _) = store
            .list_by_prefix::<Enrollment>("state", "done", &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(done.len(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_prefix_pagination() {
        let store = SqliteStore::open_memory().unwrap();
        for _ in 0..15 {
            store.append(Enrollment::new("s1", "approved")).await.unwrap();
        }
        for _ in 0..5 {
            store.append(Enrollment::new("s1", "pending")).await.unwrap();
        }

        let (records, info) = store
            .list_by_prefix::<Enrollment>("state", "approved", &PageRequest::with_limit(10))
            .await
            .unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(info.total, 15);
        assert!(info.next_cursor.is_some());

        let (rest, info) = store
            .list_by_prefix::<Enrollment>(
                "state",
                "approved",
                &PageRequest::from_cursor(info.next_cursor.unwrap(), 10),
            )
            .await
            .unwrap();
        assert_eq!(rest.len(), 5);
        assert_eq!(info.total, 15);
        assert!(info.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.append(Enrollment::new("s1", "active")).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let fetched: Enrollment = store.get("1").await.unwrap().unwrap();
        assert_eq!(fetched.student, "s1");

        // The counter survives reopen: the next index continues the sequence.
        let next = store.append(Enrollment::new("s2", "active")).await.unwrap();
        assert_eq!(next.index, "2");
    }
}
