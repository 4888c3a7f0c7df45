//! ContentStore trait: the abstract interface for blob persistence.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// The reference a stored blob is retrievable by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// SHA-256 hex digest of the blob bytes, computed before storage.
    pub content_hash: String,
    /// Backend-specific locator, e.g. `ipfs://Qm...` or `mem://...`.
    pub locator: String,
}

/// The ContentStore trait: async interface for content-addressed blobs.
///
/// Implementations must be deterministic about hashing: the same bytes
/// always produce the same `content_hash`.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store a blob, returning its hash and locator.
    async fn put(&self, content: &[u8]) -> Result<StoredBlob>;

    /// Retrieve a blob by its locator.
    async fn get(&self, locator: &str) -> Result<Bytes>;
}
