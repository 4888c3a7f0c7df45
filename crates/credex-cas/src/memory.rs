//! In-memory implementation of the ContentStore trait.
//!
//! For tests. Locators use the `mem://` scheme with the content hash as
//! the address, so the locator itself is content-derived.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use credex_core::Sha256Hash;

use crate::error::{CasError, Result};
use crate::traits::{ContentStore, StoredBlob};

/// In-memory content store.
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().unwrap().is_empty()
    }
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, content: &[u8]) -> Result<StoredBlob> {
        let content_hash = Sha256Hash::hash(content).to_hex();
        let locator = format!("mem://{}", content_hash);
        self.blobs
            .write()
            .unwrap()
            .insert(locator.clone(), Bytes::copy_from_slice(content));
        Ok(StoredBlob {
            content_hash,
            locator,
        })
    }

    async fn get(&self, locator: &str) -> Result<Bytes> {
        self.blobs
            .read()
            .unwrap()
            .get(locator)
            .cloned()
            .ok_or_else(|| CasError::NotFound(locator.to_string()))
    }
}
