//! # Credex CAS
//!
//! Content-addressed blob storage for Credex. Large subject content lives
//! here; the record store keeps only a `(hash, locator)` reference.
//!
//! ## Key Types
//!
//! - [`ContentStore`] - The async trait for blob storage
//! - [`GatewayContentStore`] - IPFS-style HTTP gateway backend
//! - [`MemoryContentStore`] - In-memory backend for tests
//! - [`StoredBlob`] - The `(content_hash, locator)` pair a put returns
//!
//! ## Design Notes
//!
//! - The content hash is always SHA-256 over the blob bytes, computed
//!   locally before the blob leaves the process; the gateway's own
//!   addressing is carried in the locator and never trusted for integrity.
//! - `put` then `get(locator)` returns bytes identical to the input.

pub mod error;
pub mod gateway;
pub mod memory;
pub mod traits;

pub use error::{CasError, Result};
pub use gateway::GatewayContentStore;
pub use memory::MemoryContentStore;
pub use traits::{ContentStore, StoredBlob};
