//! IPFS-style HTTP gateway implementation of the ContentStore trait.
//!
//! Talks to a gateway exposing the `/api/v0/add` (multipart upload) and
//! `/api/v0/cat?arg=` (retrieval) endpoints. The content hash is computed
//! locally with SHA-256 before upload; the gateway's own address goes
//! into the locator under the `ipfs://` scheme.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use credex_core::Sha256Hash;
use serde::Deserialize;

use crate::error::{CasError, Result};
use crate::traits::{ContentStore, StoredBlob};

/// Default request timeout against the gateway.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Gateway-backed content store.
pub struct GatewayContentStore {
    client: reqwest::Client,
    endpoint: String,
}

/// The gateway's add response.
#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(alias = "Hash")]
    hash: String,
}

impl GatewayContentStore {
    /// Create a client for the gateway at `endpoint` (e.g.
    /// `http://localhost:5001`).
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CasError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    /// Strip the `ipfs://` scheme from a locator, if present.
    fn gateway_address(locator: &str) -> &str {
        locator.strip_prefix("ipfs://").unwrap_or(locator)
    }
}

#[async_trait]
impl ContentStore for GatewayContentStore {
    async fn put(&self, content: &[u8]) -> Result<StoredBlob> {
        let content_hash = Sha256Hash::hash(content).to_hex();

        let part = reqwest::multipart::Part::bytes(content.to_vec()).file_name("content");
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = format!("{}/api/v0/add", self.endpoint);
        let response = self.client.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            return Err(CasError::Gateway(format!(
                "add returned {}",
                response.status()
            )));
        }

        let body: AddResponse = response
            .json()
            .await
            .map_err(|e| CasError::Gateway(format!("malformed add response: {}", e)))?;

        let locator = format!("ipfs://{}", body.hash);
        tracing::debug!(locator = %locator, bytes = content.len(), "blob stored");

        Ok(StoredBlob {
            content_hash,
            locator,
        })
    }

    async fn get(&self, locator: &str) -> Result<Bytes> {
        let address = Self::gateway_address(locator);
        if address.is_empty() {
            return Err(CasError::InvalidLocator(locator.to_string()));
        }

        let url = format!("{}/api/v0/cat?arg={}", self.endpoint, address);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CasError::NotFound(locator.to_string()));
        }
        if !response.status().is_success() {
            return Err(CasError::Gateway(format!(
                "cat returned {}",
                response.status()
            )));
        }

        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_address_strips_scheme() {
        assert_eq!(
            GatewayContentStore::gateway_address("ipfs://QmAbc"),
            "QmAbc"
        );
        assert_eq!(GatewayContentStore::gateway_address("QmAbc"), "QmAbc");
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let store = GatewayContentStore::new("http://localhost:5001/").unwrap();
        assert_eq!(store.endpoint, "http://localhost:5001");
    }
}
