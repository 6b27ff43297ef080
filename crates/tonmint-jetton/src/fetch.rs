//! Fetching external metadata documents over HTTP.

use std::time::Duration;

use crate::metadata::JettonMetadata;
use crate::{JettonError, JettonResult};

/// Public gateway used to resolve `ipfs://` URIs.
pub const IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Default request timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Rewrite an `ipfs://` URI to its public gateway URL. Other URIs pass
/// through unchanged.
pub fn rewrite_ipfs_uri(uri: &str) -> String {
    match uri.strip_prefix("ipfs://") {
        Some(path) => format!("{}{}", IPFS_GATEWAY, path),
        None => uri.to_string(),
    }
}

/// Classify a (rewritten) URL as IPFS-hosted.
///
/// Matches `ipfs.` or `ipfs:` at the start of the URL or right after a
/// `/`, which covers gateway paths like `/ipfs/`-style hosts such as
/// `ipfs.io` as well as raw `ipfs:` schemes.
pub fn is_ipfs_uri(uri: &str) -> bool {
    let bytes = uri.as_bytes();
    let mut start = 0;
    loop {
        let rest = &bytes[start..];
        if rest.len() >= 5 && &rest[..4] == b"ipfs" && (rest[4] == b'.' || rest[4] == b':') {
            return true;
        }
        match bytes[start..].iter().position(|&b| b == b'/') {
            Some(pos) => start += pos + 1,
            None => return false,
        }
    }
}

/// A fetched external metadata document.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedMetadata {
    pub metadata: JettonMetadata,
    /// Whether the resolved URL points at IPFS.
    pub is_ipfs: bool,
}

/// HTTP client for external metadata JSON documents.
#[derive(Debug, Clone)]
pub struct MetadataFetcher {
    client: reqwest::Client,
}

impl Default for MetadataFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl MetadataFetcher {
    /// Create a fetcher with the given request timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        MetadataFetcher { client }
    }

    /// Fetch and decode the JSON document behind a metadata URI.
    ///
    /// `ipfs://` URIs are resolved through the public gateway. The
    /// response must be a JSON object; its string, number, and boolean
    /// members become metadata fields.
    pub async fn fetch(&self, uri: &str) -> JettonResult<FetchedMetadata> {
        let url = rewrite_ipfs_uri(uri);
        let is_ipfs = is_ipfs_uri(&url);

        tracing::debug!(url = %url, is_ipfs, "fetching external metadata");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| JettonError::MetadataFetch(format!("request to {} failed: {}", url, e)))?
            .error_for_status()
            .map_err(|e| JettonError::MetadataFetch(format!("request to {} failed: {}", url, e)))?;

        let document: serde_json::Value = response
            .json()
            .await
            .map_err(|e| JettonError::MetadataFetch(format!("invalid json from {}: {}", url, e)))?;

        let object = document.as_object().ok_or_else(|| {
            JettonError::MetadataFetch(format!("document at {} is not a json object", url))
        })?;

        let mut metadata = JettonMetadata::new();
        for (key, value) in object {
            match value {
                serde_json::Value::String(s) => metadata.insert(key.clone(), s.clone()),
                serde_json::Value::Number(n) => metadata.insert(key.clone(), n.to_string()),
                serde_json::Value::Bool(b) => metadata.insert(key.clone(), b.to_string()),
                _ => {}
            }
        }

        Ok(FetchedMetadata { metadata, is_ipfs })
    }
}
