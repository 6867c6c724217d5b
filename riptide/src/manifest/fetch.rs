//! Fetching the resource index over HTTP.

use std::io::Read;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error};

use crate::http::{HttpClient, HttpError};

use super::{decode_index, ResourceIndex};

/// Errors from fetching or decoding a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// HTTP failure (non-success status or transport error).
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Malformed JSON at the top level.
    #[error("malformed manifest JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document has no `resource` array.
    #[error("manifest contains no 'resource' array")]
    MissingResource,

    /// Reading the response body failed mid-stream.
    #[error("failed to read manifest body: {0}")]
    Body(#[from] std::io::Error),
}

/// Fetches and decodes the remote resource index.
pub struct IndexFetcher {
    http: Arc<dyn HttpClient>,
}

impl IndexFetcher {
    /// Create a fetcher over the given HTTP client.
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Fetch and decode the manifest at `url`.
    pub fn fetch(&self, url: &str) -> Result<ResourceIndex, ManifestError> {
        debug!(url, "requesting resource index");

        let mut body = self.http.get(url).inspect_err(|e| {
            error!(url, err = %e, "resource index request failed");
        })?;

        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes)?;

        let index = decode_index(&bytes)?;
        debug!(url, entries = index.len(), "resource index fetched");
        Ok(index)
    }
}
