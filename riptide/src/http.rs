//! HTTP client abstraction for testability.
//!
//! The installer only needs two operations from HTTP: a streamed GET and a
//! streamed byte-range GET. Putting them behind a trait allows dependency
//! injection and network-free tests with a mock client.
//!
//! TLS policy, redirects, cookies and compression are configured once when
//! the real client is built; callers never see those concerns.

use std::io::Read;
use std::time::Duration;

use thiserror::Error;

/// Maximum number of characters of a failed response body kept for
/// diagnostics.
const BODY_PREVIEW_LIMIT: usize = 400;

/// Errors produced by HTTP operations.
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    /// The server answered with a non-success status.
    #[error("GET {url} returned {status}: {preview}")]
    Status {
        url: String,
        status: u16,
        preview: String,
    },

    /// Connection, timeout or protocol failure before a status was read.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
}

/// Streamed response body.
pub type Body = Box<dyn Read + Send>;

/// Trait for the HTTP operations the installer performs.
pub trait HttpClient: Send + Sync {
    /// Perform a GET request, returning the streamed response body.
    fn get(&self, url: &str) -> Result<Body, HttpError>;

    /// Perform a GET request with a `Range: bytes=start-end` header
    /// (`end` inclusive), returning the streamed response body.
    fn get_range(&self, url: &str, start: u64, end: u64) -> Result<Body, HttpError>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Create a client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| HttpError::Transport {
                url: String::new(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder, url: &str) -> Result<Body, HttpError> {
        let response = request.send().map_err(|e| HttpError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            // Keep a short body preview for diagnostics; servers often put
            // the interesting error detail in the body.
            let preview = response
                .text()
                .map(|t| truncate_preview(t.trim()))
                .unwrap_or_default();
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                preview,
            });
        }

        Ok(Box::new(response))
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Body, HttpError> {
        self.send(self.client.get(url), url)
    }

    fn get_range(&self, url: &str, start: u64, end: u64) -> Result<Body, HttpError> {
        let request = self
            .client
            .get(url)
            .header("Range", format!("bytes={}-{}", start, end));
        self.send(request, url)
    }
}

fn truncate_preview(body: &str) -> String {
    if body.len() > BODY_PREVIEW_LIMIT {
        let mut cut = BODY_PREVIEW_LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
