//! HTTP transport port: the only place discovery touches the network.

pub mod http;

use async_trait::async_trait;

use crate::error::TransportError;

pub use http::ReqwestTransport;

// ============================================================================
// HttpTransport — pluggable network layer
// ============================================================================

/// Issues a GET for a URL with an `Accept` header.
///
/// Implementations are responsible for timeouts, redirect limits and TLS
/// certificate validation. Any response, including non-2xx, is returned as
/// `Ok`; `Err` is reserved for requests that produced no response at all.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, accept: &str) -> Result<TransportResponse, TransportError>;
}

/// A response as seen by the document loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Reason phrase, e.g. `Not Found`.
    pub reason: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason: canonical_reason(status).to_string(),
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn canonical_reason(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("")
}
