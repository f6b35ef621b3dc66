//! Document loader: one GET through the transport, status check, decode.
//! Retry and fallback policy lives in the orchestrator, not here.

use std::sync::Arc;
use std::time::Duration;

use crate::document::Document;
use crate::error::LoadError;
use crate::transport::HttpTransport;

/// `Accept` header sent for every discovery request.
pub const ACCEPT_DOCUMENT: &str = "application/jrd+json, application/xrd+xml;q=0.9";

/// Fetches and decodes XRD/JRD documents.
#[derive(Clone)]
pub struct DocumentLoader {
    transport: Arc<dyn HttpTransport>,
    /// Upper bound on a single request, independent of the transport's own timeout.
    timeout: Option<Duration>,
}

impl DocumentLoader {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Load the document at `url`.
    ///
    /// # Errors
    /// - `LoadError::Fetch` when the transport fails or the timeout elapses
    /// - `LoadError::Status` for any non-2xx response
    /// - `LoadError::Decode` when the body is neither valid JRD nor XRD
    pub async fn load(&self, url: &str, accept: &str) -> Result<Document, LoadError> {
        tracing::debug!(url, "loading document");

        let request = self.transport.get(url, accept);
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, request).await.map_err(|_| {
                LoadError::Fetch {
                    url: url.to_string(),
                    message: format!("timed out after {}ms", limit.as_millis()),
                }
            })?,
            None => request.await,
        }
        .map_err(|e| LoadError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if !response.is_success() {
            return Err(LoadError::Status {
                url: url.to_string(),
                status: response.status,
                reason: response.reason,
            });
        }

        Document::decode(&response.body, response.content_type.as_deref()).map_err(|e| {
            LoadError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            }
        })
    }
}

impl std::fmt::Debug for DocumentLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentLoader")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
