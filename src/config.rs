use std::time::Duration;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum number of redirects followed per request.
pub const DEFAULT_MAX_REDIRECTS: usize = 20;

/// Cache lifetime for documents without their own expiry, and for failures.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Options controlling discovery and the default HTTP transport.
#[derive(Debug, Clone)]
pub struct WebFingerConfig {
    /// Retry the WebFinger request over plain HTTP when HTTPS fails.
    /// RFC 7033 forbids this, so it is off by default. host-meta and LRDD
    /// always fall back to HTTP regardless.
    pub fallback_to_http: bool,
    /// Validate HTTPS certificates (default: true).
    pub verify_ssl_cert: bool,
    /// Per-request timeout (default: 10s)
    pub timeout: Duration,
    /// Redirect limit (default: 20)
    pub max_redirects: usize,
    pub user_agent: String,
    /// Default cache TTL (default: 1h)
    pub cache_ttl: Duration,
}

impl Default for WebFingerConfig {
    fn default() -> Self {
        Self {
            fallback_to_http: false,
            verify_ssl_cert: true,
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: concat!("webfinger/", env!("CARGO_PKG_VERSION")).to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}
