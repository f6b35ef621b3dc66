use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ErrorKind
// ============================================================================

/// Category of a discovery failure reported on a `Reaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// host-meta unreachable over HTTPS and HTTP.
    #[serde(rename = "NO_HOSTMETA")]
    NoHostMeta,
    /// host-meta has no usable `lrdd` link.
    NoLrddLink,
    /// LRDD document unreachable over HTTPS and HTTP.
    NoLrdd,
    /// Fetched document does not describe the requested account.
    Describe,
    /// A single document could not be obtained (transport, status or decode failure).
    NotFound,
    /// WebFinger and the host-meta/LRDD chain both failed.
    Nothing,
    /// The identifier has no usable host.
    InvalidIdentifier,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoHostMeta => "NO_HOSTMETA",
            ErrorKind::NoLrddLink => "NO_LRDD_LINK",
            ErrorKind::NoLrdd => "NO_LRDD",
            ErrorKind::Describe => "DESCRIBE",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Nothing => "NOTHING",
            ErrorKind::InvalidIdentifier => "INVALID_IDENTIFIER",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// WebFingerError — structured, chained discovery error
// ============================================================================

/// Discovery error carried by a `Reaction`.
///
/// Each error may wrap the error that triggered it, so the whole diagnostic
/// path is available through [`WebFingerError::chain`] or
/// `std::error::Error::source`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct WebFingerError {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: Option<Box<ErrorCause>>,
}

impl WebFingerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the error that led to this one.
    pub fn caused_by(mut self, cause: impl Into<ErrorCause>) -> Self {
        self.cause = Some(Box::new(cause.into()));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The directly wrapped error, if any.
    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_deref()
    }

    /// This error followed by every error in its cause chain.
    pub fn chain(&self) -> impl Iterator<Item = &(dyn std::error::Error + 'static)> {
        std::iter::successors(
            Some(self as &(dyn std::error::Error + 'static)),
            |err| err.source(),
        )
    }

    /// The innermost error of the chain.
    pub fn root_cause(&self) -> &(dyn std::error::Error + 'static) {
        // chain() always yields at least `self`
        self.chain().last().unwrap_or(self)
    }
}

/// Something a `WebFingerError` can be caused by.
#[derive(Debug, Clone, Error)]
pub enum ErrorCause {
    #[error(transparent)]
    Discovery(WebFingerError),

    #[error(transparent)]
    Load(LoadError),
}

impl ErrorCause {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCause::Discovery(err) => err.kind(),
            ErrorCause::Load(err) => err.kind(),
        }
    }

    pub fn as_discovery(&self) -> Option<&WebFingerError> {
        match self {
            ErrorCause::Discovery(err) => Some(err),
            ErrorCause::Load(_) => None,
        }
    }

    pub fn as_load(&self) -> Option<&LoadError> {
        match self {
            ErrorCause::Load(err) => Some(err),
            ErrorCause::Discovery(_) => None,
        }
    }
}

impl From<WebFingerError> for ErrorCause {
    fn from(err: WebFingerError) -> Self {
        ErrorCause::Discovery(err)
    }
}

impl From<LoadError> for ErrorCause {
    fn from(err: LoadError) -> Self {
        ErrorCause::Load(err)
    }
}

// ============================================================================
// LoadError — a single document fetch failed
// ============================================================================

/// Failure to load one document. Serializable so that failed loads can be
/// memoized by persistent cache stores.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoadError {
    #[error("Error loading {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Error loading {url}: {status} {reason}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("Error decoding {url}: {message}")]
    Decode { url: String, message: String },
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::NotFound
    }

    pub fn url(&self) -> &str {
        match self {
            LoadError::Fetch { url, .. }
            | LoadError::Status { url, .. }
            | LoadError::Decode { url, .. } => url,
        }
    }

    /// HTTP status code for non-2xx responses.
    pub fn status(&self) -> Option<u16> {
        match self {
            LoadError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ============================================================================
// TransportError / DecodeError
// ============================================================================

/// Error reported by an `HttpTransport` implementation (connect, TLS,
/// timeout, redirect limit, body read).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error decoding a JRD or XRD body.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid JRD: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid XRD: {0}")]
    Xml(String),

    #[error("Invalid XRD: root element is <{0}>, expected <XRD>")]
    NotXrd(String),

    #[error("Invalid expires timestamp: {0}")]
    InvalidExpires(String),

    #[error("Document body is not valid UTF-8")]
    NotUtf8,

    #[error("Unrecognized document format")]
    UnknownFormat,
}

impl From<quick_xml::Error> for DecodeError {
    fn from(err: quick_xml::Error) -> Self {
        DecodeError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for DecodeError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        DecodeError::Xml(err.to_string())
    }
}
