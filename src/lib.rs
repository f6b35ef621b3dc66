//! WebFinger (RFC 7033) client with host-meta/LRDD (RFC 6415) fallback.
//!
//! [`WebFinger::finger`] resolves an identifier such as `user@example.org`
//! to its resource descriptor. It tries the `.well-known/webfinger` endpoint
//! first and falls back to `.well-known/host-meta` plus the LRDD template.
//! The result is a [`Reaction`]: the documents found, an optional chained
//! error, and whether everything was obtained over HTTPS with a matching
//! subject.
//!
//! HTTP and caching are pluggable through [`HttpTransport`] and
//! [`CacheStore`].

pub mod cache;
mod config;
mod discovery;
pub mod document;
mod error;
mod identifier;
mod loader;
mod reaction;
pub mod transport;

pub use cache::{CacheStore, CachedLoad, DocumentCache, MemoryCacheStore};
#[cfg(feature = "sqlite")]
pub use cache::SqliteCacheStore;
pub use config::{WebFingerConfig, DEFAULT_CACHE_TTL, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT};
pub use discovery::WebFinger;
pub use document::{Document, DocumentFormat, Link, Property};
pub use error::{DecodeError, ErrorCause, ErrorKind, LoadError, TransportError, WebFingerError};
pub use identifier::Identifier;
pub use loader::{DocumentLoader, ACCEPT_DOCUMENT};
pub use reaction::{short_name_rel, Leg, Probe, Reaction, SHORT_NAMES};
pub use transport::{HttpTransport, ReqwestTransport, TransportResponse};

/// OpenID 2.0 provider.
pub const REL_OPENID: &str = "http://specs.openid.net/auth/2.0/provider";

pub const REL_HCARD: &str = "http://microformats.org/profile/hcard";

pub const REL_PROFILE: &str = "http://webfinger.net/rel/profile-page";

/// XHTML Friends Network.
pub const REL_XFN: &str = "http://gmpg.org/xfn/11";

/// Portable Contacts endpoint.
pub const REL_CONTACTS: &str = "http://portablecontacts.net/spec/1.0";

/// Link-based Resource Descriptor Discovery template in host-meta.
pub const REL_LRDD: &str = "lrdd";

/// Relations that may be taken from host-meta when the account's own
/// document lacks them.
pub const FALLBACK_RELS: &[&str] = &[REL_OPENID];
