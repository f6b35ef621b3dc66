//! The result of a `finger` call.

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::document::{jrd, Document, Link};
use crate::error::{ErrorKind, LoadError, WebFingerError};
use crate::{FALLBACK_RELS, REL_CONTACTS, REL_HCARD, REL_OPENID, REL_PROFILE, REL_XFN};

/// Short names for common link relations.
pub const SHORT_NAMES: &[(&str, &str)] = &[
    ("contacts", REL_CONTACTS),
    ("hcard", REL_HCARD),
    ("openid", REL_OPENID),
    ("profile", REL_PROFILE),
    ("xfn", REL_XFN),
];

/// Relation URI for a short name such as `openid`.
pub fn short_name_rel(name: &str) -> Option<&'static str> {
    SHORT_NAMES
        .iter()
        .find(|(short, _)| *short == name)
        .map(|(_, rel)| *rel)
}

// ============================================================================
// Probe — one request made during discovery
// ============================================================================

/// Discovery step a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Leg {
    #[serde(rename = "webfinger")]
    WebFinger,
    HostMeta,
    Lrdd,
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Leg::WebFinger => "webfinger",
            Leg::HostMeta => "host-meta",
            Leg::Lrdd => "lrdd",
        })
    }
}

/// A document request and its outcome, in the order they were made.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Probe {
    pub leg: Leg,
    pub url: String,
    /// `None` when the document was loaded.
    pub error: Option<LoadError>,
}

impl Probe {
    pub fn is_https(&self) -> bool {
        self.url.starts_with("https://")
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

// ============================================================================
// Reaction
// ============================================================================

/// Outcome of discovering one identifier.
///
/// Check [`Reaction::error`] before trusting the documents, and
/// [`Reaction::is_secure`] before relying on security-sensitive relations
/// such as the OpenID provider.
#[derive(Debug, Clone)]
pub struct Reaction {
    identifier: String,
    account: Option<String>,
    primary_document: Option<Document>,
    host_meta_document: Option<Document>,
    secure: bool,
    error: Option<WebFingerError>,
    probes: Vec<Probe>,
}

impl Reaction {
    pub(crate) fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            account: None,
            primary_document: None,
            host_meta_document: None,
            secure: true,
            error: None,
            probes: Vec::new(),
        }
    }

    // --- mutation during discovery ---

    pub(crate) fn set_account(&mut self, account: &str) {
        self.account = Some(account.to_string());
    }

    pub(crate) fn set_primary_document(&mut self, document: Document) {
        self.primary_document = Some(document);
    }

    pub(crate) fn set_host_meta_document(&mut self, document: Document) {
        self.host_meta_document = Some(document);
    }

    pub(crate) fn mark_insecure(&mut self) {
        self.secure = false;
    }

    pub(crate) fn set_error(&mut self, error: WebFingerError) {
        self.error = Some(error);
    }

    pub(crate) fn record_probe(&mut self, probe: Probe) {
        self.probes.push(probe);
    }

    // --- accessors ---

    /// The identifier as passed to `finger`.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Normalized account URI, absent when the identifier was invalid.
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// WebFinger or LRDD document describing the account.
    pub fn primary_document(&self) -> Option<&Document> {
        self.primary_document.as_ref()
    }

    /// host-meta document; absent when WebFinger answered directly.
    pub fn host_meta_document(&self) -> Option<&Document> {
        self.host_meta_document.as_ref()
    }

    /// True only if every contributing document came over HTTPS and the
    /// primary document describes the account.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn error(&self) -> Option<&WebFingerError> {
        self.error.as_ref()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(WebFingerError::kind)
    }

    /// Requests made for this reaction, in order.
    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    pub fn subject(&self) -> Option<&str> {
        self.primary_document.as_ref()?.subject.as_deref()
    }

    /// True if the primary document's subject or aliases contain `uri`.
    pub fn describes(&self, uri: &str) -> bool {
        self.primary_document
            .as_ref()
            .is_some_and(|doc| doc.describes(uri))
    }

    /// Link for `rel` from the primary document; for allow-listed relations
    /// the host-meta document is consulted when the primary has none.
    pub fn get_link(&self, rel: &str, media_type: Option<&str>, type_fallback: bool) -> Option<&Link> {
        if let Some(link) = self
            .primary_document
            .as_ref()
            .and_then(|doc| doc.get(rel, media_type, type_fallback))
        {
            return Some(link);
        }

        if !FALLBACK_RELS.contains(&rel) {
            return None;
        }
        self.host_meta_document
            .as_ref()
            .and_then(|doc| doc.get(rel, media_type, type_fallback))
    }

    /// `href` of the link selected by [`Reaction::get_link`].
    pub fn get(&self, rel: &str, media_type: Option<&str>, type_fallback: bool) -> Option<&str> {
        self.get_link(rel, media_type, type_fallback)?
            .href
            .as_deref()
            .filter(|href| !href.is_empty())
    }

    /// `href` for a short relation name (`openid`, `hcard`, ...).
    pub fn get_short(&self, name: &str) -> Option<&str> {
        self.get(short_name_rel(name)?, None, true)
    }

    pub fn openid(&self) -> Option<&str> {
        self.get(REL_OPENID, None, true)
    }

    pub fn hcard(&self) -> Option<&str> {
        self.get(REL_HCARD, None, true)
    }

    pub fn profile(&self) -> Option<&str> {
        self.get(REL_PROFILE, None, true)
    }

    pub fn xfn(&self) -> Option<&str> {
        self.get(REL_XFN, None, true)
    }

    pub fn contacts(&self) -> Option<&str> {
        self.get(REL_CONTACTS, None, true)
    }

    /// All links of the primary document, followed by allow-listed
    /// host-meta links whose relation the primary document lacks.
    ///
    /// Each call starts a fresh iteration.
    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        let primary = self.primary_document.iter().flat_map(|doc| doc.links.iter());
        let inherited = self
            .host_meta_document
            .iter()
            .flat_map(|doc| doc.links.iter())
            .filter(move |link| {
                FALLBACK_RELS.contains(&link.rel.as_str())
                    && !self
                        .primary_document
                        .as_ref()
                        .is_some_and(|doc| doc.has_rel(&link.rel))
            });
        primary.chain(inherited)
    }
}

impl<'a> IntoIterator for &'a Reaction {
    type Item = &'a Link;
    type IntoIter = Box<dyn Iterator<Item = &'a Link> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.links())
    }
}

impl Serialize for Reaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(serde::Serialize)]
        struct ErrorView {
            kind: ErrorKind,
            messages: Vec<String>,
        }

        let error = self.error.as_ref().map(|err| ErrorView {
            kind: err.kind(),
            messages: err.chain().map(|e| e.to_string()).collect(),
        });
        let links: Vec<&Link> = self.links().collect();

        let mut state = serializer.serialize_struct("Reaction", 8)?;
        state.serialize_field("identifier", &self.identifier)?;
        state.serialize_field("account", &self.account)?;
        state.serialize_field("secure", &self.secure)?;
        state.serialize_field("error", &error)?;
        state.serialize_field("subject", &self.subject())?;
        state.serialize_field("links", &links)?;
        state.serialize_field(
            "document",
            &self.primary_document.as_ref().map(jrd::encode),
        )?;
        state.serialize_field("probes", &self.probes)?;
        state.end()
    }
}
