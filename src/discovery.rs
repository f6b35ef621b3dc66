//! Discovery orchestrator: WebFinger first, then host-meta and LRDD.

use std::sync::Arc;

use crate::cache::{CacheStore, DocumentCache};
use crate::config::WebFingerConfig;
use crate::document::{Document, Link};
use crate::error::{ErrorKind, LoadError, TransportError, WebFingerError};
use crate::identifier::Identifier;
use crate::loader::{DocumentLoader, ACCEPT_DOCUMENT};
use crate::reaction::{Leg, Probe, Reaction};
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::REL_LRDD;

const LRDD_MEDIA_TYPE: &str = "application/xrd+xml";

/// WebFinger client.
///
/// Cheap to share behind an `Arc`; each [`WebFinger::finger`] call runs its
/// requests sequentially on the calling task.
pub struct WebFinger {
    loader: DocumentLoader,
    cache: Option<DocumentCache>,
    config: WebFingerConfig,
}

impl WebFinger {
    /// Client using the default `reqwest` transport.
    ///
    /// # Errors
    /// Returns `TransportError` if the HTTP client cannot be built.
    pub fn new(config: WebFingerConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>, config: WebFingerConfig) -> Self {
        Self {
            loader: DocumentLoader::new(transport).with_timeout(config.timeout),
            cache: None,
            config,
        }
    }

    /// Memoize every document load in `store`.
    pub fn with_cache(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(DocumentCache::new(store, self.config.cache_ttl));
        self
    }

    pub fn config(&self) -> &WebFingerConfig {
        &self.config
    }

    /// Discover information about `identifier` (`user@host`, `acct:`,
    /// `xmpp:`, `mailto:` or an `http(s)` URL).
    ///
    /// Never fails: problems are reported through [`Reaction::error`].
    pub async fn finger(&self, identifier: &str) -> Reaction {
        let mut reaction = Reaction::new(identifier);

        let id = match Identifier::parse(identifier) {
            Ok(id) => id,
            Err(err) => {
                tracing::debug!(identifier, error = %err, "rejected identifier");
                reaction.mark_insecure();
                reaction.set_error(err);
                return reaction;
            }
        };
        reaction.set_account(id.account());

        let webfinger_err = match self.load_webfinger(&id, &mut reaction).await {
            Ok(document) => {
                accept_primary(&mut reaction, id.account(), document);
                return reaction;
            }
            Err(err) => err,
        };

        if let Err(err) = self
            .discover_via_host_meta(&id, webfinger_err, &mut reaction)
            .await
        {
            tracing::debug!(account = id.account(), error = %err, "discovery failed");
            reaction.set_error(err);
        }
        if reaction.primary_document().is_none() {
            reaction.mark_insecure();
        }
        reaction
    }

    // ========================================================================
    // Legs
    // ========================================================================

    /// The WebFinger document, or the last load error of this leg.
    async fn load_webfinger(
        &self,
        id: &Identifier,
        reaction: &mut Reaction,
    ) -> Result<Document, LoadError> {
        let url = format!(
            "https://{}/.well-known/webfinger?resource={}",
            id.host(),
            id.encoded_account()
        );
        let err = match self.fetch(Leg::WebFinger, &url, reaction).await {
            Ok(document) => return Ok(document),
            Err(err) => err,
        };
        let Some(http_url) = https_to_http(&url).filter(|_| self.config.fallback_to_http) else {
            return Err(err);
        };

        tracing::warn!(url = %http_url, "falling back to plain HTTP for WebFinger");
        let document = self.fetch(Leg::WebFinger, &http_url, reaction).await?;
        reaction.mark_insecure();
        Ok(document)
    }

    /// host-meta and LRDD, after `webfinger_err` ended the WebFinger leg.
    /// That failure becomes the cause of `NO_LRDD_LINK`, the one error of
    /// this path that has no load error of its own.
    async fn discover_via_host_meta(
        &self,
        id: &Identifier,
        webfinger_err: LoadError,
        reaction: &mut Reaction,
    ) -> Result<(), WebFingerError> {
        let host_meta = self.load_host_meta(id.host(), reaction).await?;

        let lrdd_url = lrdd_link(&host_meta)
            .and_then(|link| link.expand_template(&id.encoded_account()));
        reaction.set_host_meta_document(host_meta);

        let Some(lrdd_url) = lrdd_url else {
            return Err(WebFingerError::new(
                ErrorKind::NoLrddLink,
                format!("No lrdd link in host-meta for {}", id.host()),
            )
            .caused_by(webfinger_err));
        };

        let document = self.load_lrdd(&lrdd_url, reaction).await.map_err(|err| {
            let no_lrdd = WebFingerError::new(ErrorKind::NoLrdd, "LRDD file not found").caused_by(err);
            WebFingerError::new(ErrorKind::Nothing, "No webfinger data found").caused_by(no_lrdd)
        })?;
        accept_primary(reaction, id.account(), document);
        Ok(())
    }

    async fn load_host_meta(
        &self,
        host: &str,
        reaction: &mut Reaction,
    ) -> Result<Document, WebFingerError> {
        let url = format!("https://{host}/.well-known/host-meta");
        if let Ok(document) = self.fetch(Leg::HostMeta, &url, reaction).await {
            return Ok(document);
        }

        let http_url = format!("http://{host}/.well-known/host-meta");
        tracing::warn!(url = %http_url, "falling back to plain HTTP for host-meta");
        match self.fetch(Leg::HostMeta, &http_url, reaction).await {
            Ok(document) => {
                reaction.mark_insecure();
                Ok(document)
            }
            Err(err) => Err(WebFingerError::new(
                ErrorKind::NoHostMeta,
                format!("No .well-known/host-meta file found on {host}"),
            )
            .caused_by(err)),
        }
    }

    async fn load_lrdd(&self, url: &str, reaction: &mut Reaction) -> Result<Document, LoadError> {
        let err = match self.fetch(Leg::Lrdd, url, reaction).await {
            Ok(document) => {
                if !url.starts_with("https://") {
                    reaction.mark_insecure();
                }
                return Ok(document);
            }
            Err(err) => err,
        };

        let Some(http_url) = https_to_http(url) else {
            return Err(err);
        };
        tracing::warn!(url = %http_url, "falling back to plain HTTP for LRDD");
        let document = self.fetch(Leg::Lrdd, &http_url, reaction).await?;
        reaction.mark_insecure();
        Ok(document)
    }

    /// Load one document, through the cache when configured, and record the
    /// attempt on the reaction.
    async fn fetch(&self, leg: Leg, url: &str, reaction: &mut Reaction) -> Result<Document, LoadError> {
        tracing::debug!(%leg, url, "requesting");

        let result = match &self.cache {
            Some(cache) => {
                cache
                    .get_or_load(url, || self.loader.load(url, ACCEPT_DOCUMENT))
                    .await
            }
            None => self.loader.load(url, ACCEPT_DOCUMENT).await,
        };

        if let Err(err) = &result {
            tracing::debug!(%leg, url, error = %err, "request failed");
        }
        reaction.record_probe(Probe {
            leg,
            url: url.to_string(),
            error: result.as_ref().err().cloned(),
        });
        result
    }
}

impl std::fmt::Debug for WebFinger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebFinger")
            .field("config", &self.config)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Store the primary document, flagging it when it is about someone else.
fn accept_primary(reaction: &mut Reaction, account: &str, document: Document) {
    if !document.describes(account) {
        let subject = document.subject.as_deref().unwrap_or_default();
        reaction.mark_insecure();
        reaction.set_error(WebFingerError::new(
            ErrorKind::Describe,
            format!("Webfinger file is not about \"{account}\" but \"{subject}\""),
        ));
    }
    reaction.set_primary_document(document);
}

/// The `lrdd` link to follow: the XRD-typed one if it has a template,
/// else the first one with a non-empty template.
fn lrdd_link(host_meta: &Document) -> Option<&Link> {
    let has_template = |link: &&Link| link.template.as_deref().is_some_and(|t| !t.is_empty());

    host_meta
        .get(REL_LRDD, Some(LRDD_MEDIA_TYPE), true)
        .filter(has_template)
        .or_else(|| host_meta.links_with_rel(REL_LRDD).find(has_template))
}

fn https_to_http(url: &str) -> Option<String> {
    url.strip_prefix("https://").map(|rest| format!("http://{rest}"))
}
