//! Resource descriptor documents (XRD/JRD): subject, aliases, properties,
//! expiry and an ordered list of links.

pub mod jrd;
pub mod xrd;

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Language tag used for titles without an explicit language.
pub const UNDEFINED_LANGUAGE: &str = "und";

// ============================================================================
// Document
// ============================================================================

/// A decoded XRD or JRD document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Document {
    /// Decode a body, picking JRD or XRD from the content type, or from the
    /// body itself when the content type is missing or unhelpful.
    pub fn decode(body: &[u8], content_type: Option<&str>) -> Result<Self, DecodeError> {
        let format = content_type
            .and_then(DocumentFormat::from_content_type)
            .map(Ok)
            .unwrap_or_else(|| DocumentFormat::sniff(body))?;

        match format {
            DocumentFormat::Jrd => jrd::decode(body),
            DocumentFormat::Xrd => {
                let text = std::str::from_utf8(body).map_err(|_| DecodeError::NotUtf8)?;
                xrd::decode(text)
            }
        }
    }

    /// True if `uri` is the subject or one of the aliases.
    pub fn describes(&self, uri: &str) -> bool {
        self.subject.as_deref() == Some(uri) || self.aliases.iter().any(|alias| alias == uri)
    }

    /// Select the link for `rel`.
    ///
    /// With a `media_type`, the first link of that exact type wins; if there
    /// is none and `type_fallback` is set, the first link without any type is
    /// returned. Without a `media_type`, the first link with `rel` wins.
    pub fn get(&self, rel: &str, media_type: Option<&str>, type_fallback: bool) -> Option<&Link> {
        let mut untyped = None;
        for link in self.links_with_rel(rel) {
            let Some(wanted) = media_type else {
                return Some(link);
            };
            match link.media_type.as_deref() {
                Some(actual) if actual == wanted => return Some(link),
                None if type_fallback && untyped.is_none() => untyped = Some(link),
                _ => {}
            }
        }
        untyped
    }

    /// All links with the given relation, in document order.
    pub fn links_with_rel<'a, 'r>(&'a self, rel: &'r str) -> impl Iterator<Item = &'a Link> + 'r
    where
        'a: 'r,
    {
        self.links.iter().filter(move |link| link.rel == rel)
    }

    pub fn has_rel(&self, rel: &str) -> bool {
        self.links_with_rel(rel).next().is_some()
    }

    /// First value of the property with the given type.
    pub fn property(&self, property_type: &str) -> Option<&str> {
        find_property(&self.properties, property_type)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }
}

// ============================================================================
// Link / Property
// ============================================================================

/// A typed link of a resource descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Language tag → title.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub titles: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
}

impl Link {
    pub fn new(rel: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            ..Default::default()
        }
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn with_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Title in the given language, falling back to the untagged title.
    pub fn title(&self, lang: &str) -> Option<&str> {
        self.titles
            .get(lang)
            .or_else(|| self.titles.get(UNDEFINED_LANGUAGE))
            .map(String::as_str)
    }

    /// Replace every `{uri}` token of the template with an already
    /// percent-encoded URI. `None` when the link has no template.
    pub fn expand_template(&self, encoded_uri: &str) -> Option<String> {
        self.template
            .as_deref()
            .filter(|template| !template.is_empty())
            .map(|template| template.replace("{uri}", encoded_uri))
    }

    /// The dereferenceable target: `href`, else the raw template.
    pub fn target(&self) -> Option<&str> {
        self.href.as_deref().or(self.template.as_deref())
    }

    pub fn property(&self, property_type: &str) -> Option<&str> {
        find_property(&self.properties, property_type)
    }
}

/// A `type` → value property. `value` is `None` for nil properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default)]
    pub value: Option<String>,
}

fn find_property<'a>(properties: &'a [Property], property_type: &str) -> Option<&'a str> {
    properties
        .iter()
        .find(|p| p.property_type == property_type)
        .and_then(|p| p.value.as_deref())
}

// ============================================================================
// Format detection
// ============================================================================

/// Serialization of a resource descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Jrd,
    Xrd,
}

impl DocumentFormat {
    /// Map a `Content-Type` header value to a format, ignoring parameters.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "application/jrd+json" | "application/json" => Some(DocumentFormat::Jrd),
            "application/xrd+xml" | "application/xml" | "text/xml" => Some(DocumentFormat::Xrd),
            m if m.ends_with("+json") => Some(DocumentFormat::Jrd),
            m if m.ends_with("+xml") => Some(DocumentFormat::Xrd),
            _ => None,
        }
    }

    /// Guess the format from the first significant byte of the body.
    pub fn sniff(body: &[u8]) -> Result<Self, DecodeError> {
        let body = body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body);
        match body.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Ok(DocumentFormat::Jrd),
            Some(b'<') => Ok(DocumentFormat::Xrd),
            _ => Err(DecodeError::UnknownFormat),
        }
    }
}

/// Parse an `xs:dateTime` / RFC 3339 timestamp. Timestamps without an
/// offset are taken as UTC.
pub(crate) fn parse_expires(value: &str) -> Result<DateTime<Utc>, DecodeError> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| DecodeError::InvalidExpires(value.to_string()))
}
