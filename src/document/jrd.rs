//! JRD (RFC 7033 §4.4, `application/jrd+json`) decoding and encoding.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{parse_expires, Document, Link, Property};
use crate::error::DecodeError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct JrdDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    properties: Map<String, Value>,
    #[serde(default)]
    links: Vec<JrdLink>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct JrdLink {
    rel: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    template: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    titles: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    properties: Map<String, Value>,
}

/// Decode a JRD body.
///
/// # Errors
/// Returns `DecodeError` for malformed JSON, a non-object body, a link
/// without `rel`, or an unparseable `expires`.
pub fn decode(body: &[u8]) -> Result<Document, DecodeError> {
    let jrd: JrdDocument = serde_json::from_slice(body)?;

    let expires = jrd.expires.as_deref().map(parse_expires).transpose()?;

    Ok(Document {
        subject: jrd.subject,
        expires,
        aliases: jrd.aliases,
        properties: properties_from_json(jrd.properties),
        links: jrd.links.into_iter().map(link_from_json).collect(),
    })
}

/// Encode a document as a JRD JSON value.
pub fn encode(document: &Document) -> Value {
    let jrd = JrdDocument {
        subject: document.subject.clone(),
        expires: document.expires.map(|e| e.to_rfc3339()),
        aliases: document.aliases.clone(),
        properties: properties_to_json(&document.properties),
        links: document.links.iter().map(link_to_json).collect(),
    };
    // JrdDocument only holds strings, maps and arrays
    serde_json::to_value(jrd).unwrap_or(Value::Null)
}

fn link_from_json(link: JrdLink) -> Link {
    let titles = link
        .titles
        .into_iter()
        .filter_map(|(lang, title)| match title {
            Value::String(title) => Some((lang, title)),
            _ => None,
        })
        .collect();

    Link {
        rel: link.rel,
        media_type: link.media_type,
        href: link.href,
        template: link.template,
        titles,
        properties: properties_from_json(link.properties),
    }
}

fn link_to_json(link: &Link) -> JrdLink {
    JrdLink {
        rel: link.rel.clone(),
        media_type: link.media_type.clone(),
        href: link.href.clone(),
        template: link.template.clone(),
        titles: link
            .titles
            .iter()
            .map(|(lang, title)| (lang.clone(), Value::String(title.clone())))
            .collect(),
        properties: properties_to_json(&link.properties),
    }
}

// Non-string property values are kept in their JSON text form.
fn properties_from_json(properties: Map<String, Value>) -> Vec<Property> {
    properties
        .into_iter()
        .map(|(property_type, value)| Property {
            property_type,
            value: match value {
                Value::Null => None,
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            },
        })
        .collect()
}

fn properties_to_json(properties: &[Property]) -> Map<String, Value> {
    properties
        .iter()
        .map(|p| {
            let value = p.value.clone().map(Value::String).unwrap_or(Value::Null);
            (p.property_type.clone(), value)
        })
        .collect()
}
