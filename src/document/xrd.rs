//! XRD 1.0 (`application/xrd+xml`) decoding.
//!
//! Only the elements WebFinger uses are read: `Subject`, `Expires`, `Alias`,
//! `Property` and `Link` (with its `Title` and `Property` children).
//! Anything else, including `ds:Signature`, is skipped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{parse_expires, Document, Link, Property, UNDEFINED_LANGUAGE};
use crate::error::DecodeError;

/// Decode an XRD document.
///
/// # Errors
/// Returns `DecodeError` for malformed XML, a root element other than
/// `<XRD>`, or an unparseable `<Expires>`.
pub fn decode(body: &str) -> Result<Document, DecodeError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut builder = XrdBuilder::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => builder.start(&e)?,
            Event::Empty(e) => {
                builder.start(&e)?;
                builder.end()?;
            }
            Event::End(_) => builder.end()?,
            Event::Text(t) => builder.text(&t.unescape()?),
            Event::CData(c) => builder.text(&String::from_utf8_lossy(&c)),
            Event::Eof => break,
            _ => {}
        }
    }
    builder.finish()
}

// ============================================================================
// Builder
// ============================================================================

enum TextField {
    Subject,
    Expires,
    Alias,
    Property { property_type: String, nil: bool },
    Title { lang: String },
    LinkProperty { property_type: String, nil: bool },
}

#[derive(Default)]
struct XrdBuilder {
    document: Document,
    root_seen: bool,
    depth: usize,
    link: Option<Link>,
    /// Field being collected and the depth of its element.
    field: Option<(TextField, usize)>,
    text: String,
}

impl XrdBuilder {
    fn start(&mut self, e: &BytesStart<'_>) -> Result<(), DecodeError> {
        self.depth += 1;
        if self.field.is_some() {
            return Ok(());
        }

        let name = e.local_name();
        let field = match (self.depth, name.as_ref()) {
            (1, b"XRD") if !self.root_seen => {
                self.root_seen = true;
                None
            }
            (1, other) => {
                return Err(DecodeError::NotXrd(String::from_utf8_lossy(other).into_owned()));
            }
            (2, b"Subject") => Some(TextField::Subject),
            (2, b"Expires") => Some(TextField::Expires),
            (2, b"Alias") => Some(TextField::Alias),
            (2, b"Property") => {
                let (property_type, nil) = property_attributes(e)?;
                Some(TextField::Property { property_type, nil })
            }
            (2, b"Link") => {
                self.link = Some(link_from_attributes(e)?);
                None
            }
            (3, b"Title") if self.link.is_some() => {
                let lang = attribute(e, b"lang")?.unwrap_or_else(|| UNDEFINED_LANGUAGE.to_string());
                Some(TextField::Title { lang })
            }
            (3, b"Property") if self.link.is_some() => {
                let (property_type, nil) = property_attributes(e)?;
                Some(TextField::LinkProperty { property_type, nil })
            }
            _ => None,
        };

        if let Some(field) = field {
            self.text.clear();
            self.field = Some((field, self.depth));
        }
        Ok(())
    }

    fn end(&mut self) -> Result<(), DecodeError> {
        let depth = self.depth;
        self.depth = self.depth.saturating_sub(1);

        if matches!(self.field, Some((_, field_depth)) if field_depth == depth) {
            if let Some((field, _)) = self.field.take() {
                let text = std::mem::take(&mut self.text);
                self.finish_field(field, text)?;
            }
            return Ok(());
        }

        if depth == 2 {
            if let Some(link) = self.link.take() {
                self.document.links.push(link);
            }
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if self.field.is_some() {
            self.text.push_str(text);
        }
    }

    fn finish_field(&mut self, field: TextField, text: String) -> Result<(), DecodeError> {
        match field {
            TextField::Subject => self.document.subject = Some(text),
            TextField::Expires => self.document.expires = Some(parse_expires(&text)?),
            TextField::Alias => self.document.aliases.push(text),
            TextField::Property { property_type, nil } => {
                self.document.properties.push(property(property_type, nil, text));
            }
            TextField::Title { lang } => {
                if let Some(link) = self.link.as_mut() {
                    link.titles.entry(lang).or_insert(text);
                }
            }
            TextField::LinkProperty { property_type, nil } => {
                if let Some(link) = self.link.as_mut() {
                    link.properties.push(property(property_type, nil, text));
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Document, DecodeError> {
        if !self.root_seen {
            return Err(DecodeError::Xml("missing <XRD> root element".to_string()));
        }
        if self.depth != 0 {
            return Err(DecodeError::Xml("unexpected end of document".to_string()));
        }
        Ok(self.document)
    }
}

// ============================================================================
// Attribute helpers
// ============================================================================

fn property(property_type: String, nil: bool, text: String) -> Property {
    Property {
        property_type,
        value: if nil { None } else { Some(text) },
    }
}

fn link_from_attributes(e: &BytesStart<'_>) -> Result<Link, DecodeError> {
    let mut link = Link::default();
    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?.into_owned();
        match attr.key.local_name().as_ref() {
            b"rel" => link.rel = value,
            b"type" => link.media_type = Some(value),
            b"href" => link.href = Some(value),
            b"template" => link.template = Some(value),
            _ => {}
        }
    }
    Ok(link)
}

fn property_attributes(e: &BytesStart<'_>) -> Result<(String, bool), DecodeError> {
    let property_type = attribute(e, b"type")?.unwrap_or_default();
    let nil = attribute(e, b"nil")?.is_some_and(|v| v == "true" || v == "1");
    Ok((property_type, nil))
}

/// Value of the attribute with the given local name (namespace prefix ignored).
fn attribute(e: &BytesStart<'_>, local_name: &[u8]) -> Result<Option<String>, DecodeError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == local_name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
