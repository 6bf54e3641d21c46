use quick_xml::events::Event;
use quick_xml::{DeError, Reader, Writer};
use serde::Deserialize;
use thiserror::Error;

/// The feed body could not be decoded as an RSS document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed feed document: {0}")]
    Malformed(#[from] DeError),
}

/// A decoded RSS document.
///
/// Lives only for the duration of one poll cycle; nothing here is persisted
/// as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SyndicationDocument {
    pub channel: Channel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "item", default)]
    pub items: Vec<SyndicationItem>,
}

/// One `<item>` of a channel. `link` is the natural dedup key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SyndicationItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
    /// Raw `pubDate` text, normalized later by [`super::normalize`]
    #[serde(rename = "pubDate", default)]
    pub pub_date: String,
}

/// Decodes raw bytes into a [`SyndicationDocument`].
///
/// The root element's name is not checked; its `<channel>` child is. After
/// decoding, channel and item titles and descriptions are HTML-unescaped,
/// since feeds conventionally escape markup a second time inside the XML.
/// Links and dates are left untouched.
///
/// Namespaced extension elements below the root (`<atom:link>`,
/// `<media:title>`, `<content:encoded>`, ...) are dropped before decoding,
/// so only the plain RSS elements fill the fields.
///
/// # Errors
///
/// [`ParseError::Malformed`] when the markup is not well-formed or does not
/// contain a channel. There is no partial recovery.
pub fn parse_document(bytes: &[u8]) -> Result<SyndicationDocument, ParseError> {
    // SEC-002: quick-xml 0.37 never expands <!ENTITY> declarations, so a
    // hostile feed cannot pull in external entities through the deserializer.
    let plain = strip_prefixed_elements(bytes)?;
    let mut document: SyndicationDocument = quick_xml::de::from_reader(plain.as_slice())?;

    let channel = &mut document.channel;
    unescape_in_place(&mut channel.title);
    unescape_in_place(&mut channel.description);
    for item in &mut channel.items {
        unescape_in_place(&mut item.title);
        unescape_in_place(&mut item.description);
    }

    Ok(document)
}

/// Re-emits `bytes` without any prefixed element (and its subtree) below
/// the root.
///
/// The deserializer matches elements by local name only, so `<atom:link>`
/// would land on the same field as `<link>` and fail as a duplicate.
fn strip_prefixed_elements(bytes: &[u8]) -> Result<Vec<u8>, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    let mut writer = Writer::new(Vec::with_capacity(bytes.len()));
    let mut buf = Vec::new();
    let mut skip_buf = Vec::new();
    let mut depth: usize = 0;

    loop {
        match reader.read_event_into(&mut buf).map_err(DeError::from)? {
            Event::Start(e) if depth > 0 && e.name().prefix().is_some() => {
                reader
                    .read_to_end_into(e.name(), &mut skip_buf)
                    .map_err(DeError::from)?;
                skip_buf.clear();
            }
            Event::Empty(e) if depth > 0 && e.name().prefix().is_some() => {}
            Event::Eof => break,
            event => {
                match &event {
                    Event::Start(_) => depth += 1,
                    Event::End(_) => depth = depth.saturating_sub(1),
                    _ => {}
                }
                writer
                    .write_event(event)
                    .map_err(|e| DeError::Custom(e.to_string()))?;
            }
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

fn unescape_in_place(text: &mut String) {
    if let std::borrow::Cow::Owned(decoded) = html_escape::decode_html_entities(text.as_str()) {
        *text = decoded;
    }
}
