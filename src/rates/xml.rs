//! Decoding of the XML documents CBR serves.
//!
//! Payloads are decoded to UTF-8 with the encoding named in their declaration
//! and then read into serde structs. Element names match without their
//! namespace prefix; attributes and unknown elements are skipped.

use std::borrow::Cow;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::de::DeserializeOwned;

#[derive(Debug)]
pub(crate) struct Document<'a> {
    /// Local name of the document element, `None` for an empty payload.
    pub root: Option<String>,
    text: Cow<'a, str>,
}

impl Document<'_> {
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, quick_xml::DeError> {
        quick_xml::de::from_str(&self.text)
    }
}

/// Decode `bytes` and find its root element.
///
/// The declared document encoding is honored, so windows-1251 payloads decode
/// to proper UTF-8 strings.
pub(crate) fn read_document(bytes: &[u8]) -> Result<Document<'_>, quick_xml::Error> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();

    // The declaration, when present, comes first and switches the decoder.
    let root = loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) | Event::Empty(start) => {
                break Some(String::from_utf8_lossy(start.local_name().as_ref()).into_owned());
            }
            Event::Eof => break None,
            _ => {}
        }
        buf.clear();
    };

    let text = reader.decoder().decode(bytes)?;
    Ok(Document { root, text })
}
