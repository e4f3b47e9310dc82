//! Document information dictionary (`/Info` in the trailer)

use crate::error::PdfEditError;
use crate::{load_document, save_document};
use lopdf::{Dictionary, Document, Object, StringFormat};
use serde::{Deserialize, Serialize};

/// Descriptive document fields.
///
/// When writing, `None` leaves a field unchanged, an empty string removes
/// it, and anything else replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
}

impl Metadata {
    fn fields(&self) -> [(&'static [u8], Option<&str>); 6] {
        [
            (b"Title", self.title.as_deref()),
            (b"Author", self.author.as_deref()),
            (b"Subject", self.subject.as_deref()),
            (b"Keywords", self.keywords.as_deref()),
            (b"Creator", self.creator.as_deref()),
            (b"Producer", self.producer.as_deref()),
        ]
    }

    pub(crate) fn from_info(doc: &Document, info: &Dictionary) -> Self {
        let field = |key: &[u8]| {
            info.get(key)
                .ok()
                .map(|value| resolve(doc, value))
                .and_then(|value| value.as_str().ok())
                .map(decode_text_string)
                .filter(|text| !text.is_empty())
        };

        Self {
            title: field(b"Title"),
            author: field(b"Author"),
            subject: field(b"Subject"),
            keywords: field(b"Keywords"),
            creator: field(b"Creator"),
            producer: field(b"Producer"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, value)| value.is_none())
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8 with BOM, or
/// PDFDocEncoding (treated as Latin-1)
pub(crate) fn decode_text_string(raw: &[u8]) -> String {
    if let Some(utf16) = raw.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if let Some(utf8) = raw.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(utf8).into_owned()
    } else {
        raw.iter().map(|&b| char::from(b)).collect()
    }
}

/// ASCII stays a literal string; anything else is written as UTF-16BE
fn encode_text_string(value: &str) -> Object {
    if value.is_ascii() {
        Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

fn pdf_date_now() -> String {
    chrono::Utc::now()
        .format("D:%Y%m%d%H%M%S+00'00'")
        .to_string()
}

pub(crate) fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    let info = doc.trailer.get(b"Info").ok()?;
    resolve(doc, info).as_dict().ok()
}

/// Read the document information fields
pub fn read_metadata(bytes: &[u8]) -> Result<Metadata, PdfEditError> {
    let doc = load_document(bytes)?;
    Ok(info_dictionary(&doc)
        .map(|info| Metadata::from_info(&doc, info))
        .unwrap_or_default())
}

/// Merge `update` into the document information dictionary
pub fn write_metadata(bytes: &[u8], update: &Metadata) -> Result<Vec<u8>, PdfEditError> {
    let mut doc = load_document(bytes)?;

    let info_ref = doc.trailer.get(b"Info").ok().cloned();
    let mut info = match &info_ref {
        Some(Object::Reference(id)) => doc
            .get_object(*id)
            .and_then(Object::as_dict)
            .cloned()
            .unwrap_or_else(|_| Dictionary::new()),
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };

    for (key, value) in update.fields() {
        match value {
            None => {}
            Some("") => {
                info.remove(key);
            }
            Some(text) => info.set(key, encode_text_string(text)),
        }
    }
    info.set(
        "ModDate",
        Object::String(pdf_date_now().into_bytes(), StringFormat::Literal),
    );

    match info_ref {
        Some(Object::Reference(id)) => {
            doc.objects.insert(id, Object::Dictionary(info));
        }
        _ => {
            let info_id = doc.add_object(Object::Dictionary(info));
            doc.trailer.set("Info", Object::Reference(info_id));
        }
    }

    save_document(doc)
}
