//! Upload validation
//!
//! A document is accepted for editing only if it parses, is not encrypted
//! and has at least one page.

use crate::error::PdfEditError;
use crate::load_document;
use crate::metadata::{info_dictionary, Metadata};
use serde::Serialize;

const MIN_PDF_LEN: usize = 8;

/// What an accepted upload looks like
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct PdfInfo {
    pub page_count: usize,
    /// Header version, e.g. "1.7"
    pub version: String,
    pub size_bytes: usize,
    pub title: Option<String>,
    pub author: Option<String>,
}

fn check_header(bytes: &[u8]) -> Result<(), PdfEditError> {
    if bytes.len() < MIN_PDF_LEN {
        return Err(PdfEditError::ParseError(
            "File too small to be a valid PDF".into(),
        ));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(PdfEditError::ParseError(
            "Not a valid PDF file (missing %PDF- header)".into(),
        ));
    }
    Ok(())
}

fn header_version(bytes: &[u8]) -> String {
    bytes
        .get(5..8)
        .and_then(|v| std::str::from_utf8(v).ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "1.4".to_string())
}

/// Parse `bytes` and describe the document, rejecting anything the editor
/// cannot work on
pub fn validate_pdf(bytes: &[u8]) -> Result<PdfInfo, PdfEditError> {
    check_header(bytes)?;

    let doc = load_document(bytes)?;
    if doc.is_encrypted() {
        return Err(PdfEditError::ParseError(
            "Encrypted PDFs are not supported".into(),
        ));
    }

    let page_count = doc.get_pages().len();
    if page_count == 0 {
        return Err(PdfEditError::ParseError("PDF has no pages".into()));
    }

    let metadata = info_dictionary(&doc)
        .map(|info| Metadata::from_info(&doc, info))
        .unwrap_or_default();

    Ok(PdfInfo {
        page_count,
        version: header_version(bytes),
        size_bytes: bytes.len(),
        title: metadata.title,
        author: metadata.author,
    })
}
