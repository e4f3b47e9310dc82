//! PDF page editing engine
//!
//! This crate performs the byte-level work behind the editor session using
//! lopdf. Every public operation takes a complete PDF as bytes and returns a
//! complete new PDF (or a derived value); nothing is patched in place.
//!
//! - `merge_documents`: concatenate page sequences
//! - `move_page` / `remove_page`: rewrite the page tree
//! - `read_metadata` / `write_metadata`: trailer `/Info` dictionary
//! - `apply_page_filters` / `add_page_text`: bake overlays into a page
//! - `project_thumbnails`: one preview per page, in page order

pub mod error;
pub mod filters;
pub mod merge;
pub mod metadata;
pub mod pages;
pub mod style;
pub mod text;
pub mod thumbnail;
pub mod validation;

mod overlay;
mod page_tree;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::PdfEditError;
pub use filters::{apply_page_filters, BorderConfig, BorderStyle, PageFilter, Tint};
pub use merge::{merge_documents, merge_pair};
pub use metadata::{read_metadata, write_metadata, Metadata};
pub use pages::{move_page, remove_page};
pub use style::TextStyle;
pub use text::{add_page_text, TextConfig};
pub use thumbnail::{project_thumbnails, PageThumbnail, MAX_THUMBNAIL_PX};
pub use validation::{validate_pdf, PdfInfo};

use lopdf::Document;

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<usize, PdfEditError> {
    let doc = load_document(bytes)?;
    Ok(doc.get_pages().len())
}

pub(crate) fn load_document(bytes: &[u8]) -> Result<Document, PdfEditError> {
    Document::load_mem(bytes).map_err(|e| PdfEditError::ParseError(e.to_string()))
}

/// Compress and serialize a document
pub(crate) fn save_document(mut doc: Document) -> Result<Vec<u8>, PdfEditError> {
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfEditError::SerializationError(format!("Save failed: {}", e)))?;

    Ok(buffer)
}
