//! Page reordering and removal
//!
//! Both operations compute the new page order, then rebuild the page tree
//! from it. Pages are 0-indexed at this API.

use crate::error::PdfEditError;
use crate::page_tree::{flatten_page_tree, materialize_inherited, page_order};
use crate::{load_document, save_document};
use lopdf::{Document, ObjectId};

fn check_index(index: usize, page_count: usize) -> Result<(), PdfEditError> {
    if index < page_count {
        Ok(())
    } else {
        Err(PdfEditError::PageOutOfRange { index, page_count })
    }
}

fn rebuild(mut doc: Document, order: &[ObjectId]) -> Result<Vec<u8>, PdfEditError> {
    materialize_inherited(&mut doc)?;
    flatten_page_tree(&mut doc, order)?;
    doc.prune_objects();
    save_document(doc)
}

/// Move the page at `from` so it ends up at `to`; the pages in between
/// shift by one to close the gap
pub fn move_page(bytes: &[u8], from: usize, to: usize) -> Result<Vec<u8>, PdfEditError> {
    let doc = load_document(bytes)?;
    let mut order = page_order(&doc);

    check_index(from, order.len())?;
    check_index(to, order.len())?;

    let page = order.remove(from);
    order.insert(to, page);

    rebuild(doc, &order)
}

/// Remove the page at `index`; following pages move down by one.
/// The last remaining page cannot be removed.
pub fn remove_page(bytes: &[u8], index: usize) -> Result<Vec<u8>, PdfEditError> {
    let doc = load_document(bytes)?;
    let mut order = page_order(&doc);

    check_index(index, order.len())?;
    if order.len() == 1 {
        return Err(PdfEditError::OperationError(
            "Cannot remove the only page of a document".into(),
        ));
    }

    order.remove(index);
    rebuild(doc, &order)
}
