//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document.

use crate::error::PdfEditError;
use crate::page_tree::{flatten_page_tree, materialize_inherited, page_order};
use crate::{load_document, save_document};
use lopdf::Object;

/// Merge multiple PDFs into one, pages in input order
///
/// The algorithm:
/// 1. If empty, return error
/// 2. Load every document and copy inherited page attributes onto the pages
/// 3. Keep the first document as the destination
/// 4. For each remaining document:
///    a. Offset its object IDs past the destination's highest ID
///    b. Import all objects with remapped references
///    c. Append its pages to the destination page list
/// 5. Flatten the destination page tree, prune the now unreachable source
///    catalogs, compress and serialize
pub fn merge_documents(documents: Vec<Vec<u8>>) -> Result<Vec<u8>, PdfEditError> {
    if documents.is_empty() {
        return Err(PdfEditError::OperationError("No documents to merge".into()));
    }

    let mut loaded_docs = Vec::with_capacity(documents.len());
    for (i, doc_bytes) in documents.iter().enumerate() {
        let mut doc = load_document(doc_bytes).map_err(|e| {
            PdfEditError::ParseError(format!("Failed to load document {}: {}", i, e))
        })?;
        materialize_inherited(&mut doc)?;
        loaded_docs.push(doc);
    }

    let mut sources = loaded_docs.into_iter();
    let Some(mut dest) = sources.next() else {
        return Err(PdfEditError::OperationError("No documents to merge".into()));
    };
    let mut dest_max_id = dest.max_id;
    let mut dest_page_refs = page_order(&dest);

    for source in sources {
        // Read pages before the object table is consumed
        let source_pages = page_order(&source);
        let id_offset = dest_max_id;

        dest.objects
            .extend(source.objects.into_iter().map(|(old_id, object)| {
                (
                    (old_id.0 + id_offset, old_id.1),
                    remap_object_refs(object, id_offset),
                )
            }));

        dest_page_refs.extend(
            source_pages
                .into_iter()
                .map(|(id, generation)| (id + id_offset, generation)),
        );

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
    }

    dest.max_id = dest_max_id;
    flatten_page_tree(&mut dest, &dest_page_refs)?;
    dest.prune_objects();

    save_document(dest)
}

/// Merge exactly two documents: pages of `first` followed by pages of `second`
pub fn merge_pair(first: &[u8], second: &[u8]) -> Result<Vec<u8>, PdfEditError> {
    merge_documents(vec![first.to_vec(), second.to_vec()])
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}
