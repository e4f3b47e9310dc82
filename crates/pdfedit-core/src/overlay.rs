//! Appending content and resources to a single page
//!
//! The page's existing content is wrapped in `q ... Q` so whatever graphics
//! state it leaves behind cannot leak into the overlay drawn after it.

use crate::error::PdfEditError;
use crate::page_tree::{inherited_value, page_dict};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Resources the page can modify without touching other pages.
/// Referenced or inherited dictionaries are copied.
fn owned_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, PdfEditError> {
    let page = page_dict(doc, page_id)?;
    let resources = page
        .get(b"Resources")
        .ok()
        .cloned()
        .or_else(|| inherited_value(doc, page, b"Resources"));

    owned_dictionary(doc, resources)
}

fn owned_dictionary(doc: &Document, value: Option<Object>) -> Result<Dictionary, PdfEditError> {
    match value {
        Some(Object::Dictionary(dict)) => Ok(dict),
        Some(Object::Reference(id)) => doc
            .get_object(id)
            .and_then(Object::as_dict)
            .cloned()
            .map_err(|_| PdfEditError::OperationError("Resources is not a dictionary".into())),
        _ => Ok(Dictionary::new()),
    }
}

fn unused_name(dict: &Dictionary, prefix: &str) -> String {
    let mut n = 1usize;
    loop {
        let name = format!("{}{}", prefix, n);
        if dict.get(name.as_bytes()).is_err() {
            return name;
        }
        n += 1;
    }
}

/// Add `value` under `/Resources/<category>` with a fresh name and return the name
pub(crate) fn register_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &[u8],
    prefix: &str,
    value: Object,
) -> Result<String, PdfEditError> {
    let mut resources = owned_resources(doc, page_id)?;
    let mut entries = owned_dictionary(doc, resources.get(category).ok().cloned())?;

    let name = unused_name(&entries, prefix);
    entries.set(name.as_bytes(), value);
    resources.set(category, Object::Dictionary(entries));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PdfEditError::OperationError(e.to_string()))?;
    page.set("Resources", Object::Dictionary(resources));

    Ok(name)
}

/// Existing content stream references, in drawing order
fn content_refs(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, PdfEditError> {
    let page = page_dict(doc, page_id)?;
    let refs = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    Ok(refs)
}

/// Draw `operations` on top of the page's current content
pub(crate) fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<(), PdfEditError> {
    let existing = content_refs(doc, page_id)?;

    let mut overlay = vec![Operation::new("Q", vec![])];
    overlay.extend(operations);
    // Leading newline keeps the first token separate from the previous stream's last one
    let mut encoded = b"\n".to_vec();
    encoded.extend(
        Content {
            operations: overlay,
        }
        .encode()
        .map_err(|e| PdfEditError::SerializationError(e.to_string()))?,
    );

    let prefix_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(prefix_id));
    contents.extend(existing);
    contents.push(Object::Reference(overlay_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PdfEditError::OperationError(e.to_string()))?;
    page.set("Contents", Object::Array(contents));

    Ok(())
}
