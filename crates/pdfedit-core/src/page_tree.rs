//! Page tree helpers
//!
//! Rewrites always produce a flat tree: every page is a direct kid of the
//! catalog's `/Pages` node. Attributes a page inherited from intermediate
//! nodes are copied onto the page first so flattening does not change how
//! it renders.

use crate::error::PdfEditError;
use lopdf::{Dictionary, Document, Object, ObjectId};

const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against cyclic `/Parent` chains in malformed files
const MAX_TREE_DEPTH: usize = 64;

const US_LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Page object ids in page order
pub(crate) fn page_order(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

/// Resolve a 0-based page index to its object id
pub(crate) fn page_id_at(doc: &Document, index: usize) -> Result<ObjectId, PdfEditError> {
    let order = page_order(doc);
    order
        .get(index)
        .copied()
        .ok_or(PdfEditError::PageOutOfRange {
            index,
            page_count: order.len(),
        })
}

pub(crate) fn page_dict(doc: &Document, page_id: ObjectId) -> Result<&Dictionary, PdfEditError> {
    doc.get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|_| PdfEditError::OperationError(format!("Page {:?} is not a dictionary", page_id)))
}

/// Look up `key` on the page's ancestors, nearest first
pub(crate) fn inherited_value(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut current = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(node_id) = current {
        if depth >= MAX_TREE_DEPTH {
            return None;
        }
        let node = doc.get_object(node_id).and_then(Object::as_dict).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        current = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    None
}

/// Own or inherited value of `key`
fn page_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    page.get(key)
        .ok()
        .cloned()
        .or_else(|| inherited_value(doc, page, key))
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn as_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(n) => Some(*n as f32),
        Object::Real(n) => Some(*n),
        _ => None,
    }
}

/// MediaBox as `[x0, y0, x1, y1]`, normalized so x0 <= x1 and y0 <= y1.
/// Falls back to US Letter when the page has none.
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let Ok(page) = page_dict(doc, page_id) else {
        return US_LETTER;
    };
    let Some(value) = page_attribute(doc, page, b"MediaBox") else {
        return US_LETTER;
    };
    let Ok(array) = resolve(doc, &value).as_array() else {
        return US_LETTER;
    };
    if array.len() != 4 {
        return US_LETTER;
    }

    let mut rect = [0.0f32; 4];
    for (slot, obj) in rect.iter_mut().zip(array) {
        match as_number(resolve(doc, obj)) {
            Some(n) => *slot = n,
            None => return US_LETTER,
        }
    }

    [
        rect[0].min(rect[2]),
        rect[1].min(rect[3]),
        rect[0].max(rect[2]),
        rect[1].max(rect[3]),
    ]
}

/// Page rotation normalized to 0, 90, 180 or 270
pub(crate) fn rotation(doc: &Document, page_id: ObjectId) -> i32 {
    let angle = page_dict(doc, page_id)
        .ok()
        .and_then(|page| page_attribute(doc, page, b"Rotate"))
        .and_then(|value| resolve(doc, &value).as_i64().ok())
        .unwrap_or(0);
    normalize_rotation(angle)
}

fn normalize_rotation(angle: i64) -> i32 {
    let quarter_turns = (angle / 90).rem_euclid(4);
    (quarter_turns * 90) as i32
}

/// Copy inheritable attributes from ancestors onto every page that lacks them
pub(crate) fn materialize_inherited(doc: &mut Document) -> Result<(), PdfEditError> {
    for page_id in page_order(doc) {
        let missing: Vec<(&[u8], Object)> = {
            let page = page_dict(doc, page_id)?;
            INHERITABLE_KEYS
                .iter()
                .filter(|key| page.get(key).is_err())
                .filter_map(|key| inherited_value(doc, page, key).map(|value| (*key, value)))
                .collect()
        };

        if missing.is_empty() {
            continue;
        }

        let page = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| PdfEditError::OperationError(e.to_string()))?;
        for (key, value) in missing {
            page.set(key, value);
        }
    }

    Ok(())
}

/// Id of the catalog's `/Pages` node
pub(crate) fn pages_root_id(doc: &Document) -> Result<ObjectId, PdfEditError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| PdfEditError::OperationError("No Root in trailer".into()))?;

    doc.get_object(catalog_id)
        .and_then(Object::as_dict)
        .map_err(|_| PdfEditError::OperationError("Invalid catalog".into()))?
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| PdfEditError::OperationError("No Pages in catalog".into()))
}

/// Replace the page tree with a single level holding `page_refs` in order.
/// Call `materialize_inherited` first.
pub(crate) fn flatten_page_tree(
    doc: &mut Document,
    page_refs: &[ObjectId],
) -> Result<(), PdfEditError> {
    let pages_id = pages_root_id(doc)?;

    match doc.objects.get_mut(&pages_id) {
        Some(Object::Dictionary(pages_dict)) => {
            let kids = page_refs
                .iter()
                .map(|&id| Object::Reference(id))
                .collect::<Vec<_>>();
            pages_dict.set("Kids", Object::Array(kids));
            pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
        }
        _ => {
            return Err(PdfEditError::OperationError(
                "Invalid pages dictionary".into(),
            ))
        }
    }

    for &page_id in page_refs {
        match doc.objects.get_mut(&page_id) {
            Some(Object::Dictionary(page)) => page.set("Parent", Object::Reference(pages_id)),
            _ => {
                return Err(PdfEditError::OperationError(format!(
                    "Page {:?} not found",
                    page_id
                )))
            }
        }
    }

    Ok(())
}
