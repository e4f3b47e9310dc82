//! In-memory fixture PDFs shared by the unit tests

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

fn label_content(label: &str) -> Vec<u8> {
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
            Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
            Operation::new(
                "Tj",
                vec![Object::String(label.as_bytes().to_vec(), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ],
    };
    content.encode().unwrap()
}

fn letter_media_box() -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(612),
        Object::Integer(792),
    ])
}

fn add_page(doc: &mut Document, parent: ObjectId, label: &str) -> ObjectId {
    let content_id = doc.add_object(Stream::new(Dictionary::new(), label_content(label)));
    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(parent),
        "MediaBox" => letter_media_box(),
        "Contents" => Object::Reference(content_id),
    })
}

fn finish(mut doc: Document, pages_id: ObjectId) -> Vec<u8> {
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Create a flat PDF whose pages show `{prefix}-Page-{n}` (1-based n)
pub(crate) fn create_test_pdf(num_pages: u32, prefix: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (0..num_pages)
        .map(|i| {
            let label = format!("{}-Page-{}", prefix, i + 1);
            Object::Reference(add_page(&mut doc, pages_id, &label))
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => num_pages as i64,
            "Kids" => kids,
        }),
    );

    finish(doc, pages_id)
}

/// Create a two-level page tree: 2 pages under an intermediate node that
/// carries the MediaBox and Resources, then 1 page directly under the root.
/// Pages in the intermediate node have no MediaBox of their own.
pub(crate) fn create_nested_tree_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let root_id = doc.new_object_id();
    let branch_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => Object::Reference(font_id) },
    });

    let mut branch_kids = Vec::new();
    for label in ["Nested-Page-1", "Nested-Page-2"] {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), label_content(label)));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(branch_id),
            "Contents" => Object::Reference(content_id),
        });
        branch_kids.push(Object::Reference(page_id));
    }
    doc.objects.insert(
        branch_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Parent" => Object::Reference(root_id),
            "Count" => 2,
            "Kids" => branch_kids,
            "Resources" => Object::Reference(resources_id),
            "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
            "Rotate" => 90,
        }),
    );

    let leaf_id = add_page(&mut doc, root_id, "Nested-Page-3");
    doc.objects.insert(
        root_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => 3,
            "Kids" => vec![Object::Reference(branch_id), Object::Reference(leaf_id)],
        }),
    );

    finish(doc, root_id)
}

/// The first literal string shown on each page, in page order
pub(crate) fn page_labels(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let content = doc.get_page_content(page_id).unwrap();
            let text = String::from_utf8_lossy(&content);
            let start = text.find('(').map(|i| i + 1).unwrap_or(0);
            let end = text[start..].find(')').map(|i| start + i).unwrap_or(start);
            text[start..end].to_string()
        })
        .collect()
}
