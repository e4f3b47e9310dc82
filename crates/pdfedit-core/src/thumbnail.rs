//! Per-page previews
//!
//! Page content is not rasterized. Each thumbnail is a page-shaped placeholder
//! PNG plus a fingerprint of the page's decoded content, which is enough to
//! tell pages apart and to follow a page across reorders.

use crate::error::PdfEditError;
use crate::load_document;
use crate::page_tree::{media_box, page_order, rotation};
use base64::Engine;
use lopdf::{Document, ObjectId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const PAPER: [u8; 3] = [0xFF, 0xFF, 0xFF];
const EDGE: [u8; 3] = [0xB0, 0xB0, 0xB0];

/// Largest accepted value for the longest thumbnail side
pub const MAX_THUMBNAIL_PX: u32 = 2048;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageThumbnail {
    /// 0-based position in the document
    pub index: usize,
    /// Page size in points as displayed, i.e. after `/Rotate`
    pub width: f32,
    pub height: f32,
    pub rotation: i32,
    /// Hex SHA-256 of the decoded page content
    pub fingerprint: String,
    /// `data:image/png;base64,...`
    pub image: String,
}

/// Pixel size of a raster whose longest side is `max_px`
fn raster_size(width: f32, height: f32, max_px: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= 0.0 || !longest.is_finite() {
        return (max_px, max_px);
    }
    let scale = max_px as f32 / longest;
    let px = |side: f32| ((side * scale).round() as u32).clamp(1, max_px);
    (px(width), px(height))
}

fn placeholder_png(width: u32, height: u32) -> Result<Vec<u8>, PdfEditError> {
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(EDGE.len()))
        .ok_or_else(|| {
            PdfEditError::InvalidParameter(format!("Thumbnail {}x{} is too large", width, height))
        })?;
    let mut pixels = Vec::with_capacity(len);
    for y in 0..height {
        for x in 0..width {
            let on_edge = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
            pixels.extend_from_slice(if on_edge { &EDGE } else { &PAPER });
        }
    }

    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| PdfEditError::SerializationError(format!("PNG header: {}", e)))?;
        writer
            .write_image_data(&pixels)
            .map_err(|e| PdfEditError::SerializationError(format!("PNG data: {}", e)))?;
    }
    Ok(buffer)
}

fn fingerprint(doc: &Document, page_id: ObjectId) -> Result<String, PdfEditError> {
    let content = doc
        .get_page_content(page_id)
        .map_err(|e| PdfEditError::ParseError(format!("Unreadable page content: {}", e)))?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hex::encode(hasher.finalize()))
}

fn project_page(
    doc: &Document,
    index: usize,
    page_id: ObjectId,
    max_px: u32,
) -> Result<PageThumbnail, PdfEditError> {
    let [x0, y0, x1, y1] = media_box(doc, page_id);
    let rotation = rotation(doc, page_id);
    let (width, height) = match rotation {
        90 | 270 => (y1 - y0, x1 - x0),
        _ => (x1 - x0, y1 - y0),
    };

    let (px_w, px_h) = raster_size(width, height, max_px);
    let png = placeholder_png(px_w, px_h)?;
    let image = format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    );

    Ok(PageThumbnail {
        index,
        width,
        height,
        rotation,
        fingerprint: fingerprint(doc, page_id)?,
        image,
    })
}

/// One thumbnail per page, in page order. Fails as a whole if any page
/// cannot be projected.
pub fn project_thumbnails(bytes: &[u8], max_px: u32) -> Result<Vec<PageThumbnail>, PdfEditError> {
    if max_px == 0 || max_px > MAX_THUMBNAIL_PX {
        return Err(PdfEditError::InvalidParameter(format!(
            "Thumbnail size must be between 1 and {}px, got {}",
            MAX_THUMBNAIL_PX, max_px
        )));
    }

    let doc = load_document(bytes)?;
    let order = page_order(&doc);
    if order.is_empty() {
        return Err(PdfEditError::ParseError("Document has no pages".into()));
    }

    order
        .into_iter()
        .enumerate()
        .map(|(index, page_id)| project_page(&doc, index, page_id, max_px))
        .collect()
}
