use crate::engine::PdfEngine;
use crate::error::{EditorError, Result};
use pdfedit_core::PageThumbnail;
use std::sync::Arc;

/// Derives the thumbnail sequence for a document
///
/// The result is all-or-nothing: a sequence whose length does not match the
/// page count is an error, never a partial result.
#[derive(Clone)]
pub struct ThumbnailProjector {
    engine: Arc<dyn PdfEngine>,
    max_px: u32,
}

impl ThumbnailProjector {
    pub fn new(engine: Arc<dyn PdfEngine>, max_px: u32) -> Self {
        Self { engine, max_px }
    }

    pub async fn project(&self, bytes: Arc<[u8]>, page_count: usize) -> Result<Vec<PageThumbnail>> {
        let thumbnails = self.engine.thumbnails(bytes, self.max_px).await?;

        if thumbnails.len() != page_count {
            return Err(EditorError::Engine(format!(
                "Projected {} thumbnails for a {}-page document",
                thumbnails.len(),
                page_count
            )));
        }
        if let Some(misplaced) = thumbnails.iter().enumerate().find(|(i, t)| t.index != *i) {
            return Err(EditorError::Engine(format!(
                "Thumbnail {} reports index {}",
                misplaced.0, misplaced.1.index
            )));
        }

        Ok(thumbnails)
    }
}
