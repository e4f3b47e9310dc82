//! Engine seam
//!
//! The session only sees the PDF engine through [`PdfEngine`]. The
//! production implementation runs `pdfedit-core` on tokio's blocking pool.

use crate::error::{EditorError, Result};
use async_trait::async_trait;
use pdfedit_core::{
    BorderConfig, Metadata, PageFilter, PageThumbnail, PdfEditError, PdfInfo, TextConfig,
};
use std::sync::Arc;
use tracing::instrument;

/// Asynchronous PDF engine
///
/// Every call takes a complete document and returns a complete new one (or
/// a derived value). Implementations must not keep state between calls.
#[async_trait]
pub trait PdfEngine: Send + Sync {
    /// Parse and vet an upload
    async fn validate(&self, bytes: Arc<[u8]>) -> Result<PdfInfo>;

    async fn page_count(&self, bytes: Arc<[u8]>) -> Result<usize>;

    /// One thumbnail per page, in page order
    async fn thumbnails(&self, bytes: Arc<[u8]>, max_px: u32) -> Result<Vec<PageThumbnail>>;

    /// Pages of `first` followed by pages of `second`
    async fn merge(&self, first: Arc<[u8]>, second: Arc<[u8]>) -> Result<Vec<u8>>;

    async fn move_page(&self, bytes: Arc<[u8]>, from: usize, to: usize) -> Result<Vec<u8>>;

    async fn remove_page(&self, bytes: Arc<[u8]>, index: usize) -> Result<Vec<u8>>;

    async fn read_metadata(&self, bytes: Arc<[u8]>) -> Result<Metadata>;

    async fn write_metadata(&self, bytes: Arc<[u8]>, metadata: Metadata) -> Result<Vec<u8>>;

    async fn apply_filters(
        &self,
        bytes: Arc<[u8]>,
        index: usize,
        filter: PageFilter,
        border: Option<BorderConfig>,
    ) -> Result<Vec<u8>>;

    async fn add_text(&self, bytes: Arc<[u8]>, index: usize, config: TextConfig)
        -> Result<Vec<u8>>;
}

/// [`PdfEngine`] backed by `pdfedit-core`
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfEngine;

impl LopdfEngine {
    pub fn new() -> Self {
        Self
    }
}

/// Run CPU-bound lopdf work off the async runtime
async fn blocking<T, F>(op: &'static str, work: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, PdfEditError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| EditorError::Engine(format!("{} task join error: {}", op, e)))?
        .map_err(EditorError::from)
}

#[async_trait]
impl PdfEngine for LopdfEngine {
    #[instrument(skip_all, fields(size = bytes.len()))]
    async fn validate(&self, bytes: Arc<[u8]>) -> Result<PdfInfo> {
        blocking("validate", move || pdfedit_core::validate_pdf(&bytes)).await
    }

    #[instrument(skip_all)]
    async fn page_count(&self, bytes: Arc<[u8]>) -> Result<usize> {
        blocking("page_count", move || pdfedit_core::get_page_count(&bytes)).await
    }

    #[instrument(skip(self, bytes))]
    async fn thumbnails(&self, bytes: Arc<[u8]>, max_px: u32) -> Result<Vec<PageThumbnail>> {
        blocking("thumbnails", move || {
            pdfedit_core::project_thumbnails(&bytes, max_px)
        })
        .await
    }

    #[instrument(skip_all, fields(first = first.len(), second = second.len()))]
    async fn merge(&self, first: Arc<[u8]>, second: Arc<[u8]>) -> Result<Vec<u8>> {
        blocking("merge", move || pdfedit_core::merge_pair(&first, &second)).await
    }

    #[instrument(skip(self, bytes))]
    async fn move_page(&self, bytes: Arc<[u8]>, from: usize, to: usize) -> Result<Vec<u8>> {
        blocking("move_page", move || pdfedit_core::move_page(&bytes, from, to)).await
    }

    #[instrument(skip(self, bytes))]
    async fn remove_page(&self, bytes: Arc<[u8]>, index: usize) -> Result<Vec<u8>> {
        blocking("remove_page", move || pdfedit_core::remove_page(&bytes, index)).await
    }

    #[instrument(skip_all)]
    async fn read_metadata(&self, bytes: Arc<[u8]>) -> Result<Metadata> {
        blocking("read_metadata", move || pdfedit_core::read_metadata(&bytes)).await
    }

    #[instrument(skip(self, bytes))]
    async fn write_metadata(&self, bytes: Arc<[u8]>, metadata: Metadata) -> Result<Vec<u8>> {
        blocking("write_metadata", move || {
            pdfedit_core::write_metadata(&bytes, &metadata)
        })
        .await
    }

    #[instrument(skip(self, bytes, filter, border))]
    async fn apply_filters(
        &self,
        bytes: Arc<[u8]>,
        index: usize,
        filter: PageFilter,
        border: Option<BorderConfig>,
    ) -> Result<Vec<u8>> {
        blocking("apply_filters", move || {
            pdfedit_core::apply_page_filters(&bytes, index, &filter, border.as_ref())
        })
        .await
    }

    #[instrument(skip(self, bytes, config))]
    async fn add_text(
        &self,
        bytes: Arc<[u8]>,
        index: usize,
        config: TextConfig,
    ) -> Result<Vec<u8>> {
        blocking("add_text", move || {
            pdfedit_core::add_page_text(&bytes, index, &config)
        })
        .await
    }
}
