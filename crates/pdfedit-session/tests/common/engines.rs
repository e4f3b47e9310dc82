//! Engines with injected faults
//!
//! Everything delegates to `LopdfEngine` except the calls a fault targets.

use async_trait::async_trait;
use pdfedit_session::{
    BorderConfig, EditorError, LopdfEngine, Metadata, PageFilter, PageThumbnail, PdfEngine,
    PdfInfo, Result, TextConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// `remove_page` returns an engine error
    FailRemove,
    /// `remove_page` never completes
    HangRemove,
    /// `remove_page` succeeds after a delay
    SlowRemove(Duration),
    /// `thumbnails` drops the last page
    ShortThumbnails,
}

pub struct FaultyEngine {
    inner: LopdfEngine,
    fault: Fault,
    removes: AtomicUsize,
}

impl FaultyEngine {
    pub fn new(fault: Fault) -> Arc<Self> {
        Arc::new(Self {
            inner: LopdfEngine::new(),
            fault,
            removes: AtomicUsize::new(0),
        })
    }

    /// How many times `remove_page` was entered
    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PdfEngine for FaultyEngine {
    async fn validate(&self, bytes: Arc<[u8]>) -> Result<PdfInfo> {
        self.inner.validate(bytes).await
    }

    async fn page_count(&self, bytes: Arc<[u8]>) -> Result<usize> {
        self.inner.page_count(bytes).await
    }

    async fn thumbnails(&self, bytes: Arc<[u8]>, max_px: u32) -> Result<Vec<PageThumbnail>> {
        let mut thumbnails = self.inner.thumbnails(bytes, max_px).await?;
        if let Fault::ShortThumbnails = self.fault {
            thumbnails.pop();
        }
        Ok(thumbnails)
    }

    async fn merge(&self, first: Arc<[u8]>, second: Arc<[u8]>) -> Result<Vec<u8>> {
        self.inner.merge(first, second).await
    }

    async fn move_page(&self, bytes: Arc<[u8]>, from: usize, to: usize) -> Result<Vec<u8>> {
        self.inner.move_page(bytes, from, to).await
    }

    async fn remove_page(&self, bytes: Arc<[u8]>, index: usize) -> Result<Vec<u8>> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            Fault::FailRemove => Err(EditorError::Engine("simulated engine crash".into())),
            Fault::HangRemove => std::future::pending().await,
            Fault::SlowRemove(delay) => {
                tokio::time::sleep(delay).await;
                self.inner.remove_page(bytes, index).await
            }
            Fault::ShortThumbnails => self.inner.remove_page(bytes, index).await,
        }
    }

    async fn read_metadata(&self, bytes: Arc<[u8]>) -> Result<Metadata> {
        self.inner.read_metadata(bytes).await
    }

    async fn write_metadata(&self, bytes: Arc<[u8]>, metadata: Metadata) -> Result<Vec<u8>> {
        self.inner.write_metadata(bytes, metadata).await
    }

    async fn apply_filters(
        &self,
        bytes: Arc<[u8]>,
        index: usize,
        filter: PageFilter,
        border: Option<BorderConfig>,
    ) -> Result<Vec<u8>> {
        self.inner.apply_filters(bytes, index, filter, border).await
    }

    async fn add_text(
        &self,
        bytes: Arc<[u8]>,
        index: usize,
        config: TextConfig,
    ) -> Result<Vec<u8>> {
        self.inner.add_text(bytes, index, config).await
    }
}
