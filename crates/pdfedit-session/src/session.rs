//! Mutation dispatcher
//!
//! [`EditorSession`] is a cheap handle; the work happens in a single
//! dispatcher task that owns the engine and the write side of the state.
//! Requests reach it through a bounded queue and are answered over a
//! oneshot channel.
//!
//! Every mutation records the id of the document that was current when the
//! handle method was called. If another mutation has replaced that document
//! by the time the request is dequeued, the request fails with
//! [`EditorError::StaleDocument`] instead of silently applying to the newer
//! document. Loading a file is the only request that replaces the document
//! unconditionally.

use crate::config::{EditorConfig, OnBusy};
use crate::document::{Document, DocumentId};
use crate::engine::{LopdfEngine, PdfEngine};
use crate::error::{EditorError, Result};
use crate::projector::ThumbnailProjector;
use crate::state::{EditorState, StateHolder};
use pdfedit_core::{BorderConfig, Metadata, PageFilter, TextConfig};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

/// Result of a request that may change the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A new document was adopted
    Applied(DocumentId),
    /// Nothing to do; document and thumbnails are as before
    Unchanged,
}

/// A document ready to be written out
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    /// `edited_<original name>`
    pub file_name: String,
    pub bytes: Arc<[u8]>,
}

type Reply<T> = oneshot::Sender<Result<T>>;

enum Request {
    Load {
        name: String,
        bytes: Vec<u8>,
        reply: Reply<Outcome>,
    },
    Merge {
        expected: DocumentId,
        bytes: Vec<u8>,
        reply: Reply<Outcome>,
    },
    Reorder {
        expected: DocumentId,
        from: usize,
        to: usize,
        reply: Reply<Outcome>,
    },
    Delete {
        expected: DocumentId,
        index: usize,
        reply: Reply<Outcome>,
    },
    GetMetadata {
        reply: Reply<Metadata>,
    },
    SetMetadata {
        expected: DocumentId,
        metadata: Metadata,
        reply: Reply<Outcome>,
    },
    Select {
        page: Option<usize>,
        reply: Reply<()>,
    },
    ApplyFilters {
        expected: DocumentId,
        filter: PageFilter,
        border: Option<BorderConfig>,
        reply: Reply<Outcome>,
    },
    AddText {
        expected: DocumentId,
        config: TextConfig,
        reply: Reply<Outcome>,
    },
}

struct Envelope {
    request: Request,
    /// Held until the request has been answered under `OnBusy::Reject`
    permit: Option<OwnedSemaphorePermit>,
}

/// Handle to an editing session
#[derive(Clone)]
pub struct EditorSession {
    tx: mpsc::Sender<Envelope>,
    state: watch::Receiver<EditorState>,
    gate: Option<Arc<Semaphore>>,
}

impl EditorSession {
    /// Start a session backed by [`LopdfEngine`]. Must be called within a
    /// tokio runtime.
    pub fn new(config: &EditorConfig) -> Self {
        Self::with_engine(Arc::new(LopdfEngine::new()), config)
    }

    /// Start a session with a custom engine
    pub fn with_engine(engine: Arc<dyn PdfEngine>, config: &EditorConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (holder, state) = StateHolder::new();

        let dispatcher = Dispatcher {
            projector: ThumbnailProjector::new(engine.clone(), config.thumbnail_max_px),
            engine,
            holder,
            timeout: config.engine_timeout(),
            last_id: None,
        };
        tokio::spawn(dispatcher.run(rx));

        let gate = match config.on_busy {
            OnBusy::Queue => None,
            OnBusy::Reject => Some(Arc::new(Semaphore::new(1))),
        };

        Self { tx, state, gate }
    }

    /// Latest snapshot of the whole state
    pub fn state(&self) -> EditorState {
        self.state.borrow().clone()
    }

    pub fn current(&self) -> Option<Document> {
        self.state.borrow().document.clone()
    }

    /// Receiver that is notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<EditorState> {
        self.state.clone()
    }

    /// Replace the current document (if any) with an upload
    pub fn load(
        &self,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<Outcome>> + Send + '_ {
        let name = name.into();
        let permit = self.admit();
        async move {
            let permit = permit?;
            self.call(permit, |reply| Request::Load { name, bytes, reply })
                .await
        }
    }

    /// Append the pages of another PDF to the current document
    pub fn merge(&self, bytes: Vec<u8>) -> impl Future<Output = Result<Outcome>> + Send + '_ {
        let issued = self.issued_against();
        async move {
            let (expected, permit) = issued?;
            self.call(permit, |reply| Request::Merge {
                expected,
                bytes,
                reply,
            })
            .await
        }
    }

    /// Move the page at `from` to `to`. A destination outside the document is
    /// ignored and reported as [`Outcome::Unchanged`].
    pub fn reorder_page(
        &self,
        from: usize,
        to: usize,
    ) -> impl Future<Output = Result<Outcome>> + Send + '_ {
        let issued = self.issued_against();
        async move {
            let (expected, permit) = issued?;
            self.call(permit, |reply| Request::Reorder {
                expected,
                from,
                to,
                reply,
            })
            .await
        }
    }

    pub fn delete_page(&self, index: usize) -> impl Future<Output = Result<Outcome>> + Send + '_ {
        let issued = self.issued_against();
        async move {
            let (expected, permit) = issued?;
            self.call(permit, |reply| Request::Delete {
                expected,
                index,
                reply,
            })
            .await
        }
    }

    pub fn get_metadata(&self) -> impl Future<Output = Result<Metadata>> + Send + '_ {
        let permit = self.admit();
        async move {
            let permit = permit?;
            self.call(permit, |reply| Request::GetMetadata { reply })
                .await
        }
    }

    /// Merge `metadata` into the document information; `None` fields are
    /// left as they are
    pub fn set_metadata(
        &self,
        metadata: Metadata,
    ) -> impl Future<Output = Result<Outcome>> + Send + '_ {
        let issued = self.issued_against();
        async move {
            let (expected, permit) = issued?;
            self.call(permit, |reply| Request::SetMetadata {
                expected,
                metadata,
                reply,
            })
            .await
        }
    }

    /// Choose the page that filters and text apply to
    pub async fn select_page(&self, page: Option<usize>) -> Result<()> {
        self.call(None, |reply| Request::Select { page, reply })
            .await
    }

    /// Bake a filter and optional border into the selected page
    pub fn apply_filters(
        &self,
        filter: PageFilter,
        border: Option<BorderConfig>,
    ) -> impl Future<Output = Result<Outcome>> + Send + '_ {
        let issued = self.issued_against();
        async move {
            let (expected, permit) = issued?;
            self.call(permit, |reply| Request::ApplyFilters {
                expected,
                filter,
                border,
                reply,
            })
            .await
        }
    }

    /// Draw text on the selected page
    pub fn add_text(&self, config: TextConfig) -> impl Future<Output = Result<Outcome>> + Send + '_ {
        let issued = self.issued_against();
        async move {
            let (expected, permit) = issued?;
            self.call(permit, |reply| Request::AddText {
                expected,
                config,
                reply,
            })
            .await
        }
    }

    /// The current document under its export name. Does not change state.
    pub fn export(&self) -> Result<Export> {
        let state = self.state.borrow();
        let document = state.document.as_ref().ok_or(EditorError::NoDocument)?;
        Ok(Export {
            file_name: document.export_name(),
            bytes: document.bytes().clone(),
        })
    }

    /// Take the busy permit when running under `OnBusy::Reject`
    fn admit(&self) -> Result<Option<OwnedSemaphorePermit>> {
        let Some(gate) = &self.gate else {
            return Ok(None);
        };
        match gate.clone().try_acquire_owned() {
            Ok(permit) => Ok(Some(permit)),
            Err(_) => {
                warn!("Rejecting request: another operation is in flight");
                Err(EditorError::Busy)
            }
        }
    }

    /// Capture the current document id and the busy permit at call time
    fn issued_against(&self) -> Result<(DocumentId, Option<OwnedSemaphorePermit>)> {
        let expected = self
            .state
            .borrow()
            .document
            .as_ref()
            .map(Document::id)
            .ok_or(EditorError::NoDocument)?;
        Ok((expected, self.admit()?))
    }

    async fn call<T>(
        &self,
        permit: Option<OwnedSemaphorePermit>,
        request: impl FnOnce(Reply<T>) -> Request,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Envelope {
                request: request(reply),
                permit,
            })
            .await
            .map_err(|_| EditorError::SessionClosed)?;
        response.await.map_err(|_| EditorError::SessionClosed)?
    }
}

/// Release the busy permit, then answer
fn respond<T>(permit: Option<OwnedSemaphorePermit>, reply: Reply<T>, result: Result<T>) {
    drop(permit);
    // The caller may have stopped waiting
    let _ = reply.send(result);
}

struct Dispatcher {
    engine: Arc<dyn PdfEngine>,
    projector: ThumbnailProjector,
    holder: StateHolder,
    timeout: Option<Duration>,
    last_id: Option<DocumentId>,
}

impl Dispatcher {
    async fn run(mut self, mut rx: mpsc::Receiver<Envelope>) {
        while let Some(Envelope { request, permit }) = rx.recv().await {
            match request {
                Request::Load { name, bytes, reply } => {
                    debug!(%name, size = bytes.len(), "Dequeued load");
                    let result = self.load(name, bytes).await;
                    respond(permit, reply, result);
                }
                Request::Merge {
                    expected,
                    bytes,
                    reply,
                } => {
                    debug!(%expected, size = bytes.len(), "Dequeued merge");
                    let result = self.merge(expected, bytes).await;
                    respond(permit, reply, result);
                }
                Request::Reorder {
                    expected,
                    from,
                    to,
                    reply,
                } => {
                    debug!(%expected, from, to, "Dequeued reorder");
                    let result = self.reorder(expected, from, to).await;
                    respond(permit, reply, result);
                }
                Request::Delete {
                    expected,
                    index,
                    reply,
                } => {
                    debug!(%expected, index, "Dequeued delete");
                    let result = self.delete(expected, index).await;
                    respond(permit, reply, result);
                }
                Request::GetMetadata { reply } => {
                    debug!("Dequeued metadata read");
                    let result = self.get_metadata().await;
                    respond(permit, reply, result);
                }
                Request::SetMetadata {
                    expected,
                    metadata,
                    reply,
                } => {
                    debug!(%expected, "Dequeued metadata write");
                    let result = self.set_metadata(expected, metadata).await;
                    respond(permit, reply, result);
                }
                Request::Select { page, reply } => {
                    let result = self.select(page);
                    respond(permit, reply, result);
                }
                Request::ApplyFilters {
                    expected,
                    filter,
                    border,
                    reply,
                } => {
                    debug!(%expected, "Dequeued filters");
                    let result = self.apply_filters(expected, filter, border).await;
                    respond(permit, reply, result);
                }
                Request::AddText {
                    expected,
                    config,
                    reply,
                } => {
                    debug!(%expected, "Dequeued text");
                    let result = self.add_text(expected, config).await;
                    respond(permit, reply, result);
                }
            }
        }
        debug!("Editor session closed");
    }

    async fn load(&mut self, name: String, bytes: Vec<u8>) -> Result<Outcome> {
        self.holder.begin("Loading document...");
        let result = self.load_inner(name, bytes).await;
        self.settle(result)
    }

    async fn load_inner(&mut self, name: String, bytes: Vec<u8>) -> Result<Outcome> {
        let bytes: Arc<[u8]> = bytes.into();
        let info = self.bounded(self.engine.validate(bytes.clone())).await?;
        self.adopt(name, bytes, info.page_count, false).await
    }

    async fn merge(&mut self, expected: DocumentId, bytes: Vec<u8>) -> Result<Outcome> {
        let current = self.precheck(expected)?;
        self.holder.begin("Merging documents...");
        let result = self.merge_inner(current, bytes).await;
        self.settle(result)
    }

    async fn merge_inner(&mut self, current: Document, bytes: Vec<u8>) -> Result<Outcome> {
        let second: Arc<[u8]> = bytes.into();
        self.bounded(self.engine.validate(second.clone())).await?;
        let merged = self
            .bounded(self.engine.merge(current.bytes().clone(), second))
            .await?;
        self.adopt_mutation(&current, merged).await
    }

    async fn reorder(&mut self, expected: DocumentId, from: usize, to: usize) -> Result<Outcome> {
        let current = self.precheck(expected)?;
        let page_count = current.page_count();
        self.reject(check_index(from, page_count))?;
        if to >= page_count || from == to {
            debug!(from, to, page_count, "Reorder is a no-op");
            return Ok(Outcome::Unchanged);
        }

        self.holder.begin("Moving page...");
        let result = async {
            let bytes = self
                .bounded(self.engine.move_page(current.bytes().clone(), from, to))
                .await?;
            self.adopt_mutation(&current, bytes).await
        }
        .await;
        self.settle(result)
    }

    async fn delete(&mut self, expected: DocumentId, index: usize) -> Result<Outcome> {
        let current = self.precheck(expected)?;
        self.reject(check_index(index, current.page_count()))?;

        self.holder.begin("Deleting page...");
        let result = async {
            let bytes = self
                .bounded(self.engine.remove_page(current.bytes().clone(), index))
                .await?;
            self.adopt_mutation(&current, bytes).await
        }
        .await;
        self.settle(result)
    }

    async fn get_metadata(&mut self) -> Result<Metadata> {
        let current = self.holder.current().ok_or(EditorError::NoDocument);
        let current = self.reject(current)?;

        self.holder.begin("Reading metadata...");
        let result = self
            .bounded(self.engine.read_metadata(current.bytes().clone()))
            .await;
        match result {
            Ok(metadata) => {
                self.holder.finish();
                Ok(metadata)
            }
            Err(err) => Err(self.failed(err)),
        }
    }

    async fn set_metadata(&mut self, expected: DocumentId, metadata: Metadata) -> Result<Outcome> {
        let current = self.precheck(expected)?;

        self.holder.begin("Saving metadata...");
        let result = async {
            let bytes = self
                .bounded(self.engine.write_metadata(current.bytes().clone(), metadata))
                .await?;
            self.adopt_mutation(&current, bytes).await
        }
        .await;
        self.settle(result)
    }

    fn select(&mut self, page: Option<usize>) -> Result<()> {
        if let Some(index) = page {
            let current = self.holder.current().ok_or(EditorError::NoDocument);
            let current = self.reject(current)?;
            let checked = check_index(index, current.page_count());
            self.reject(checked)?;
        }
        self.holder.select(page);
        Ok(())
    }

    async fn apply_filters(
        &mut self,
        expected: DocumentId,
        filter: PageFilter,
        border: Option<BorderConfig>,
    ) -> Result<Outcome> {
        let current = self.precheck(expected)?;
        let Some(index) = self.selected_page(&current) else {
            debug!("No page selected, filters skipped");
            return Ok(Outcome::Unchanged);
        };
        if let Some(border) = &border {
            let checked = border.validate().map_err(EditorError::from);
            self.reject(checked)?;
        }
        let border = border.filter(BorderConfig::is_visible);
        if filter.is_identity() && border.is_none() {
            debug!(index, "Filter and border are both empty");
            return Ok(Outcome::Unchanged);
        }

        self.holder.begin("Applying filters...");
        let result = async {
            let bytes = self
                .bounded(
                    self.engine
                        .apply_filters(current.bytes().clone(), index, filter, border),
                )
                .await?;
            self.adopt_mutation(&current, bytes).await
        }
        .await;
        self.settle(result)
    }

    async fn add_text(&mut self, expected: DocumentId, config: TextConfig) -> Result<Outcome> {
        let current = self.precheck(expected)?;
        let Some(index) = self.selected_page(&current) else {
            debug!("No page selected, text skipped");
            return Ok(Outcome::Unchanged);
        };

        self.holder.begin("Adding text...");
        let result = async {
            let bytes = self
                .bounded(self.engine.add_text(current.bytes().clone(), index, config))
                .await?;
            self.adopt_mutation(&current, bytes).await
        }
        .await;
        self.settle(result)
    }

    /// The current document, provided it is the one the request was issued
    /// against
    fn precheck(&self, expected: DocumentId) -> Result<Document> {
        let checked = match self.holder.current() {
            None => Err(EditorError::NoDocument),
            Some(current) if current.id() != expected => {
                warn!(%expected, current = %current.id(), "Rejecting request for a replaced document");
                Err(EditorError::StaleDocument {
                    expected,
                    current: current.id(),
                })
            }
            Some(current) => Ok(current),
        };
        self.reject(checked)
    }

    fn selected_page(&self, current: &Document) -> Option<usize> {
        self.holder
            .selection()
            .filter(|&index| index < current.page_count())
    }

    async fn adopt_mutation(&mut self, current: &Document, bytes: Vec<u8>) -> Result<Outcome> {
        let bytes: Arc<[u8]> = bytes.into();
        let page_count = self.bounded(self.engine.page_count(bytes.clone())).await?;
        self.adopt(current.name().to_string(), bytes, page_count, true)
            .await
    }

    /// Project thumbnails, then publish document and thumbnails together
    async fn adopt(
        &mut self,
        name: String,
        bytes: Arc<[u8]>,
        page_count: usize,
        keep_selection: bool,
    ) -> Result<Outcome> {
        let thumbnails = self
            .bounded(self.projector.project(bytes.clone(), page_count))
            .await?;

        let id = self.last_id.map_or_else(DocumentId::first, DocumentId::next);
        self.last_id = Some(id);

        info!(%id, %name, pages = page_count, size = bytes.len(), "Adopted document");
        self.holder
            .replace(Document::new(id, name, bytes, page_count), thumbnails, keep_selection);
        Ok(Outcome::Applied(id))
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| EditorError::Timeout(limit.as_millis() as u64))?,
            None => call.await,
        }
    }

    /// Record a precondition failure without touching the busy flag
    fn reject<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.holder.fail(err);
        }
        result
    }

    /// Close out an engine-bound request. The document is only replaced by
    /// `adopt`, so on failure it is still the one from before the request.
    fn settle(&self, result: Result<Outcome>) -> Result<Outcome> {
        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) => Err(self.failed(err)),
        }
    }

    fn failed(&self, err: EditorError) -> EditorError {
        error!(error = %err, kind = ?err.kind(), "Operation failed");
        self.holder.fail(&err);
        err
    }
}

fn check_index(index: usize, page_count: usize) -> Result<()> {
    if index < page_count {
        Ok(())
    } else {
        Err(EditorError::IndexOutOfRange { index, page_count })
    }
}
