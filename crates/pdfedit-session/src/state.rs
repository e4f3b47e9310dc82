//! Observable session state
//!
//! The whole state is one `watch` value, so a reader never sees a document
//! next to thumbnails derived from a different one.

use crate::document::Document;
use crate::error::{EditorError, ErrorKind};
use pdfedit_core::PageThumbnail;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Activity {
    #[default]
    Idle,
    /// An operation is running; `label` is shown to the user
    InFlight { label: String },
}

impl Activity {
    pub fn is_busy(&self) -> bool {
        matches!(self, Activity::InFlight { .. })
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Activity::Idle => None,
            Activity::InFlight { label } => Some(label),
        }
    }
}

/// The most recent failed request
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&EditorError> for Failure {
    fn from(err: &EditorError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EditorState {
    pub document: Option<Document>,
    /// Always one entry per page of `document`
    pub thumbnails: Arc<[PageThumbnail]>,
    pub activity: Activity,
    /// Page chosen for filters and text
    pub selection: Option<usize>,
    pub last_failure: Option<Failure>,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            document: None,
            thumbnails: Arc::from(Vec::new()),
            activity: Activity::Idle,
            selection: None,
            last_failure: None,
        }
    }
}

impl EditorState {
    pub fn page_count(&self) -> usize {
        self.document.as_ref().map_or(0, Document::page_count)
    }

    pub fn is_busy(&self) -> bool {
        self.activity.is_busy()
    }
}

/// Write side of the state, owned by the dispatcher
pub(crate) struct StateHolder {
    tx: watch::Sender<EditorState>,
}

impl StateHolder {
    pub(crate) fn new() -> (Self, watch::Receiver<EditorState>) {
        let (tx, rx) = watch::channel(EditorState::default());
        (Self { tx }, rx)
    }

    pub(crate) fn current(&self) -> Option<Document> {
        self.tx.borrow().document.clone()
    }

    pub(crate) fn selection(&self) -> Option<usize> {
        self.tx.borrow().selection
    }

    pub(crate) fn begin(&self, label: &str) {
        self.tx.send_modify(|state| {
            state.activity = Activity::InFlight {
                label: label.to_string(),
            }
        });
    }

    pub(crate) fn finish(&self) {
        self.tx.send_modify(|state| state.activity = Activity::Idle);
    }

    /// Install a new document together with its thumbnails. The selection
    /// is cleared for a fresh upload or when it no longer points at a page.
    pub(crate) fn replace(
        &self,
        document: Document,
        thumbnails: Vec<PageThumbnail>,
        keep_selection: bool,
    ) {
        self.tx.send_modify(|state| {
            if !keep_selection
                || state
                    .selection
                    .is_some_and(|page| page >= document.page_count())
            {
                state.selection = None;
            }
            state.document = Some(document);
            state.thumbnails = thumbnails.into();
            state.activity = Activity::Idle;
            state.last_failure = None;
        });
    }

    pub(crate) fn select(&self, page: Option<usize>) {
        self.tx.send_modify(|state| state.selection = page);
    }

    pub(crate) fn fail(&self, err: &EditorError) {
        self.tx.send_modify(|state| {
            state.activity = Activity::Idle;
            state.last_failure = Some(Failure::from(err));
        });
    }
}
