use crate::document::DocumentId;
use pdfedit_core::PdfEditError;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EditorError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Page index {index} is out of range (document has {page_count} pages)")]
    IndexOutOfRange { index: usize, page_count: usize },

    #[error("PDF engine failed: {0}")]
    Engine(String),

    #[error("No document is loaded")]
    NoDocument,

    #[error("Document {expected} was replaced by {current} before the request ran")]
    StaleDocument {
        expected: DocumentId,
        current: DocumentId,
    },

    #[error("Another operation is in flight")]
    Busy,

    #[error("Engine call timed out after {0} ms")]
    Timeout(u64),

    #[error("Editor session has shut down")]
    SessionClosed,
}

/// Coarse category shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Parse,
    IndexOutOfRange,
    EngineFailure,
    Precondition,
    Concurrency,
}

impl EditorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EditorError::Parse(_) => ErrorKind::Parse,
            EditorError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            EditorError::Engine(_) | EditorError::Timeout(_) => ErrorKind::EngineFailure,
            EditorError::NoDocument => ErrorKind::Precondition,
            EditorError::StaleDocument { .. } | EditorError::Busy | EditorError::SessionClosed => {
                ErrorKind::Concurrency
            }
        }
    }
}

impl From<PdfEditError> for EditorError {
    fn from(err: PdfEditError) -> Self {
        match err {
            PdfEditError::ParseError(msg) => EditorError::Parse(msg),
            PdfEditError::PageOutOfRange { index, page_count } => {
                EditorError::IndexOutOfRange { index, page_count }
            }
            other => EditorError::Engine(other.to_string()),
        }
    }
}
