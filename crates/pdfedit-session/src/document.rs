//! The document snapshot held by a session

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Generation number of an adopted document. Every successful mutation
/// adopts a new document with a larger id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocumentId(u64);

impl DocumentId {
    pub(crate) fn first() -> Self {
        DocumentId(1)
    }

    pub(crate) fn next(self) -> Self {
        DocumentId(self.0 + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immutable PDF snapshot. Replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: DocumentId,
    name: String,
    bytes: Arc<[u8]>,
    page_count: usize,
}

impl Document {
    pub(crate) fn new(id: DocumentId, name: String, bytes: Arc<[u8]>, page_count: usize) -> Self {
        Self {
            id,
            name,
            bytes,
            page_count,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Name of the original upload
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn export_name(&self) -> String {
        format!("edited_{}", self.name)
    }
}
