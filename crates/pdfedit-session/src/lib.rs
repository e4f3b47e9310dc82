//! Editing session over one in-memory PDF
//!
//! An [`EditorSession`] owns the current document and its thumbnails and
//! funnels every mutation through a single dispatcher task, so operations
//! apply one at a time against the document they were issued for.
//!
//! ```no_run
//! use pdfedit_session::{EditorConfig, EditorSession};
//!
//! # async fn example(bytes: Vec<u8>) -> pdfedit_session::Result<()> {
//! let session = EditorSession::new(&EditorConfig::default());
//! session.load("report.pdf", bytes).await?;
//! session.delete_page(1).await?;
//! let export = session.export()?;
//! assert_eq!(export.file_name, "edited_report.pdf");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod projector;
pub mod session;
pub mod state;

pub use config::{EditorConfig, OnBusy};
pub use document::{Document, DocumentId};
pub use engine::{LopdfEngine, PdfEngine};
pub use error::{EditorError, ErrorKind, Result};
pub use projector::ThumbnailProjector;
pub use session::{EditorSession, Export, Outcome};
pub use state::{Activity, EditorState, Failure};

// Engine parameter types, so callers need only this crate
pub use pdfedit_core::{
    BorderConfig, BorderStyle, Metadata, PageFilter, PageThumbnail, PdfInfo, TextConfig,
    TextStyle, Tint,
};
