use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PdfEditError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Page index {index} is out of range (document has {page_count} pages)")]
    PageOutOfRange { index: usize, page_count: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}
