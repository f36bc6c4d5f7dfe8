use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedRefError {
    #[error("invalid DOI: {0}")]
    InvalidDoi(String),

    #[error("invalid arXiv ID: {0}")]
    InvalidArxivId(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {0}: {1}")]
    ApiError(String, String),

    #[error("parse error: {0}")]
    Parse(String),

    /// An identifier-scoped lookup returned more than one record where the
    /// service contract guarantees at most one. Fatal for the document.
    #[error("protocol violation from {0}: identifier query returned {1} records")]
    ProtocolViolation(String, usize),

    #[error("page text extraction failed for {path}: {message}")]
    PageText { path: String, message: String },

    #[error("metadata write-back failed for {path}: {message}")]
    WriteBack { path: String, message: String },

    #[error("batch file error for '{path}': {message}")]
    BatchFile { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, EmbedRefError>;
