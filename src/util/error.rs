//! Error types for the meshport pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for import/export operations.
///
/// These are the fatal conditions. Non-fatal diagnostics (skipped tokens,
/// missing optional data) are reported as [`crate::import::ImportIssue`]
/// records instead of errors.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A named buffer is missing from the file list
    #[error("No file named {0:?} in the file list")]
    BufferNotFound(String),

    /// A sibling reference could not be resolved to a file-list entry
    #[error("Cannot resolve {relative:?} relative to {base:?}")]
    Unresolvable { base: String, relative: String },

    /// No decoder matched the input
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    /// Extension and content sniff disagree without a clear winner
    #[error("Ambiguous format: {0}")]
    AmbiguousFormat(String),

    /// Input is truncated or a read ran past the end of the buffer
    #[error("Unexpected end of data at offset {0}")]
    UnexpectedEof(u64),

    /// Malformed binary data at a known offset
    #[error("Parse error at offset {offset}: {message}")]
    ParseBinary { offset: u64, message: String },

    /// Malformed text data at a known line
    #[error("Parse error at line {line}: {message}")]
    ParseText { line: usize, message: String },

    /// A mandatory sibling resource is missing or broken
    #[error("Sibling resource {name:?} unavailable: {message}")]
    SiblingResource { name: String, message: String },

    /// Dangling index found at validate time
    #[error("Referential integrity: {0}")]
    ReferentialIntegrity(String),

    /// Export produced an internal error; partial output is discarded
    #[error("Export failed: {0}")]
    ExportFailed(String),

    /// A `wait_while` poll expired
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// A runner task panicked before producing a result
    #[error("Task {0} panicked")]
    TaskPanicked(usize),

    /// A batch task was cancelled before it started
    #[error("Task cancelled before start")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// JSON error (glTF documents)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create a binary parse error at the given offset.
    pub fn parse_at(offset: u64, msg: impl Into<String>) -> Self {
        Self::ParseBinary { offset, message: msg.into() }
    }

    /// Create a text parse error at the given 1-based line.
    pub fn parse_line(line: usize, msg: impl Into<String>) -> Self {
        Self::ParseText { line, message: msg.into() }
    }
}

/// Result type alias for meshport operations.
pub type Result<T> = std::result::Result<T, Error>;
