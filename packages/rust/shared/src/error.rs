//! Error types for Curricula.
//!
//! Library crates use [`CurriculaError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Curricula operations.
#[derive(Debug, thiserror::Error)]
pub enum CurriculaError {
    /// Configuration loading or validation error, including missing credentials.
    #[error("config error: {message}")]
    Config { message: String },

    /// An expected table never appeared within the readiness timeout.
    #[error("schema not ready: table `{table}` missing after {waited_secs}s")]
    SchemaNotReady { table: String, waited_secs: u64 },

    /// The intermediate document is absent or empty.
    #[error("input missing: {path:?} does not exist or is empty")]
    InputMissing { path: PathBuf },

    /// One program page failed to load or parse.
    #[error("extraction failed for {url}: {message}")]
    Extraction { url: String, message: String },

    /// A failure inside the import transaction. The transaction is rolled back.
    #[error("import transaction failed: {0}")]
    ImportTransaction(String),

    /// Database or storage layer error outside the import transaction.
    #[error("storage error: {0}")]
    Storage(String),

    /// Network/HTTP error while fetching pages.
    #[error("network error: {0}")]
    Network(String),

    /// JSON (de)serialization error for the intermediate document.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CurriculaError>;

impl CurriculaError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a per-program extraction error.
    pub fn extraction(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Extraction {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is local to one program and must not abort a harvest.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Extraction { .. } | Self::Network(_))
    }
}

impl From<serde_json::Error> for CurriculaError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
