//! Error types for quarry-index.

/// Errors that can occur during indexing and retrieval operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading source files or persisted state.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding backend error.
    #[error("embedding error: {0}")]
    Embed(#[from] quarry_embed::EmbedError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Structural parsing error.
    #[error("parse failed: {0}")]
    Parse(String),

    /// Another indexing pass holds the reentrancy guard.
    #[error("an indexing pass is already running")]
    PassInProgress,

    /// The pass was cancelled between file-level units of work.
    #[error("indexing pass cancelled")]
    Cancelled,

    /// File watcher error.
    #[error("watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// Generic catch-all error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`IndexError`].
pub type Result<T> = std::result::Result<T, IndexError>;
