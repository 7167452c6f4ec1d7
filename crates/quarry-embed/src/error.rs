//! Error types for embedding backends.

/// Errors produced by an [`Embedder`](crate::Embedder) implementation.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// The backend could not be reached or failed mid-request.
    #[error("embedding backend error: {0}")]
    Backend(String),

    /// The backend exists but cannot serve embeddings (missing model, no
    /// device, unsupported operation).
    #[error("embedding backend unavailable: {0}")]
    Unavailable(String),

    /// The backend returned an empty vector.
    #[error("empty embedding returned by {model}")]
    Empty { model: String },
}

/// Result type alias using [`EmbedError`].
pub type Result<T> = std::result::Result<T, EmbedError>;
