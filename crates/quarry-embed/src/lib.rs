//! Embedding backend boundary for the quarry retrieval engine.
//!
//! The engine never talks to a concrete model runtime; it holds a
//! `dyn Embedder` and treats absence of one as a capability it can run
//! without. Implementations live out-of-tree (or in tests via the
//! feature-gated [`MockEmbedder`]).

use std::future::Future;
use std::pin::Pin;

pub mod error;
#[cfg(feature = "mock")]
pub mod mock;

pub use error::{EmbedError, Result};
#[cfg(feature = "mock")]
pub use mock::MockEmbedder;

/// Boxed future returned by [`Embedder`] methods, keeping the trait dyn-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A dense-embedding backend.
///
/// Implementations must return vectors of a fixed dimensionality for the
/// lifetime of the instance; callers probe the dimensionality once via
/// [`probe_dimensions`].
pub trait Embedder: Send + Sync {
    /// Embed a single text into a dense vector.
    fn embed(&self, text: &str) -> BoxFuture<'_, Result<Vec<f32>>>;

    /// Stable identifier of the underlying model. Persisted embedding caches
    /// are keyed by this value, so it must change whenever the vector space
    /// changes.
    fn model_id(&self) -> &str;
}

/// Embed a short probe text to learn the backend's vector dimensionality.
///
/// # Errors
///
/// Returns an error if the backend fails or returns an empty vector.
pub async fn probe_dimensions(embedder: &dyn Embedder) -> Result<usize> {
    let probe = embedder.embed("probe").await?;
    if probe.is_empty() {
        return Err(EmbedError::Empty {
            model: embedder.model_id().to_string(),
        });
    }
    Ok(probe.len())
}
