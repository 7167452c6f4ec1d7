//! Test-only deterministic embedder.

use crate::error::{EmbedError, Result};
use crate::{BoxFuture, Embedder};

/// Deterministic bag-of-words embedder for tests.
///
/// Each lowercase token is hashed into one of `dimensions` buckets and the
/// resulting count vector is L2-normalized, so texts sharing vocabulary get
/// high cosine similarity without any model runtime.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
    fail: bool,
}

impl MockEmbedder {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fail: false,
        }
    }

    /// An embedder whose every call fails, for exercising degraded paths.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            dimensions: 0,
            fail: true,
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = blake3::hash(token.to_lowercase().as_bytes());
            let bucket = (usize::from(hash.as_bytes()[0]) << 8) | usize::from(hash.as_bytes()[1]);
            vector[bucket % self.dimensions] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> BoxFuture<'_, Result<Vec<f32>>> {
        let result = if self.fail {
            Err(EmbedError::Unavailable("mock backend disabled".to_string()))
        } else {
            Ok(self.vectorize(text))
        };
        Box::pin(async move { result })
    }

    fn model_id(&self) -> &str {
        "mock-bow"
    }
}
