//! Optional dense vector index backed by an embedding backend.
//!
//! Only constructed when the engine's capability probe succeeds; absence is
//! a configuration, not an error path. Cached vectors are keyed by chunk id
//! and tagged with the model that produced them, so unchanged chunks are
//! never re-embedded and a model change discards the cache wholesale.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use quarry_embed::Embedder;

use crate::chunk::{ChunkRecord, SearchHit};
use crate::embed_text::embedding_text;
use crate::error::Result;

/// Persisted dense vectors, keyed by chunk id.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct VectorState {
    pub model: String,
    pub vectors: BTreeMap<String, Vec<f32>>,
}

pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    state: VectorState,
}

impl Clone for VectorIndex {
    fn clone(&self) -> Self {
        Self {
            embedder: Arc::clone(&self.embedder),
            state: self.state.clone(),
        }
    }
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("model", &self.state.model)
            .field("vectors", &self.state.vectors.len())
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Wrap an embedding backend around a previously cached state. A cache
    /// produced by a different model is discarded.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, cached: VectorState) -> Self {
        let model = embedder.model_id().to_string();
        let state = if cached.model == model {
            cached
        } else {
            if !cached.vectors.is_empty() {
                tracing::warn!(
                    previous = %cached.model,
                    current = %model,
                    "embedding model changed, discarding cached vectors"
                );
            }
            VectorState {
                model,
                vectors: BTreeMap::new(),
            }
        };
        Self { embedder, state }
    }

    #[must_use]
    pub fn state(&self) -> &VectorState {
        &self.state
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.state.vectors.contains_key(id)
    }

    /// Embed one chunk and cache its vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedding backend fails for this chunk.
    pub async fn embed_chunk(&mut self, chunk: &ChunkRecord) -> Result<()> {
        let vector = self.embedder.embed(&embedding_text(chunk)).await?;
        self.state.vectors.insert(chunk.id.clone(), vector);
        Ok(())
    }

    /// Drop cached vectors whose ids are no longer in the corpus, returning
    /// how many were removed.
    pub fn prune(&mut self, corpus: &[ChunkRecord]) -> usize {
        let live: HashSet<&str> = corpus.iter().map(|c| c.id.as_str()).collect();
        let before = self.state.vectors.len();
        self.state.vectors.retain(|id, _| live.contains(id.as_str()));
        before - self.state.vectors.len()
    }

    /// Cosine query over cached vectors. Payloads resolve from `corpus`,
    /// whose order also breaks score ties deterministically.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding the query text fails.
    pub async fn query(
        &self,
        text: &str,
        top_k: usize,
        corpus: &[ChunkRecord],
    ) -> Result<Vec<SearchHit>> {
        if top_k == 0 || self.state.vectors.is_empty() {
            return Ok(Vec::new());
        }
        let query_vector = self.embedder.embed(text).await?;

        let mut hits: Vec<SearchHit> = corpus
            .iter()
            .filter_map(|chunk| {
                let vector = self.state.vectors.get(&chunk.id)?;
                let score = cosine_similarity(&query_vector, vector);
                if score > 0.0 {
                    Some(SearchHit {
                        id: chunk.id.clone(),
                        content: chunk.content.clone(),
                        metadata: chunk.metadata.clone(),
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.vectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.vectors.is_empty()
    }

    pub fn clear(&mut self) {
        self.state.vectors.clear();
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
