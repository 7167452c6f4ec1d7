//! Sparse TF-IDF lexical index with cosine-similarity query.
//!
//! `rebuild` re-vectorizes the whole corpus; incremental insert is not
//! supported. That keeps vocabulary, idf weights, and document vectors
//! consistent at the cost of O(corpus) work per indexing pass — a known
//! limitation, not a bug.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::chunk::{ChunkRecord, SearchHit};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LexicalIndex {
    chunks: Vec<ChunkRecord>,
    vocabulary: HashMap<String, u32>,
    idf: Vec<f32>,
    /// One L2-normalized sparse vector per chunk, term ids ascending.
    vectors: Vec<Vec<(u32, f32)>>,
}

impl LexicalIndex {
    /// Rebuild the whole index from `corpus`. Corpus order defines both
    /// vocabulary ids and the stable tie-break order for queries.
    pub fn rebuild(&mut self, corpus: Vec<ChunkRecord>) {
        let docs: Vec<Vec<String>> = corpus.iter().map(|c| tokenize(&c.content)).collect();

        let mut vocabulary: HashMap<String, u32> = HashMap::new();
        let mut df: Vec<f32> = Vec::new();
        for tokens in &docs {
            let mut seen: HashSet<&str> = HashSet::new();
            for token in tokens {
                if seen.insert(token) {
                    let next_id = u32::try_from(vocabulary.len()).unwrap_or(u32::MAX);
                    let id = *vocabulary.entry(token.clone()).or_insert(next_id);
                    if id as usize == df.len() {
                        df.push(0.0);
                    }
                    df[id as usize] += 1.0;
                }
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let doc_count = docs.len() as f32;
        let idf: Vec<f32> = df
            .iter()
            .map(|d| ((1.0 + doc_count) / (1.0 + d)).ln() + 1.0)
            .collect();

        let vectors = docs
            .iter()
            .map(|tokens| {
                let mut counts: HashMap<u32, f32> = HashMap::new();
                for token in tokens {
                    if let Some(&id) = vocabulary.get(token) {
                        *counts.entry(id).or_insert(0.0) += 1.0;
                    }
                }
                #[allow(clippy::cast_precision_loss)]
                let total = tokens.len().max(1) as f32;
                let mut vector: Vec<(u32, f32)> = counts
                    .into_iter()
                    .map(|(id, count)| (id, (count / total) * idf[id as usize]))
                    .collect();
                vector.sort_unstable_by_key(|(id, _)| *id);
                normalize(&mut vector);
                vector
            })
            .collect();

        self.chunks = corpus;
        self.vocabulary = vocabulary;
        self.idf = idf;
        self.vectors = vectors;
    }

    /// Top-K chunks by cosine similarity to `text` in the corpus term space.
    ///
    /// Scores are in `[0, 1]`; ties keep corpus order (stable sort), so
    /// identical corpora give identical result lists across runs.
    #[must_use]
    pub fn query(&self, text: &str, top_k: usize) -> Vec<SearchHit> {
        if top_k == 0 || self.chunks.is_empty() {
            return Vec::new();
        }

        let tokens = tokenize(text);
        let mut counts: HashMap<u32, f32> = HashMap::new();
        for token in &tokens {
            if let Some(&id) = self.vocabulary.get(token) {
                *counts.entry(id).or_insert(0.0) += 1.0;
            }
        }
        if counts.is_empty() {
            return Vec::new();
        }

        #[allow(clippy::cast_precision_loss)]
        let total = tokens.len().max(1) as f32;
        let mut query_vector: Vec<(u32, f32)> = counts
            .into_iter()
            .map(|(id, count)| (id, (count / total) * self.idf[id as usize]))
            .collect();
        query_vector.sort_unstable_by_key(|(id, _)| *id);
        normalize(&mut query_vector);

        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .enumerate()
            .filter_map(|(i, doc_vector)| {
                let score = sparse_dot(&query_vector, doc_vector);
                if score > 0.0 {
                    let chunk = &self.chunks[i];
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
        hits
    }

    /// The chunk corpus this index was built from, in corpus order.
    #[must_use]
    pub fn chunks(&self) -> &[ChunkRecord] {
        &self.chunks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[must_use]
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| t.len() >= 2)
        .map(str::to_lowercase)
        .collect()
}

fn normalize(vector: &mut [(u32, f32)]) {
    let norm = vector.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    if norm > 0.0 {
        for (_, w) in vector.iter_mut() {
            *w /= norm;
        }
    }
}

fn sparse_dot(a: &[(u32, f32)], b: &[(u32, f32)]) -> f32 {
    let mut dot = 0.0;
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot
}
