//! Canonical chunk-record store, keyed by owning file.
//!
//! Records are never mutated in place: a content change replaces the whole
//! file's chunk list and every new chunk carries a fresh content-addressed
//! id. Path-ordered iteration gives the indexes a deterministic corpus
//! order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chunk::ChunkRecord;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DocumentStore {
    files: BTreeMap<String, Vec<ChunkRecord>>,
}

impl DocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a flat chunk list (used when loading persisted
    /// state, which stores the corpus inside the lexical index).
    #[must_use]
    pub fn from_chunks<I: IntoIterator<Item = ChunkRecord>>(chunks: I) -> Self {
        let mut store = Self::default();
        for chunk in chunks {
            store
                .files
                .entry(chunk.metadata.source.clone())
                .or_default()
                .push(chunk);
        }
        for records in store.files.values_mut() {
            records.sort_by_key(|r| r.metadata.chunk_index);
        }
        store
    }

    /// Replace every chunk belonging to `path`.
    pub fn replace_file(&mut self, path: &str, chunks: Vec<ChunkRecord>) {
        if chunks.is_empty() {
            self.files.remove(path);
        } else {
            self.files.insert(path.to_string(), chunks);
        }
    }

    /// Remove all chunks for `path`, returning how many were dropped.
    pub fn remove_file(&mut self, path: &str) -> usize {
        self.files.remove(path).map_or(0, |chunks| chunks.len())
    }

    /// All chunks in deterministic path order.
    pub fn all_chunks(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.files.values().flatten()
    }

    #[must_use]
    pub fn contains_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
