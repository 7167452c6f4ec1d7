//! Retrieval engine facade: capability detection, pass lifecycle, queries.
//!
//! One engine instance owns one project's index state. Indexing runs as a
//! phased pass (scan, chunk, embed, persist) behind a reentrancy guard;
//! queries read whatever state is currently live and only contend with the
//! final swap of a pass. The hash table is persisted last so a crash
//! mid-pass forces a safe re-scan instead of silently omitting files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use quarry_embed::Embedder;

use crate::chunk::{ChunkRecord, SearchHit};
use crate::chunker::Chunker;
use crate::config::EngineConfig;
use crate::error::{IndexError, Result};
use crate::fuse;
use crate::languages::{FileKind, detect_kind};
use crate::lexical::LexicalIndex;
use crate::persist;
use crate::progress::{IndexEvent, IndexPhase, IndexReport};
use crate::scanner;
use crate::store::DocumentStore;
use crate::vector::{VectorIndex, VectorState};

const FILES_STATE: &str = "files.json";
const LEXICAL_STATE: &str = "lexical.json";
const VECTORS_STATE: &str = "vectors.json";

/// Retrieval capabilities fixed at engine construction.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Capabilities {
    pub lexical: bool,
    pub vector: bool,
}

/// Corpus and index counts.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EngineStats {
    pub files: usize,
    pub chunks: usize,
    pub vocabulary_terms: usize,
    pub embedded_chunks: usize,
}

struct EngineState {
    hash_table: BTreeMap<String, String>,
    store: DocumentStore,
    lexical: LexicalIndex,
    vector: Option<VectorIndex>,
}

/// The engine's only public surface: indexing with streamed progress, and
/// synchronous-feeling queries against the live index.
pub struct Engine {
    root: PathBuf,
    config: EngineConfig,
    state_dir: PathBuf,
    capabilities: Capabilities,
    chunker: Chunker,
    state: RwLock<EngineState>,
    pass_guard: Mutex<()>,
}

impl Engine {
    /// Open (or create) the index for `root`, loading any persisted state.
    ///
    /// The embedding capability is probed exactly once here: a missing or
    /// failing backend disables the vector index for this engine's lifetime
    /// and everything else proceeds lexical-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be created. Corrupt
    /// persisted state is not an error; it degrades to an empty index and a
    /// full re-scan on the next pass.
    pub async fn open(
        root: impl Into<PathBuf>,
        config: EngineConfig,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Result<Self> {
        let root = root.into();
        let state_dir = config.state_dir.join(project_key(&root));
        tokio::fs::create_dir_all(&state_dir).await?;

        // Without a chunk corpus the hash table must not claim anything is
        // indexed, so a missing/corrupt lexical file empties both.
        let (lexical, hash_table) =
            match persist::load_json::<LexicalIndex>(&state_dir.join(LEXICAL_STATE)) {
                Some(lexical) => {
                    let table = persist::load_json(&state_dir.join(FILES_STATE)).unwrap_or_default();
                    (lexical, table)
                }
                None => (LexicalIndex::default(), BTreeMap::new()),
            };
        let store = DocumentStore::from_chunks(lexical.chunks().iter().cloned());

        let vector = match embedder {
            Some(embedder) => match quarry_embed::probe_dimensions(embedder.as_ref()).await {
                Ok(dimensions) => {
                    tracing::info!(
                        model = embedder.model_id(),
                        dimensions,
                        "vector capability active"
                    );
                    let cached = persist::load_json::<VectorState>(&state_dir.join(VECTORS_STATE))
                        .unwrap_or_default();
                    Some(VectorIndex::new(embedder, cached))
                }
                Err(e) => {
                    tracing::warn!("embedding backend unavailable, running lexical-only: {e}");
                    None
                }
            },
            None => None,
        };

        let capabilities = Capabilities {
            lexical: true,
            vector: vector.is_some(),
        };
        tracing::debug!(
            root = %root.display(),
            chunks = store.chunk_count(),
            vector = capabilities.vector,
            "engine opened"
        );

        Ok(Self {
            chunker: Chunker::new(config.chunking.clone()),
            state: RwLock::new(EngineState {
                hash_table,
                store,
                lexical,
                vector,
            }),
            root,
            config,
            state_dir,
            capabilities,
            pass_guard: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Run an indexing pass without progress reporting.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::PassInProgress`] if a pass is already running,
    /// or an error if persisting state fails.
    pub async fn index(&self, force_full: bool) -> Result<IndexReport> {
        self.run_pass(force_full, None, &CancellationToken::new())
            .await
    }

    /// Run an indexing pass, emitting [`IndexEvent`]s on `events` and
    /// honoring `cancel` between file-level units of work. A cancelled pass
    /// persists nothing.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::index`], plus [`IndexError::Cancelled`].
    pub async fn index_with_events(
        &self,
        force_full: bool,
        events: mpsc::Sender<IndexEvent>,
        cancel: &CancellationToken,
    ) -> Result<IndexReport> {
        self.run_pass(force_full, Some(events), cancel).await
    }

    /// Spawn an indexing pass and return its progress events as a stream.
    /// The terminal [`IndexEvent::Done`] carries the summary report.
    #[must_use]
    pub fn index_stream(self: Arc<Self>, force_full: bool) -> ReceiverStream<IndexEvent> {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            let cancel = CancellationToken::new();
            if let Err(e) = self.run_pass(force_full, Some(tx), &cancel).await {
                tracing::warn!("indexing pass failed: {e}");
            }
        });
        ReceiverStream::new(rx)
    }

    #[allow(clippy::too_many_lines)]
    async fn run_pass(
        &self,
        force_full: bool,
        events: Option<mpsc::Sender<IndexEvent>>,
        cancel: &CancellationToken,
    ) -> Result<IndexReport> {
        let _guard = self
            .pass_guard
            .try_lock()
            .map_err(|_| IndexError::PassInProgress)?;
        let started = Instant::now();
        let events = events.as_ref();
        let mut report = IndexReport::default();

        // Work on a snapshot; queries keep serving the previous state until
        // the swap at the end of the pass.
        let (mut hash_table, mut store, mut vector) = {
            let state = self.state.read().await;
            (
                state.hash_table.clone(),
                state.store.clone(),
                state.vector.clone(),
            )
        };

        emit(
            events,
            IndexEvent::progress(
                IndexPhase::Scan,
                0,
                0,
                format!("scanning {}", self.root.display()),
            ),
        )
        .await;
        let outcome = scanner::scan(&self.root, &self.config.scan, &hash_table, force_full)?;
        report.files_seen = outcome.files_seen;
        report.files_changed = outcome.changed.len();
        report.files_deleted = outcome.deleted.len();
        report.files_skipped = outcome.skipped.len();

        for skipped in &outcome.skipped {
            tracing::warn!(path = %skipped.path, "skipping file: {}", skipped.reason);
            emit(
                events,
                IndexEvent::progress(
                    IndexPhase::Scan,
                    0,
                    0,
                    format!("skipped {}: {}", skipped.path, skipped.reason),
                ),
            )
            .await;
        }
        emit(
            events,
            IndexEvent::progress(
                IndexPhase::Scan,
                outcome.files_seen,
                outcome.files_seen,
                format!(
                    "{} changed, {} deleted, {} skipped",
                    outcome.changed.len(),
                    outcome.deleted.len(),
                    outcome.skipped.len()
                ),
            ),
        )
        .await;

        let total = outcome.changed.len();
        for (i, changed) in outcome.changed.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(IndexError::Cancelled);
            }
            let content = match tokio::fs::read_to_string(self.root.join(&changed.path)).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(path = %changed.path, "failed to read changed file: {e}");
                    report.errors.push(format!("{}: {e}", changed.path));
                    continue;
                }
            };
            let kind = detect_kind(Path::new(&changed.path)).unwrap_or(FileKind::Text);
            let records = self.chunker.chunk(&content, &changed.path, kind, &changed.hash);
            store.replace_file(&changed.path, records);
            hash_table.insert(changed.path.clone(), changed.hash.clone());
            emit(
                events,
                IndexEvent::progress(IndexPhase::Chunk, i + 1, total, changed.path.clone()),
            )
            .await;
        }
        for deleted in &outcome.deleted {
            let removed = store.remove_file(deleted);
            hash_table.remove(deleted);
            tracing::debug!(path = %deleted, removed, "dropped chunks for deleted file");
        }

        // Wholesale rebuild: O(corpus) per pass regardless of how few files
        // changed. See the module docs in `lexical`.
        let corpus: Vec<ChunkRecord> = store.all_chunks().cloned().collect();
        let mut lexical = LexicalIndex::default();
        lexical.rebuild(corpus);
        report.chunk_count = lexical.len();

        if let Some(vector) = vector.as_mut() {
            let mut pending: Vec<&ChunkRecord> = Vec::new();
            let mut seen: std::collections::HashSet<&str> = std::collections::HashSet::new();
            for chunk in lexical.chunks() {
                if !vector.contains(&chunk.id) && seen.insert(chunk.id.as_str()) {
                    pending.push(chunk);
                }
            }
            let total = pending.len();
            for (i, chunk) in pending.iter().enumerate() {
                if cancel.is_cancelled() {
                    return Err(IndexError::Cancelled);
                }
                match vector.embed_chunk(chunk).await {
                    Ok(()) => report.chunks_embedded += 1,
                    Err(e) => {
                        tracing::warn!(chunk = %chunk.metadata.summary, "embedding failed: {e}");
                        report.errors.push(format!("embed {}: {e}", chunk.metadata.summary));
                    }
                }
                emit(
                    events,
                    IndexEvent::progress(IndexPhase::Embed, i + 1, total, chunk.metadata.summary.clone()),
                )
                .await;
            }
            let pruned = vector.prune(lexical.chunks());
            tracing::debug!(embedded = report.chunks_embedded, pruned, "vector sync complete");
        }

        emit(
            events,
            IndexEvent::progress(IndexPhase::Persist, 0, 0, "persisting index state"),
        )
        .await;
        self.persist_and_swap(hash_table, store, lexical, vector).await?;

        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            changed = report.files_changed,
            deleted = report.files_deleted,
            chunks = report.chunk_count,
            duration_ms = report.duration_ms,
            "indexing pass complete"
        );
        emit(events, IndexEvent::Done(report.clone())).await;
        Ok(report)
    }

    /// Persist the new state (hash table last) and swap it in for readers.
    async fn persist_and_swap(
        &self,
        hash_table: BTreeMap<String, String>,
        store: DocumentStore,
        lexical: LexicalIndex,
        vector: Option<VectorIndex>,
    ) -> Result<()> {
        persist::save_json(&self.state_dir.join(LEXICAL_STATE), &lexical)?;
        if let Some(vector) = &vector {
            persist::save_json(&self.state_dir.join(VECTORS_STATE), vector.state())?;
        }
        persist::save_json(&self.state_dir.join(FILES_STATE), &hash_table)?;

        let mut state = self.state.write().await;
        state.hash_table = hash_table;
        state.store = store;
        state.lexical = lexical;
        state.vector = vector;
        Ok(())
    }

    /// Hybrid retrieval: lexical and (when available) vector rankings fused
    /// with RRF. Bounded CPU cost against the loaded state; a transient
    /// vector-query failure degrades to lexical-only with a log trail.
    ///
    /// # Errors
    ///
    /// Currently infallible at runtime; the `Result` covers future backends.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let state = self.state.read().await;
        let fetch = top_k.saturating_mul(self.config.retrieval.candidate_factor.max(1));

        let lexical_hits = state.lexical.query(query, fetch);
        let vector_hits = match &state.vector {
            Some(vector) => match vector.query(query, fetch, state.lexical.chunks()).await {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::warn!("vector query failed, serving lexical-only results: {e}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        Ok(fuse::fuse(
            lexical_hits,
            vector_hits,
            self.config.retrieval.rrf_alpha,
            top_k,
        ))
    }

    /// Ingest one named document that does not live in the tree walk (chat
    /// transcripts, generated notes). Idempotent for unchanged content.
    /// Returns the number of chunks produced.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::PassInProgress`] if an indexing pass is
    /// running, or an error if persisting state fails.
    pub async fn add_single(&self, name: &str, content: &str) -> Result<usize> {
        let _guard = self
            .pass_guard
            .try_lock()
            .map_err(|_| IndexError::PassInProgress)?;
        let hash = blake3::hash(content.as_bytes()).to_hex().to_string();

        let (mut hash_table, mut store, mut vector) = {
            let state = self.state.read().await;
            if state.hash_table.get(name) == Some(&hash) {
                return Ok(0);
            }
            (
                state.hash_table.clone(),
                state.store.clone(),
                state.vector.clone(),
            )
        };

        let kind = detect_kind(Path::new(name)).unwrap_or(FileKind::Text);
        let records = self.chunker.chunk(content, name, kind, &hash);
        let added = records.len();
        store.replace_file(name, records);
        hash_table.insert(name.to_string(), hash);

        let mut lexical = LexicalIndex::default();
        lexical.rebuild(store.all_chunks().cloned().collect());

        if let Some(vector) = vector.as_mut() {
            for chunk in lexical.chunks() {
                if vector.contains(&chunk.id) {
                    continue;
                }
                if let Err(e) = vector.embed_chunk(chunk).await {
                    tracing::warn!(chunk = %chunk.metadata.summary, "embedding failed: {e}");
                }
            }
            vector.prune(lexical.chunks());
        }

        self.persist_and_swap(hash_table, store, lexical, vector).await?;
        tracing::debug!(name, added, "single document ingested");
        Ok(added)
    }

    /// Current corpus and index counts.
    pub async fn stats(&self) -> EngineStats {
        let state = self.state.read().await;
        EngineStats {
            files: state.store.file_count(),
            chunks: state.store.chunk_count(),
            vocabulary_terms: state.lexical.vocabulary_len(),
            embedded_chunks: state.vector.as_ref().map_or(0, VectorIndex::len),
        }
    }

    /// Drop all in-memory and persisted state for this project.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::PassInProgress`] if an indexing pass is
    /// running, or an error if removing state files fails.
    pub async fn reset(&self) -> Result<()> {
        let _guard = self
            .pass_guard
            .try_lock()
            .map_err(|_| IndexError::PassInProgress)?;

        let mut state = self.state.write().await;
        state.hash_table.clear();
        state.store = DocumentStore::new();
        state.lexical = LexicalIndex::default();
        if let Some(vector) = state.vector.as_mut() {
            vector.clear();
        }
        drop(state);

        for file in [FILES_STATE, LEXICAL_STATE, VECTORS_STATE] {
            match tokio::fs::remove_file(self.state_dir.join(file)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        tracing::info!(root = %self.root.display(), "index state reset");
        Ok(())
    }
}

async fn emit(events: Option<&mpsc::Sender<IndexEvent>>, event: IndexEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}

/// Per-project state directory key: hash of the root path, so multiple
/// projects never collide under one `state_dir`.
fn project_key(root: &Path) -> String {
    let hex = blake3::hash(root.to_string_lossy().as_bytes()).to_hex();
    hex[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_keys_differ_per_root() {
        let a = project_key(Path::new("/tmp/project-a"));
        let b = project_key(Path::new("/tmp/project-b"));
        assert_ne!(a, b);
        assert_eq!(a.len(), 16);
        assert_eq!(a, project_key(Path::new("/tmp/project-a")));
    }

    #[tokio::test]
    async fn open_without_embedder_is_lexical_only() {
        let root = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            state_dir: state.path().to_path_buf(),
            ..EngineConfig::default()
        };
        let engine = Engine::open(root.path(), config, None).await.unwrap();
        assert!(engine.capabilities().lexical);
        assert!(!engine.capabilities().vector);
    }

    #[tokio::test]
    async fn failing_backend_degrades_to_lexical_only() {
        let root = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            state_dir: state.path().to_path_buf(),
            ..EngineConfig::default()
        };
        let embedder: Arc<dyn Embedder> = Arc::new(quarry_embed::MockEmbedder::failing());
        let engine = Engine::open(root.path(), config, Some(embedder)).await.unwrap();
        assert!(!engine.capabilities().vector);
    }

    #[tokio::test]
    async fn stats_start_empty() {
        let root = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            state_dir: state.path().to_path_buf(),
            ..EngineConfig::default()
        };
        let engine = Engine::open(root.path(), config, None).await.unwrap();
        let stats = engine.stats().await;
        assert_eq!(stats.files, 0);
        assert_eq!(stats.chunks, 0);
    }
}
