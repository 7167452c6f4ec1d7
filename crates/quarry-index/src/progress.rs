//! Progress events emitted during an indexing pass.

use serde::Serialize;

/// Phases of an indexing pass, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexPhase {
    Scan,
    Chunk,
    Embed,
    Persist,
}

impl std::fmt::Display for IndexPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Scan => "scan",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// A status event streamed to the caller during `index`.
#[derive(Debug, Clone, Serialize)]
pub enum IndexEvent {
    /// Phase heartbeat: processed/total counts plus a human-readable message.
    Progress {
        phase: IndexPhase,
        processed: usize,
        total: usize,
        message: String,
    },
    /// Terminal event carrying the pass summary.
    Done(IndexReport),
}

impl IndexEvent {
    pub(crate) fn progress(
        phase: IndexPhase,
        processed: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Progress {
            phase,
            processed,
            total,
            message: message.into(),
        }
    }
}

/// Summary of one indexing pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct IndexReport {
    /// Supported files examined by the scanner, including skipped ones.
    pub files_seen: usize,
    pub files_changed: usize,
    pub files_deleted: usize,
    pub files_skipped: usize,
    /// Chunks in the index after the pass.
    pub chunk_count: usize,
    /// Chunks newly embedded during this pass.
    pub chunks_embedded: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}
