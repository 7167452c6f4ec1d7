//! Chunk records: the canonical retrieval unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One retrievable unit of text derived from a source file.
///
/// `id` is the blake3 hash of `content` as stored (after overlap injection),
/// so identical content always yields the same id across files and reindex
/// runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Metadata attached to every chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source file path, relative to the indexed root.
    pub source: String,
    /// File type tag ([`FileKind::id`](crate::languages::FileKind::id)).
    pub kind: String,
    /// Structural tag: `function`, `class`, `section`, `text`, or `code`.
    pub unit: String,
    /// Position of this chunk within its file.
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// 1-based inclusive line span in the source file.
    pub line_range: (usize, usize),
    /// Short human-readable header for display.
    pub summary: String,
    /// blake3 hash of the whole owning file's content.
    pub file_hash: String,
    pub indexed_at: DateTime<Utc>,
}

/// A scored retrieval result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Similarity in `[0, 1]` from a single index, or a fused RRF score.
    pub score: f32,
}

impl SearchHit {
    /// Complement of the similarity score some callers want.
    #[must_use]
    pub fn distance(&self) -> f32 {
        1.0 - self.score
    }
}

/// Deterministic content-addressed chunk id.
#[must_use]
pub fn content_id(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}
