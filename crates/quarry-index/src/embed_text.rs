//! Contextualized embedding text.
//!
//! Embedding raw chunk content alone gives poor retrieval for conceptual
//! queries; prepending the source path, language, and structural unit
//! noticeably improves results. The stored chunk content is untouched.

use crate::chunk::ChunkRecord;

/// Text handed to the embedding backend for a chunk (not for display).
#[must_use]
pub(crate) fn embedding_text(chunk: &ChunkRecord) -> String {
    let mut text = String::with_capacity(chunk.content.len() + 96);
    text.push_str("# ");
    text.push_str(&chunk.metadata.source);
    text.push('\n');
    text.push_str("# Language: ");
    text.push_str(&chunk.metadata.kind);
    text.push('\n');
    text.push_str("# Unit: ");
    text.push_str(&chunk.metadata.unit);
    text.push('\n');
    text.push_str(&chunk.content);
    text
}
