//! Language-aware chunking with greedy sibling merge and overlap injection.
//!
//! Strategy selection is a static table on [`FileKind`]: tree-sitter for
//! code, heading boundaries for markdown, sentence boundaries for everything
//! else. Structural parse failures fall back to the sentence splitter for
//! that file only.

mod code;
mod markdown;
mod text;

use std::ops::Range;

use chrono::Utc;

use crate::chunk::{ChunkMetadata, ChunkRecord, content_id};
use crate::config::ChunkingConfig;
use crate::languages::{FileKind, SplitClass};

/// A chunk candidate before sizing, merging, and overlap: a byte span into
/// the source plus its structural tag.
pub(crate) struct RawChunk {
    span: Range<usize>,
    unit: &'static str,
    name: Option<String>,
}

/// Splits file content into [`ChunkRecord`]s.
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    #[must_use]
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Chunk one file's content.
    ///
    /// Never fails: structural parse errors degrade to the sentence splitter
    /// with a log trail, and empty content yields no chunks.
    #[must_use]
    pub fn chunk(
        &self,
        source: &str,
        rel_path: &str,
        kind: FileKind,
        file_hash: &str,
    ) -> Vec<ChunkRecord> {
        if source.trim().is_empty() {
            return Vec::new();
        }

        let mut raw = match kind.split_class() {
            SplitClass::Code => match code::split(source, kind) {
                Ok(chunks) if !chunks.is_empty() => chunks,
                Ok(_) => vec![RawChunk {
                    span: 0..source.len(),
                    unit: "code",
                    name: None,
                }],
                Err(e) => {
                    tracing::warn!(
                        path = rel_path,
                        "structural parse failed, using sentence fallback: {e}"
                    );
                    text::split(source, self.config.max_chunk_size)
                }
            },
            SplitClass::Heading => markdown::split(source),
            SplitClass::Sentence => text::split(source, self.config.max_chunk_size),
        };

        raw.retain(|c| !source[c.span.clone()].trim().is_empty());
        merge_small(source, &mut raw, &self.config);
        self.build_records(source, &raw, rel_path, kind, file_hash)
    }

    fn build_records(
        &self,
        source: &str,
        raw: &[RawChunk],
        rel_path: &str,
        kind: FileKind,
        file_hash: &str,
    ) -> Vec<ChunkRecord> {
        let starts = line_starts(source);
        let total = raw.len();
        let now = Utc::now();
        let overlap = self.config.chunk_overlap;
        let mut records = Vec::with_capacity(total);

        for (index, chunk) in raw.iter().enumerate() {
            let body = &source[chunk.span.clone()];

            // Overlap is cosmetic context concatenated into the stored
            // content; it does not count toward size limits.
            let mut content = String::with_capacity(body.len() + overlap * 2);
            if overlap > 0 && index > 0 {
                let tail = tail_chars(source[raw[index - 1].span.clone()].trim_end(), overlap);
                if !tail.is_empty() {
                    content.push_str(tail);
                    content.push('\n');
                }
            }
            content.push_str(body);
            if overlap > 0 && index + 1 < total {
                let head = head_chars(source[raw[index + 1].span.clone()].trim_start(), overlap);
                if !head.is_empty() {
                    content.push('\n');
                    content.push_str(head);
                }
            }

            let line_range = (
                line_at(&starts, chunk.span.start),
                line_at(&starts, chunk.span.end.saturating_sub(1)),
            );
            let label = chunk.name.clone().unwrap_or_else(|| chunk.unit.to_string());
            let summary = format!(
                "{rel_path} :: {label} (lines {}-{})",
                line_range.0, line_range.1
            );

            records.push(ChunkRecord {
                id: content_id(&content),
                content,
                metadata: ChunkMetadata {
                    source: rel_path.to_string(),
                    kind: kind.id().to_string(),
                    unit: chunk.unit.to_string(),
                    chunk_index: index,
                    total_chunks: total,
                    line_range,
                    summary,
                    file_hash: file_hash.to_string(),
                    indexed_at: now,
                },
            });
        }
        records
    }
}

/// Merge adjacent chunks of the same structural tag when either is below the
/// minimum, without exceeding the maximum. A chunk that cannot merge stays
/// separate even if small.
fn merge_small(source: &str, chunks: &mut Vec<RawChunk>, config: &ChunkingConfig) {
    if chunks.len() < 2 {
        return;
    }

    let mut i = 0;
    while i < chunks.len() - 1 {
        let cur_size = non_ws_len(&source[chunks[i].span.clone()]);
        let next_size = non_ws_len(&source[chunks[i + 1].span.clone()]);

        if chunks[i].unit == chunks[i + 1].unit
            && (cur_size < config.min_chunk_size || next_size < config.min_chunk_size)
            && cur_size + next_size <= config.max_chunk_size
        {
            let next = chunks.remove(i + 1);
            let cur = &mut chunks[i];
            cur.span = cur.span.start..next.span.end;
            if cur.name.is_none() {
                cur.name = next.name;
            }
        } else {
            i += 1;
        }
    }
}

pub(crate) fn non_ws_len(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

fn line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in source.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

/// 1-based line number containing `offset`.
fn line_at(starts: &[usize], offset: usize) -> usize {
    starts.partition_point(|s| *s <= offset)
}

fn tail_chars(text: &str, n: usize) -> &str {
    let total = text.chars().count();
    if total <= n {
        return text;
    }
    let mut idx = text.len();
    for (i, (pos, _)) in text.char_indices().enumerate() {
        if i == total - n {
            idx = pos;
            break;
        }
    }
    &text[idx..]
}

fn head_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((pos, _)) => &text[..pos],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(min: usize, max: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkingConfig {
            max_chunk_size: max,
            min_chunk_size: min,
            chunk_overlap: overlap,
        })
    }

    #[test]
    fn empty_content_yields_nothing() {
        let chunks = chunker(20, 1200, 0).chunk("  \n ", "a.rs", FileKind::Rust, "h");
        assert!(chunks.is_empty());
    }

    #[test]
    fn single_function_file_is_one_function_chunk() {
        let mut source = String::from("fn compute() -> u64 {\n");
        for i in 0..38 {
            source.push_str(&format!("    let v{i} = {i};\n"));
        }
        source.push_str("    0\n}\n");
        assert_eq!(source.lines().count(), 41);

        let chunks = chunker(20, 5000, 0).chunk(&source, "src/calc.rs", FileKind::Rust, "h");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.unit, "function");
        assert_eq!(chunks[0].metadata.total_chunks, 1);
    }

    #[test]
    fn tiny_readme_is_one_text_chunk() {
        let source = "demo\ntiny\nnotes\n";
        let chunks = chunker(20, 1200, 0).chunk(source, "README", FileKind::Text, "h");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.unit, "text");
        assert!(non_ws_len(&chunks[0].content) < 20);
    }

    #[test]
    fn small_functions_merge() {
        let source = "fn a() { 1 }\nfn b() { 2 }\nfn c() { 3 }\n";
        let chunks = chunker(50, 1200, 0).chunk(source, "src/lib.rs", FileKind::Rust, "h");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.unit, "function");
    }

    #[test]
    fn different_units_never_merge() {
        let source = "use std::io;\n\nfn a() { 1 }\n";
        let chunks = chunker(50, 1200, 0).chunk(source, "src/lib.rs", FileKind::Rust, "h");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.unit, "code");
        assert_eq!(chunks[1].metadata.unit, "function");
    }

    #[test]
    fn merge_respects_max() {
        let source = "fn a() { 1 }\nfn b() { 2 }\n";
        // Each fn is ~10 non-ws chars; merged they would exceed max = 15.
        let chunks = chunker(12, 15, 0).chunk(source, "src/lib.rs", FileKind::Rust, "h");
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn overlap_injected_between_neighbors() {
        let md = "# One\n\nfirst section body text\n\n# Two\n\nsecond section body text\n";
        let chunks = chunker(5, 1200, 10).chunk(md, "doc.md", FileKind::Markdown, "h");
        assert!(chunks.len() >= 2);
        let first = &chunks[0];
        let second = &chunks[1];
        // Suffix of the first chunk previews the second section.
        assert!(first.content.contains("# Two"));
        // Prefix of the second chunk carries the first section's tail.
        assert!(second.content.starts_with("body text\n") || second.content.contains("body text"));
    }

    #[test]
    fn overlap_changes_id_inputs_consistently() {
        let md = "# One\n\nalpha\n\n# Two\n\nbeta\n";
        let config_chunks =
            |overlap| chunker(1, 1200, overlap).chunk(md, "doc.md", FileKind::Markdown, "h");
        let a = config_chunks(8);
        let b = config_chunks(8);
        assert_eq!(a[0].id, b[0].id);
        assert_eq!(a[1].id, b[1].id);
    }

    #[test]
    fn identical_content_same_ids_across_paths() {
        let source = "fn solo() {\n    let x = 1;\n    let y = 2;\n}\n";
        let a = chunker(5, 1200, 0).chunk(source, "a.rs", FileKind::Rust, "h1");
        let b = chunker(5, 1200, 0).chunk(source, "b.rs", FileKind::Rust, "h2");
        assert_eq!(a.len(), b.len());
        assert_eq!(a[0].id, b[0].id);
        assert_ne!(a[0].metadata.source, b[0].metadata.source);
    }

    #[test]
    fn line_ranges_are_one_based_and_ordered() {
        let source = "fn a() {\n    1;\n}\n\nfn b() {\n    2;\n}\n";
        let chunks = chunker(1, 1200, 0).chunk(source, "src/lib.rs", FileKind::Rust, "h");
        assert_eq!(chunks[0].metadata.line_range.0, 1);
        assert!(chunks[0].metadata.line_range.1 >= chunks[0].metadata.line_range.0);
        if chunks.len() > 1 {
            assert!(chunks[1].metadata.line_range.0 > chunks[0].metadata.line_range.1);
        }
    }

    #[test]
    fn summary_names_the_entity() {
        let source = "fn lookup() {\n    let x = 1;\n    let y = 2;\n}\n";
        let chunks = chunker(5, 1200, 0).chunk(source, "src/db.rs", FileKind::Rust, "h");
        assert!(chunks[0].metadata.summary.starts_with("src/db.rs :: lookup"));
    }

    #[test]
    fn garbage_code_still_chunks() {
        let chunks =
            chunker(5, 1200, 0).chunk("some } random { garbage", "weird.rs", FileKind::Rust, "h");
        assert!(!chunks.is_empty());
    }

    #[test]
    fn tail_and_head_chars_respect_boundaries() {
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("ab", 3), "ab");
        assert_eq!(head_chars("abcdef", 3), "abc");
        assert_eq!(head_chars("ab", 3), "ab");
        assert_eq!(tail_chars("héllo", 2), "lo");
        assert_eq!(head_chars("héllo", 2), "hé");
    }

    #[test]
    fn line_at_maps_offsets() {
        let starts = line_starts("ab\ncd\nef");
        assert_eq!(line_at(&starts, 0), 1);
        assert_eq!(line_at(&starts, 3), 2);
        assert_eq!(line_at(&starts, 7), 3);
    }

    mod proptest_chunker {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            #[test]
            fn chunking_never_panics(
                content in "\\PC{0,2000}",
                min in 1usize..200,
                max in 200usize..2000,
                overlap in 0usize..100,
            ) {
                let chunker = Chunker::new(ChunkingConfig {
                    max_chunk_size: max,
                    min_chunk_size: min,
                    chunk_overlap: overlap,
                });
                let _ = chunker.chunk(&content, "f.txt", FileKind::Text, "h");
            }

            #[test]
            fn chunk_indices_sequential(content in "[a-z. ]{1,800}") {
                let chunker = Chunker::new(ChunkingConfig {
                    max_chunk_size: 60,
                    min_chunk_size: 10,
                    chunk_overlap: 0,
                });
                let chunks = chunker.chunk(&content, "f.txt", FileKind::Text, "h");
                for (i, chunk) in chunks.iter().enumerate() {
                    prop_assert_eq!(chunk.metadata.chunk_index, i);
                    prop_assert_eq!(chunk.metadata.total_chunks, chunks.len());
                }
            }

            #[test]
            fn no_empty_chunks(content in "[a-z. !?\\n]{0,800}") {
                let chunker = Chunker::new(ChunkingConfig {
                    max_chunk_size: 40,
                    min_chunk_size: 5,
                    chunk_overlap: 0,
                });
                for chunk in chunker.chunk(&content, "f.txt", FileKind::Text, "h") {
                    prop_assert!(!chunk.content.trim().is_empty());
                }
            }
        }
    }
}
