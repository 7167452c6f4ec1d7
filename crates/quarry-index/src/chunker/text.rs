//! Sentence-boundary splitting: the generic fallback strategy.

use std::ops::Range;

use super::{RawChunk, non_ws_len};

/// Split plain text into sentence-aligned chunks no larger than `max_size`
/// non-whitespace characters. Oversized single sentences are hard-split on
/// character boundaries; this is the only strategy that enforces the size
/// ceiling by cutting inside a structural unit.
pub(super) fn split(source: &str, max_size: usize) -> Vec<RawChunk> {
    let mut chunks = Vec::new();
    let mut current: Option<Range<usize>> = None;
    let mut current_size = 0usize;

    for span in sentence_spans(source) {
        let size = non_ws_len(&source[span.clone()]);

        if size > max_size {
            if let Some(range) = current.take() {
                chunks.push(text_chunk(range));
                current_size = 0;
            }
            for piece in hard_split(source, &span, max_size) {
                chunks.push(text_chunk(piece));
            }
            continue;
        }

        match current {
            Some(ref mut range) if current_size + size <= max_size => {
                range.end = span.end;
                current_size += size;
            }
            Some(range) => {
                chunks.push(text_chunk(range));
                current = Some(span);
                current_size = size;
            }
            None => {
                current = Some(span);
                current_size = size;
            }
        }
    }

    if let Some(range) = current {
        chunks.push(text_chunk(range));
    }
    chunks
}

fn text_chunk(span: Range<usize>) -> RawChunk {
    RawChunk {
        span,
        unit: "text",
        name: None,
    }
}

/// Sentence spans: boundaries after `.`/`!`/`?` followed by whitespace, and
/// at paragraph breaks. Delimiters are ASCII, so byte scanning stays on
/// char boundaries.
fn sentence_spans(source: &str) -> Vec<Range<usize>> {
    let bytes = source.as_bytes();
    let mut spans = Vec::new();
    let mut start = 0;

    for i in 0..bytes.len() {
        let boundary = match bytes[i] {
            b'.' | b'!' | b'?' => i + 1 < bytes.len() && bytes[i + 1].is_ascii_whitespace(),
            b'\n' => i + 1 < bytes.len() && bytes[i + 1] == b'\n',
            _ => false,
        };
        if boundary {
            spans.push(start..i + 1);
            start = i + 1;
        }
    }
    if start < bytes.len() {
        spans.push(start..bytes.len());
    }
    spans.retain(|s| !source[s.clone()].trim().is_empty());
    spans
}

fn hard_split(source: &str, span: &Range<usize>, max_size: usize) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut start = span.start;
    let mut count = 0usize;

    for (offset, ch) in source[span.clone()].char_indices() {
        if !ch.is_whitespace() {
            count += 1;
        }
        if count >= max_size {
            let end = span.start + offset + ch.len_utf8();
            pieces.push(start..end);
            start = end;
            count = 0;
        }
    }
    if start < span.end {
        pieces.push(start..span.end);
    }
    pieces
}
