//! Heading-boundary splitting for markdown documents.

use pulldown_cmark::{Event, Parser, Tag};

use super::RawChunk;

/// Split markdown at heading boundaries. Content before the first heading
/// becomes its own chunk; a document without headings is a single chunk.
pub(super) fn split(source: &str) -> Vec<RawChunk> {
    let mut heading_starts: Vec<usize> = Vec::new();
    for (event, range) in Parser::new(source).into_offset_iter() {
        if let Event::Start(Tag::Heading { .. }) = event {
            heading_starts.push(range.start);
        }
    }

    let mut boundaries = Vec::with_capacity(heading_starts.len() + 2);
    if heading_starts.first() != Some(&0) {
        boundaries.push(0);
    }
    boundaries.extend(heading_starts);
    boundaries.push(source.len());

    boundaries
        .windows(2)
        .filter(|w| w[0] < w[1])
        .map(|w| {
            let span = w[0]..w[1];
            RawChunk {
                name: heading_name(&source[span.clone()]),
                span,
                unit: "section",
            }
        })
        .collect()
}

/// Heading text of a section, if its first non-blank line is a heading.
fn heading_name(section: &str) -> Option<String> {
    let line = section.lines().find(|l| !l.trim().is_empty())?;
    let trimmed = line.trim();
    if !trimmed.starts_with('#') {
        return None;
    }
    let name = trimmed.trim_start_matches('#').trim();
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_headings() {
        let md = "# Intro\n\nsome text\n\n# Usage\n\nmore text\n";
        let chunks = split(md);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].name.as_deref(), Some("Intro"));
        assert_eq!(chunks[1].name.as_deref(), Some("Usage"));
        assert_eq!(chunks[0].unit, "section");
    }

    #[test]
    fn preamble_before_first_heading() {
        let md = "leading prose\n\n# First\n\nbody\n";
        let chunks = split(md);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].name.is_none());
        assert_eq!(chunks[1].name.as_deref(), Some("First"));
    }

    #[test]
    fn no_headings_single_chunk() {
        let chunks = split("just a paragraph of prose\n");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].name.is_none());
    }

    #[test]
    fn nested_heading_levels_all_split() {
        let md = "# Top\n\na\n\n## Sub\n\nb\n\n### Deep\n\nc\n";
        let chunks = split(md);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].name.as_deref(), Some("Deep"));
    }

    #[test]
    fn spans_cover_whole_document() {
        let md = "# A\n\ntext\n\n# B\n\nmore\n";
        let chunks = split(md);
        assert_eq!(chunks.first().map(|c| c.span.start), Some(0));
        assert_eq!(chunks.last().map(|c| c.span.end), Some(md.len()));
    }
}
