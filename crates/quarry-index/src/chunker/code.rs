//! Structural splitting via tree-sitter: one chunk per top-level item.

use tree_sitter::{Node, Parser};

use super::RawChunk;
use crate::error::{IndexError, Result};
use crate::languages::{FileKind, unit_tag};

/// Split source along top-level function/class boundaries.
///
/// A single item larger than the configured maximum is left intact; only
/// the sentence fallback cuts inside a structural unit.
///
/// # Errors
///
/// Returns an error if no grammar is available for `kind` or tree-sitter
/// fails to parse; callers fall back to the sentence splitter.
pub(super) fn split(source: &str, kind: FileKind) -> Result<Vec<RawChunk>> {
    let grammar = kind
        .grammar()
        .ok_or_else(|| IndexError::Parse(format!("no grammar for {}", kind.id())))?;

    let mut parser = Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|e| IndexError::Parse(format!("set_language failed: {e}")))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| IndexError::Parse("parse produced no tree".to_string()))?;

    let root = tree.root_node();
    let mut chunks = Vec::new();
    let child_count = u32::try_from(root.named_child_count()).unwrap_or(u32::MAX);

    for i in 0..child_count {
        let Some(child) = root.named_child(i) else {
            continue;
        };
        if source[child.byte_range()].trim().is_empty() {
            continue;
        }
        chunks.push(RawChunk {
            name: extract_name(&child, source),
            unit: unit_tag(child.kind()),
            span: child.byte_range(),
        });
    }

    Ok(chunks)
}

fn extract_name(node: &Node, source: &str) -> Option<String> {
    // tree-sitter-rust: impl_item uses the "type" field, most others "name"
    node.child_by_field_name("name")
        .or_else(|| node.child_by_field_name("type"))
        .map(|n| source[n.byte_range()].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_single_function() {
        let source = "fn hello() {\n    println!(\"hi\");\n}\n";
        let chunks = split(source, FileKind::Rust).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].unit, "function");
        assert_eq!(chunks[0].name.as_deref(), Some("hello"));
    }

    #[test]
    fn rust_mixed_items() {
        let source = r"
use std::io;

struct Config {
    value: u32,
}

fn load() -> Config {
    Config { value: 1 }
}
";
        let chunks = split(source, FileKind::Rust).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].unit, "code");
        assert_eq!(chunks[1].unit, "class");
        assert_eq!(chunks[1].name.as_deref(), Some("Config"));
        assert_eq!(chunks[2].unit, "function");
    }

    #[test]
    fn impl_name_from_type_field() {
        let source = "struct Foo;\n\nimpl Foo {\n    fn bar(&self) {}\n}\n";
        let chunks = split(source, FileKind::Rust).unwrap();
        let imp = chunks.iter().find(|c| c.unit == "class" && c.span.start > 0);
        assert_eq!(imp.and_then(|c| c.name.as_deref()), Some("Foo"));
    }

    #[cfg(feature = "lang-python")]
    #[test]
    fn python_class_and_function() {
        let source = "class Greeter:\n    def hello(self):\n        pass\n\ndef main():\n    pass\n";
        let chunks = split(source, FileKind::Python).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].unit, "class");
        assert_eq!(chunks[1].unit, "function");
    }

    #[test]
    fn no_grammar_errors() {
        assert!(split("plain words", FileKind::Text).is_err());
        assert!(split("# heading", FileKind::Markdown).is_err());
    }

    #[test]
    fn empty_source_yields_nothing() {
        let chunks = split("", FileKind::Rust).unwrap();
        assert!(chunks.is_empty());
    }
}
