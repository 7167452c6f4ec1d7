//! File-type detection and tree-sitter grammar registry.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Supported file type, determining the chunking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Markdown,
    Text,
}

/// How a [`FileKind`] gets split into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitClass {
    /// Top-level function/class boundaries via a structural parse.
    Code,
    /// Heading boundaries.
    Heading,
    /// Sentence boundaries (the generic fallback).
    Sentence,
}

impl FileKind {
    /// Identifier used in chunk metadata and persisted state.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Go => "go",
            Self::Markdown => "markdown",
            Self::Text => "text",
        }
    }

    /// Which splitting strategy handles this kind.
    #[must_use]
    pub fn split_class(self) -> SplitClass {
        match self {
            Self::Rust | Self::Python | Self::JavaScript | Self::TypeScript | Self::Go => {
                SplitClass::Code
            }
            Self::Markdown => SplitClass::Heading,
            Self::Text => SplitClass::Sentence,
        }
    }

    /// Get the tree-sitter grammar. Returns `None` for non-code kinds or
    /// when the corresponding feature is not enabled.
    #[must_use]
    pub fn grammar(self) -> Option<tree_sitter::Language> {
        match self {
            #[cfg(feature = "lang-rust")]
            Self::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            #[cfg(feature = "lang-python")]
            Self::Python => Some(tree_sitter_python::LANGUAGE.into()),
            #[cfg(feature = "lang-js")]
            Self::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            #[cfg(feature = "lang-js")]
            Self::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            #[cfg(feature = "lang-go")]
            Self::Go => Some(tree_sitter_go::LANGUAGE.into()),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Detect file kind from extension, with a small allowlist of well-known
/// extensionless files.
#[must_use]
pub fn detect_kind(path: &Path) -> Option<FileKind> {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        let name = path.file_name()?.to_str()?;
        return matches!(name, "README" | "LICENSE" | "CHANGELOG" | "NOTICE" | "Makefile")
            .then_some(FileKind::Text);
    };
    match ext {
        "rs" => Some(FileKind::Rust),
        "py" | "pyi" => Some(FileKind::Python),
        "js" | "jsx" | "mjs" | "cjs" => Some(FileKind::JavaScript),
        "ts" | "tsx" | "mts" | "cts" => Some(FileKind::TypeScript),
        "go" => Some(FileKind::Go),
        "md" | "markdown" => Some(FileKind::Markdown),
        "txt" | "rst" | "adoc" | "toml" | "json" | "yaml" | "yml" | "cfg" | "ini" | "sh" => {
            Some(FileKind::Text)
        }
        _ => None,
    }
}

/// Check if a file's extension is in the supported set.
#[must_use]
pub fn is_supported(path: &Path) -> bool {
    detect_kind(path).is_some()
}

/// Coarse structural tag for a tree-sitter node kind. Chunks only merge
/// with neighbors sharing the same tag.
#[must_use]
pub fn unit_tag(node_kind: &str) -> &'static str {
    match node_kind {
        "function_item"
        | "function_definition"
        | "function_declaration"
        | "method_definition"
        | "method_declaration"
        | "decorated_definition"
        | "arrow_function" => "function",
        "struct_item"
        | "enum_item"
        | "trait_item"
        | "impl_item"
        | "class_definition"
        | "class_declaration"
        | "type_item"
        | "type_declaration"
        | "interface_declaration"
        | "mod_item" => "class",
        _ => "code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_kind_rust() {
        assert_eq!(detect_kind(Path::new("src/main.rs")), Some(FileKind::Rust));
    }

    #[test]
    fn detect_kind_markdown() {
        assert_eq!(detect_kind(Path::new("README.md")), Some(FileKind::Markdown));
    }

    #[test]
    fn detect_kind_text_fallbacks() {
        for ext in &["txt", "toml", "yaml", "sh"] {
            let path = format!("file.{ext}");
            assert_eq!(
                detect_kind(Path::new(&path)),
                Some(FileKind::Text),
                "failed for .{ext}"
            );
        }
    }

    #[test]
    fn detect_kind_unknown_returns_none() {
        assert_eq!(detect_kind(Path::new("image.png")), None);
        assert_eq!(detect_kind(Path::new("noext")), None);
    }

    #[test]
    fn detect_kind_extensionless_allowlist() {
        assert_eq!(detect_kind(Path::new("README")), Some(FileKind::Text));
        assert_eq!(detect_kind(Path::new("Makefile")), Some(FileKind::Text));
    }

    #[test]
    fn split_class_table() {
        assert_eq!(FileKind::Rust.split_class(), SplitClass::Code);
        assert_eq!(FileKind::Markdown.split_class(), SplitClass::Heading);
        assert_eq!(FileKind::Text.split_class(), SplitClass::Sentence);
    }

    #[test]
    fn grammar_present_for_enabled_features() {
        #[cfg(feature = "lang-rust")]
        assert!(FileKind::Rust.grammar().is_some());
        #[cfg(feature = "lang-go")]
        assert!(FileKind::Go.grammar().is_some());
        assert!(FileKind::Markdown.grammar().is_none());
        assert!(FileKind::Text.grammar().is_none());
    }

    #[test]
    fn unit_tag_mapping() {
        assert_eq!(unit_tag("function_item"), "function");
        assert_eq!(unit_tag("class_definition"), "class");
        assert_eq!(unit_tag("use_declaration"), "code");
    }

    #[test]
    fn kind_id_roundtrip() {
        for kind in [
            FileKind::Rust,
            FileKind::Python,
            FileKind::JavaScript,
            FileKind::TypeScript,
            FileKind::Go,
            FileKind::Markdown,
            FileKind::Text,
        ] {
            assert!(!kind.id().is_empty());
            assert_eq!(kind.to_string(), kind.id());
        }
    }
}
