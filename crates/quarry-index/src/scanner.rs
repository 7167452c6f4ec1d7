//! Change detection: walk the tree, filter, hash, diff against the table.
//!
//! Pure with respect to persisted state: the caller owns the hash table and
//! decides when to persist it, so a crash mid-pass never marks a file as
//! indexed when it is not.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::config::ScanConfig;
use crate::error::{IndexError, Result};
use crate::languages::is_supported;

/// A file whose content hash differs from the persisted table.
#[derive(Debug, Clone)]
pub struct ChangedFile {
    pub path: String,
    pub hash: String,
}

/// A candidate file excluded from indexing, with the reason.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub enum SkipReason {
    /// Larger than the configured size ceiling, in bytes.
    Oversized(u64),
    /// Failed the non-text-byte heuristic.
    Binary,
    Unreadable(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Oversized(bytes) => write!(f, "oversized ({bytes} bytes)"),
            Self::Binary => f.write_str("binary content"),
            Self::Unreadable(e) => write!(f, "unreadable: {e}"),
        }
    }
}

/// Result of one scan pass.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub changed: Vec<ChangedFile>,
    /// Paths present in the hash table but absent from the walk.
    pub deleted: Vec<String>,
    pub skipped: Vec<SkippedFile>,
    /// Supported files examined, including skipped ones.
    pub files_seen: usize,
}

/// Walk `root` and classify every supported file against `known` hashes.
///
/// `force_full` treats every scanned file as changed regardless of hash
/// match.
///
/// # Errors
///
/// Returns an error only if the root itself cannot be walked; per-file
/// failures are reported as skips.
pub fn scan(
    root: &Path,
    config: &ScanConfig,
    known: &BTreeMap<String, String>,
    force_full: bool,
) -> Result<ScanOutcome> {
    if !root.is_dir() {
        return Err(IndexError::Other(format!(
            "root is not a directory: {}",
            root.display()
        )));
    }

    let ignore_dirs: HashSet<String> = config.ignore_dirs.iter().cloned().collect();
    let ignore_patterns: Vec<glob::Pattern> = config
        .ignore_patterns
        .iter()
        .filter_map(|p| glob::Pattern::new(p).ok())
        .collect();
    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| ignore_dirs.contains(name)))
        })
        .build();

    let mut outcome = ScanOutcome::default();
    let mut current: HashSet<String> = HashSet::new();

    for entry in walker.flatten() {
        if !entry.file_type().is_some_and(|ft| ft.is_file()) || !is_supported(entry.path()) {
            continue;
        }
        if let Some(name) = entry.file_name().to_str()
            && ignore_patterns.iter().any(|p| p.matches(name))
        {
            continue;
        }
        outcome.files_seen += 1;

        let rel_path = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .to_string();

        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                outcome.skipped.push(SkippedFile {
                    path: rel_path,
                    reason: SkipReason::Unreadable(e.to_string()),
                });
                continue;
            }
        };
        if size > config.max_file_size {
            outcome.skipped.push(SkippedFile {
                path: rel_path,
                reason: SkipReason::Oversized(size),
            });
            continue;
        }

        let bytes = match std::fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(e) => {
                outcome.skipped.push(SkippedFile {
                    path: rel_path,
                    reason: SkipReason::Unreadable(e.to_string()),
                });
                continue;
            }
        };
        if looks_binary(&bytes, config) {
            outcome.skipped.push(SkippedFile {
                path: rel_path,
                reason: SkipReason::Binary,
            });
            continue;
        }

        let hash = blake3::hash(&bytes).to_hex().to_string();
        current.insert(rel_path.clone());

        if force_full || known.get(&rel_path) != Some(&hash) {
            outcome.changed.push(ChangedFile {
                path: rel_path,
                hash,
            });
        }
    }

    outcome
        .deleted
        .extend(known.keys().filter(|p| !current.contains(*p)).cloned());
    outcome.changed.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(outcome)
}

/// Non-text-byte heuristic over the first `binary_sniff_len` bytes: a NUL
/// anywhere, or too many control bytes, marks the file binary.
#[allow(clippy::cast_precision_loss)]
fn looks_binary(bytes: &[u8], config: &ScanConfig) -> bool {
    let sniff = &bytes[..bytes.len().min(config.binary_sniff_len)];
    if sniff.is_empty() {
        return false;
    }
    if sniff.contains(&0) {
        return true;
    }
    let non_text = sniff
        .iter()
        .filter(|b| **b < 0x20 && !matches!(**b, b'\t' | b'\n' | b'\r'))
        .count();
    non_text as f32 / sniff.len() as f32 > config.binary_ratio
}
