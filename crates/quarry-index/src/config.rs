//! Engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level engine configuration. All fields have working defaults so the
/// consumer can construct `EngineConfig::default()` and override selectively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root directory for persisted state. Each indexed project gets its own
    /// subdirectory keyed by a hash of the project root path.
    pub state_dir: PathBuf,
    pub scan: ScanConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("./data/quarry"),
            scan: ScanConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

/// Tree-walk filtering knobs for the change detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory names skipped outright, in addition to gitignore rules.
    pub ignore_dirs: Vec<String>,
    /// Glob patterns matched against file names; matching files are skipped.
    pub ignore_patterns: Vec<String>,
    /// Files larger than this many bytes are skipped and reported.
    pub max_file_size: u64,
    /// How many leading bytes to sniff for the binary heuristic.
    pub binary_sniff_len: usize,
    /// Fraction of non-text bytes in the sniffed prefix above which a file
    /// is treated as binary.
    pub binary_ratio: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ignore_dirs: [
                ".git",
                "target",
                "node_modules",
                "dist",
                "build",
                "__pycache__",
                ".venv",
                "vendor",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            ignore_patterns: ["*.min.js", "*.min.css", "*.lock", "*-lock.json"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            max_file_size: 1024 * 1024,
            binary_sniff_len: 8192,
            binary_ratio: 0.30,
        }
    }
}

/// Chunk sizing. `max_chunk_size` and `min_chunk_size` are measured in
/// non-whitespace characters; `chunk_overlap` in raw characters of
/// neighboring context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_chunk_size: usize,
    pub min_chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1200,
            min_chunk_size: 100,
            chunk_overlap: 120,
        }
    }
}

/// Query-time tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Blend weight for reciprocal rank fusion: 0.0 = lexical only,
    /// 1.0 = vector only.
    pub rrf_alpha: f32,
    /// Each index is asked for `top_k * candidate_factor` hits before fusion.
    pub candidate_factor: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_alpha: 0.5,
            candidate_factor: 2,
        }
    }
}
