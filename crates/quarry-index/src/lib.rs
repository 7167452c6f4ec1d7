//! Incremental document indexing and hybrid retrieval over a source tree.
//!
//! A content-hash change detector feeds a language-aware chunker; chunks
//! land in a persisted TF-IDF lexical index and, when an embedding backend
//! is available, a dense vector index. Queries fuse both rankings with
//! reciprocal rank fusion. Every optional subsystem degrades to a smaller
//! but still-correct index rather than failing the engine.

pub mod chunk;
pub mod chunker;
pub mod config;
pub(crate) mod embed_text;
pub mod engine;
pub mod error;
pub mod fuse;
pub mod languages;
pub mod lexical;
pub(crate) mod persist;
pub mod progress;
pub mod scanner;
pub mod store;
pub mod vector;
pub mod watcher;

pub use chunk::{ChunkMetadata, ChunkRecord, SearchHit};
pub use config::{ChunkingConfig, EngineConfig, RetrievalConfig, ScanConfig};
pub use engine::{Capabilities, Engine, EngineStats};
pub use error::{IndexError, Result};
pub use progress::{IndexEvent, IndexPhase, IndexReport};
pub use watcher::IndexWatcher;
