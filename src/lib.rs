//! TutorKB retrieval core
//!
//! Kid-safe tutoring notes, retrieved by hybrid search:
//! - Source documents are split into bounded, paragraph-respecting chunks
//! - Chunks are embedded (best effort) and stored per subject
//! - Queries are ranked by a merged vector-similarity + full-text signal
//! - A deterministic fallback extractor derives quiz and flashcard content
//!   from retrieved chunks when the generative step is unavailable

pub mod chunker;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{ChunkRow, NoteStore, RetrievedChunk};
pub use embeddings::{Embedder, Embedding};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default number of chunks returned to the tutoring layer
pub const DEFAULT_SEARCH_K: usize = 6;
