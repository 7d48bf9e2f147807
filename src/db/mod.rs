//! Database layer
//!
//! - SeaORM entity models (`kb_docs`, `kb_chunks`)
//! - `NoteStore`: the persistence contract the pipeline is built against
//! - `PgNoteStore` (Postgres + pgvector) and `MemoryStore` (in-process)

pub mod memory;
pub mod models;
pub mod store;

pub use memory::MemoryStore;
pub use store::{ChunkRow, NoteStore, PgNoteStore, RetrievedChunk};
