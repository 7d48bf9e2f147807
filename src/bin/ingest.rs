//! Corpus ingestion CLI
//!
//! Walks a corpus directory (one subdirectory per subject, `.md`/`.txt`
//! note files inside) and loads everything into the configured store.
//!
//!   ingest [CORPUS_ROOT] [--strict]
//!
//! With `--strict`, any per-file failure makes the process exit non-zero.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tutorkb::config::AppConfig;
use tutorkb::db::{MemoryStore, NoteStore, PgNoteStore};
use tutorkb::embeddings::{Embedder, MockEmbedder, OpenAiEmbedder};
use tutorkb::services::ingest::IngestService;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;

    let mut strict = false;
    let mut root: Option<PathBuf> = None;
    for arg in std::env::args().skip(1) {
        if arg == "--strict" {
            strict = true;
        } else {
            root = Some(PathBuf::from(arg));
        }
    }
    let root = root.unwrap_or_else(|| config.corpus.root.clone());

    if config.uses_memory_store() {
        tracing::warn!("Database URL is 'memory'; ingested content will not outlive this process");
    }

    let store: Arc<dyn NoteStore> = if config.uses_memory_store() {
        Arc::new(MemoryStore::new())
    } else {
        let store = PgNoteStore::connect(&config.database).await?;
        store.ping().await?;
        Arc::new(store)
    };

    let embedder: Arc<dyn Embedder> = if config.embedding.provider == "mock" {
        Arc::new(MockEmbedder::new(config.embedding.dimension))
    } else {
        Arc::new(OpenAiEmbedder::new(config.embedding.clone()))
    };

    let service = IngestService::new(store, embedder);
    let report = service.ingest_dir(&root).await?;

    tracing::info!(
        root = %root.display(),
        files_ok = report.files_ok,
        files_failed = report.files_failed,
        chunks = report.chunks_inserted,
        "Ingestion run complete"
    );

    if strict && report.files_failed > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
