//! Ingestion pipeline
//!
//! Text in, searchable chunks out: derive the document identity from the
//! source file name, chunk the body, embed what we can, and swap the
//! chunk set atomically. Embedding failures degrade the document to
//! lexical-only retrieval instead of failing the run.

use crate::chunker::{self, DEFAULT_MAX_CHUNK_LEN};
use crate::db::{ChunkRow, NoteStore};
use crate::embeddings::{Embedder, Embedding};
use crate::errors::{AppError, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Result of ingesting one document
#[derive(Debug, Clone, Copy)]
pub struct IngestOutcome {
    /// None when the document was empty and nothing was written
    pub doc_id: Option<Uuid>,
    pub chunks_inserted: usize,
}

/// Result of a corpus directory walk
#[derive(Debug, Clone, Copy, Default)]
pub struct CorpusReport {
    pub files_ok: usize,
    pub files_failed: usize,
    pub chunks_inserted: usize,
}

pub struct IngestService {
    store: Arc<dyn NoteStore>,
    embedder: Arc<dyn Embedder>,
}

impl IngestService {
    pub fn new(store: Arc<dyn NoteStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Ingest one document. Re-ingesting the same (subject, source_name)
    /// updates the existing document in place.
    pub async fn ingest(
        &self,
        subject: &str,
        text: &str,
        source_name: &str,
    ) -> Result<IngestOutcome> {
        let started = Instant::now();

        let topic_slug = chunker::slugify(source_name);
        if topic_slug.is_empty() {
            return Err(AppError::validation(format!(
                "source name '{source_name}' produces an empty topic slug"
            )));
        }
        let title = chunker::title_from(source_name);

        let chunks = chunker::chunk(text, DEFAULT_MAX_CHUNK_LEN);
        if chunks.is_empty() {
            tracing::info!(subject, topic_slug, "Skipping empty document");
            return Ok(IngestOutcome {
                doc_id: None,
                chunks_inserted: 0,
            });
        }

        let doc_id = self.store.upsert_doc(subject, &topic_slug, &title).await?;

        let embeddings = self.embedder.embed_batch(&chunks).await;
        let missing = embeddings
            .iter()
            .filter(|e| matches!(e, Embedding::Unavailable(_)))
            .count();
        if missing > 0 {
            tracing::warn!(
                subject,
                topic_slug,
                missing,
                total = chunks.len(),
                "Some chunks stored without embeddings"
            );
        }

        let rows: Vec<ChunkRow> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (content, embedding))| ChunkRow {
                index: i as i32,
                content,
                embedding,
            })
            .collect();
        let inserted = rows.len();

        self.store.replace_chunks(doc_id, rows).await?;

        metrics::counter!("tutorkb_docs_ingested_total").increment(1);
        metrics::counter!("tutorkb_chunks_created_total").increment(inserted as u64);
        metrics::histogram!("tutorkb_ingest_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        tracing::info!(
            subject,
            topic_slug,
            chunks = inserted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ingested document"
        );

        Ok(IngestOutcome {
            doc_id: Some(doc_id),
            chunks_inserted: inserted,
        })
    }

    /// Walk a corpus directory laid out as `<root>/<subject>/<topic>.md`
    /// and ingest every note file. A missing root is a no-op; individual
    /// file failures are logged and counted without stopping the run.
    pub async fn ingest_dir(&self, root: &Path) -> Result<CorpusReport> {
        let mut report = CorpusReport::default();

        if !root.is_dir() {
            tracing::info!(root = %root.display(), "Corpus directory not found, nothing to ingest");
            return Ok(report);
        }

        for subject_dir in sorted_entries(root).await? {
            if !subject_dir.is_dir() {
                continue;
            }
            let Some(subject) = subject_dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let subject = subject.to_string();

            for file in sorted_entries(&subject_dir).await? {
                let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if !(name.ends_with(".md") || name.ends_with(".txt")) {
                    continue;
                }

                let text = match tokio::fs::read_to_string(&file).await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(file = %file.display(), error = %e, "Failed to read note file");
                        report.files_failed += 1;
                        continue;
                    }
                };

                match self.ingest(&subject, &text, name).await {
                    Ok(outcome) => {
                        report.files_ok += 1;
                        report.chunks_inserted += outcome.chunks_inserted;
                    }
                    Err(e) => {
                        tracing::warn!(file = %file.display(), error = %e, "Failed to ingest note file");
                        report.files_failed += 1;
                    }
                }
            }
        }

        tracing::info!(
            files_ok = report.files_ok,
            files_failed = report.files_failed,
            chunks = report.chunks_inserted,
            "Corpus ingestion finished"
        );
        Ok(report)
    }
}

/// Directory entries sorted by path so runs are deterministic
async fn sorted_entries(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut entries = Vec::new();
    let mut reader = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = reader.next_entry().await? {
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::embeddings::{MockEmbedder, UnavailableReason};

    fn service(store: Arc<MemoryStore>, embedder: MockEmbedder) -> IngestService {
        IngestService::new(store, Arc::new(embedder))
    }

    #[tokio::test]
    async fn reingest_updates_instead_of_duplicating() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone(), MockEmbedder::new(4));

        let first = svc
            .ingest("math", "alpha\n\nbeta", "percentages.md")
            .await
            .unwrap();
        let second = svc
            .ingest("math", "gamma", "percentages.md")
            .await
            .unwrap();

        assert_eq!(first.doc_id.unwrap(), second.doc_id.unwrap());
        assert_eq!(store.doc_count(), 1);
        assert_eq!(store.chunk_count(), 1);
    }

    #[tokio::test]
    async fn empty_document_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone(), MockEmbedder::new(4));

        let outcome = svc.ingest("math", "   \n\n  ", "empty.md").await.unwrap();
        assert!(outcome.doc_id.is_none());
        assert_eq!(outcome.chunks_inserted, 0);
        assert_eq!(store.doc_count(), 0);
        assert_eq!(store.chunk_count(), 0);
    }

    #[tokio::test]
    async fn embedding_outage_still_persists_chunks() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(
            store.clone(),
            MockEmbedder::new(4).with_outage(UnavailableReason::Provider("quota".into())),
        );

        let outcome = svc
            .ingest("math", "first part\n\nsecond part", "notes.md")
            .await
            .unwrap();
        assert_eq!(outcome.chunks_inserted, 2);
        assert_eq!(store.chunk_count(), 2);
    }

    #[tokio::test]
    async fn unusable_source_name_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone(), MockEmbedder::new(4));

        let err = svc.ingest("math", "content", "---.md").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(store.doc_count(), 0);
    }
}
