//! Hybrid retrieval
//!
//! Embeds the query, then ranks subject chunks on the combined vector and
//! lexical signal. When no query vector is available the search silently
//! degrades to lexical-only; an embedding outage never fails a search.

use crate::db::{NoteStore, RetrievedChunk};
use crate::embeddings::{Embedder, Embedding};
use crate::errors::Result;
use std::sync::Arc;
use std::time::Instant;

pub struct SearchService {
    store: Arc<dyn NoteStore>,
    embedder: Arc<dyn Embedder>,
}

impl SearchService {
    pub fn new(store: Arc<dyn NoteStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Top-`k` chunks of `subject` for the query text
    pub async fn search(
        &self,
        query: &str,
        subject: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let started = Instant::now();

        let query_vec = match self.embedder.embed_one(query).await {
            Embedding::Vector(v) => Some(v),
            Embedding::Unavailable(reason) => {
                tracing::debug!(%reason, "No query vector, lexical-only search");
                None
            }
        };

        let results = self
            .store
            .hybrid_search(query, query_vec.as_deref(), subject, k)
            .await?;

        metrics::counter!("tutorkb_search_queries_total").increment(1);
        metrics::histogram!("tutorkb_search_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        tracing::debug!(
            subject,
            k,
            hits = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search complete"
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ChunkRow, MemoryStore};
    use crate::embeddings::{MockEmbedder, UnavailableReason};

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let doc = store
            .upsert_doc("math", "percentages", "percentages")
            .await
            .unwrap();
        store
            .replace_chunks(
                doc,
                vec![ChunkRow {
                    index: 0,
                    content: "percent means out of one hundred".to_string(),
                    embedding: Embedding::Unavailable(UnavailableReason::MissingCredential),
                }],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn search_survives_embedding_outage() {
        let store = seeded_store().await;
        let svc = SearchService::new(
            store,
            Arc::new(MockEmbedder::new(4).with_outage(UnavailableReason::Provider("down".into()))),
        );

        let results = svc.search("percent", "math", 6).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].vec_score.is_none());
    }

    #[tokio::test]
    async fn unrelated_query_finds_nothing() {
        let store = seeded_store().await;
        let svc = SearchService::new(store, Arc::new(MockEmbedder::new(4)));

        let results = svc.search("volcano eruptions", "math", 6).await.unwrap();
        assert!(results.is_empty());
    }
}
