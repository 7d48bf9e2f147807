//! In-process `NoteStore`
//!
//! Backs tests and keyless local runs with the same ranking semantics as
//! the Postgres store: weighted vector+lexical score, no-signal candidates
//! excluded, ties broken by document recency then chunk index. The lexical
//! signal is a deterministic term-overlap ratio standing in for `ts_rank_cd`.

use super::store::{
    ChunkRow, NoteStore, RetrievedChunk, LEXICAL_WEIGHT, MAX_VECTOR_DISTANCE, VECTOR_WEIGHT,
};
use crate::errors::Result;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct DocRec {
    id: Uuid,
    subject: String,
    topic_slug: String,
    title: String,
    /// Monotonic update counter; stands in for `updated_at` recency
    seq: u64,
}

#[derive(Debug, Clone)]
struct ChunkRec {
    id: Uuid,
    doc_id: Uuid,
    chunk_index: i32,
    content: String,
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Default)]
struct Inner {
    docs: Vec<DocRec>,
    chunks: Vec<ChunkRec>,
    next_seq: u64,
}

/// In-memory document store
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents (test visibility)
    pub fn doc_count(&self) -> usize {
        self.inner.read().expect("store lock poisoned").docs.len()
    }

    /// Number of stored chunks across all documents (test visibility)
    pub fn chunk_count(&self) -> usize {
        self.inner.read().expect("store lock poisoned").chunks.len()
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fraction of distinct query terms present in the chunk; None when no overlap
fn lexical_score(query_terms: &HashSet<String>, content: &str) -> Option<f64> {
    if query_terms.is_empty() {
        return None;
    }
    let chunk_terms = terms(content);
    let matched = query_terms.iter().filter(|t| chunk_terms.contains(*t)).count();
    if matched == 0 {
        None
    } else {
        Some(matched as f64 / query_terms.len() as f64)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mut dot = 0f64;
    let mut na = 0f64;
    let mut nb = 0f64;
    for (&x, &y) in a.iter().zip(b) {
        dot += f64::from(x) * f64::from(y);
        na += f64::from(x) * f64::from(x);
        nb += f64::from(y) * f64::from(y);
    }
    if na == 0.0 || nb == 0.0 {
        return None;
    }
    Some(dot / (na.sqrt() * nb.sqrt()))
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn upsert_doc(&self, subject: &str, topic_slug: &str, title: &str) -> Result<Uuid> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.next_seq += 1;
        let seq = inner.next_seq;

        if let Some(doc) = inner
            .docs
            .iter_mut()
            .find(|d| d.subject == subject && d.topic_slug == topic_slug)
        {
            doc.title = title.to_string();
            doc.seq = seq;
            return Ok(doc.id);
        }

        let id = Uuid::new_v4();
        inner.docs.push(DocRec {
            id,
            subject: subject.to_string(),
            topic_slug: topic_slug.to_string(),
            title: title.to_string(),
            seq,
        });
        Ok(id)
    }

    async fn replace_chunks(&self, doc_id: Uuid, rows: Vec<ChunkRow>) -> Result<()> {
        // One write lock across delete and insert keeps the swap atomic
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.chunks.retain(|c| c.doc_id != doc_id);
        inner.chunks.extend(rows.into_iter().map(|row| ChunkRec {
            id: Uuid::new_v4(),
            doc_id,
            chunk_index: row.index,
            content: row.content,
            embedding: row.embedding.into_vector(),
        }));
        Ok(())
    }

    async fn hybrid_search(
        &self,
        query: &str,
        query_vec: Option<&[f32]>,
        subject: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let inner = self.inner.read().expect("store lock poisoned");
        let query_terms = terms(query);

        let mut scored: Vec<(RetrievedChunk, u64, i32)> = Vec::new();
        for chunk in &inner.chunks {
            let Some(doc) = inner
                .docs
                .iter()
                .find(|d| d.id == chunk.doc_id && d.subject == subject)
            else {
                continue;
            };

            let fts_score = lexical_score(&query_terms, &chunk.content);
            let vec_score = match (query_vec, chunk.embedding.as_deref()) {
                (Some(q), Some(e)) => cosine(q, e),
                _ => None,
            };

            // Same candidate rule as the SQL: a lexical match, or a vector
            // within the distance cutoff
            let vector_candidate =
                vec_score.is_some_and(|s| (1.0 - s) < MAX_VECTOR_DISTANCE);
            if fts_score.is_none() && !vector_candidate {
                continue;
            }

            let final_score = VECTOR_WEIGHT * vec_score.unwrap_or(0.0)
                + LEXICAL_WEIGHT * fts_score.unwrap_or(0.0);

            scored.push((
                RetrievedChunk {
                    chunk_id: chunk.id,
                    doc_id: doc.id,
                    subject: doc.subject.clone(),
                    topic_slug: doc.topic_slug.clone(),
                    content: chunk.content.clone(),
                    vec_score,
                    fts_score,
                    final_score,
                },
                doc.seq,
                chunk.chunk_index,
            ));
        }

        scored.sort_by(|(a, a_seq, a_idx), (b, b_seq, b_idx)| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b_seq.cmp(a_seq))
                .then_with(|| a_idx.cmp(b_idx))
        });
        scored.truncate(k);

        Ok(scored.into_iter().map(|(c, _, _)| c).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{Embedding, UnavailableReason};

    fn row(index: i32, content: &str, embedding: Embedding) -> ChunkRow {
        ChunkRow {
            index,
            content: content.to_string(),
            embedding,
        }
    }

    fn no_vec() -> Embedding {
        Embedding::Unavailable(UnavailableReason::MissingCredential)
    }

    #[tokio::test]
    async fn upsert_reuses_document_identity() {
        let store = MemoryStore::new();
        let a = store.upsert_doc("math", "percentages", "percentages").await.unwrap();
        let b = store.upsert_doc("math", "percentages", "percentages v2").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.doc_count(), 1);
    }

    #[tokio::test]
    async fn replace_swaps_chunk_set() {
        let store = MemoryStore::new();
        let doc = store.upsert_doc("math", "t", "t").await.unwrap();
        store
            .replace_chunks(doc, vec![row(0, "old one", no_vec()), row(1, "old two", no_vec())])
            .await
            .unwrap();
        store
            .replace_chunks(doc, vec![row(0, "new only", no_vec())])
            .await
            .unwrap();
        assert_eq!(store.chunk_count(), 1);
    }

    #[tokio::test]
    async fn lexical_only_ranking_excludes_non_matches() {
        let store = MemoryStore::new();
        let doc = store.upsert_doc("math", "t", "t").await.unwrap();
        store
            .replace_chunks(
                doc,
                vec![
                    row(0, "percent means out of one hundred", no_vec()),
                    row(1, "fractions are parts of a whole", no_vec()),
                ],
            )
            .await
            .unwrap();

        let results = store
            .hybrid_search("what does percent mean", None, "math", 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].content.starts_with("percent"));
        assert!(results[0].vec_score.is_none());
        assert!(results[0].fts_score.is_some());
    }

    #[tokio::test]
    async fn vector_signal_outranks_weaker_lexical_match() {
        let store = MemoryStore::new();
        let doc = store.upsert_doc("math", "t", "t").await.unwrap();
        store
            .replace_chunks(
                doc,
                vec![
                    row(0, "percent facts", Embedding::Vector(vec![1.0, 0.0])),
                    row(1, "percent facts too", Embedding::Vector(vec![0.0, 1.0])),
                ],
            )
            .await
            .unwrap();

        let query_vec = [0.0f32, 1.0];
        let results = store
            .hybrid_search("percent", Some(&query_vec), "math", 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].vec_score, Some(1.0));
        assert!(results[0].content.ends_with("too"));
        assert!(results[0].final_score > results[1].final_score);
    }

    #[tokio::test]
    async fn results_are_bounded_and_deterministic() {
        let store = MemoryStore::new();
        let doc = store.upsert_doc("math", "t", "t").await.unwrap();
        let rows: Vec<ChunkRow> = (0..8)
            .map(|i| row(i, &format!("percent item {i}"), no_vec()))
            .collect();
        store.replace_chunks(doc, rows).await.unwrap();

        let first = store.hybrid_search("percent", None, "math", 3).await.unwrap();
        let second = store.hybrid_search("percent", None, "math", 3).await.unwrap();
        assert_eq!(first.len(), 3);
        let ids: Vec<Uuid> = first.iter().map(|c| c.chunk_id).collect();
        let ids2: Vec<Uuid> = second.iter().map(|c| c.chunk_id).collect();
        assert_eq!(ids, ids2);
        // Equal scores fall back to chunk reading order
        for (a, b) in first.iter().zip(first.iter().skip(1)) {
            assert!(a.final_score >= b.final_score);
        }
    }

    #[tokio::test]
    async fn other_subjects_are_invisible() {
        let store = MemoryStore::new();
        let doc = store.upsert_doc("science", "plants", "plants").await.unwrap();
        store
            .replace_chunks(doc, vec![row(0, "percent of sunlight", no_vec())])
            .await
            .unwrap();

        let results = store.hybrid_search("percent", None, "math", 10).await.unwrap();
        assert!(results.is_empty());
    }
}
