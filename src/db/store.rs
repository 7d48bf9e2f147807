//! Document store boundary
//!
//! `NoteStore` is the persistence contract the ingestion pipeline and
//! hybrid retriever are built against; the Postgres implementation lives
//! here, the in-process one in [`crate::db::memory`]. Chunk replacement is
//! a single transactional operation so a document can never end up with a
//! mix of old and new chunks.

use crate::config::DatabaseConfig;
use crate::db::models;
use crate::embeddings::Embedding;
use crate::errors::{AppError, Result, StoreOp};
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend,
    EntityTrait, QueryFilter, QueryResult, Set, Statement, TransactionTrait, TryGetError,
};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// Hybrid score weights: semantic signal dominates, lexical refines
pub(crate) const VECTOR_WEIGHT: f64 = 0.7;
pub(crate) const LEXICAL_WEIGHT: f64 = 0.3;

/// Cosine-distance cutoff for vector-only candidates
pub(crate) const MAX_VECTOR_DISTANCE: f64 = 0.5;

/// One chunk row to persist, in reading order
#[derive(Debug, Clone)]
pub struct ChunkRow {
    pub index: i32,
    pub content: String,
    pub embedding: Embedding,
}

/// A query-time view of a chunk with its ranking signals; never persisted
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub chunk_id: Uuid,
    pub doc_id: Uuid,
    pub subject: String,
    pub topic_slug: String,
    pub content: String,
    pub vec_score: Option<f64>,
    pub fts_score: Option<f64>,
    pub final_score: f64,
}

/// Persistence boundary for documents and chunks
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Create or update the document identified by (subject, topic_slug),
    /// returning its id. Re-ingestion targets the same identity.
    async fn upsert_doc(&self, subject: &str, topic_slug: &str, title: &str) -> Result<Uuid>;

    /// Atomically replace all chunks of a document with `rows`.
    /// A failure leaves the previous chunk set intact.
    async fn replace_chunks(&self, doc_id: Uuid, rows: Vec<ChunkRow>) -> Result<()>;

    /// Rank chunks of `subject` against the query text and optional query
    /// vector. Returns at most `k` results, final score strictly
    /// non-increasing, ties broken by document recency then chunk index.
    /// Chunks with neither a lexical nor a vector signal are excluded.
    async fn hybrid_search(
        &self,
        query: &str,
        query_vec: Option<&[f32]>,
        subject: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>>;
}

/// Postgres-backed store (pgvector + tsvector full-text)
///
/// Not `Clone`: the sea-orm `mock` feature (enabled in test builds)
/// makes `DatabaseConnection` non-cloneable. Share via `Arc` instead.
pub struct PgNoteStore {
    db: DatabaseConnection,
}

impl PgNoteStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .sqlx_logging(false);

        let db = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {e}"),
            })?;

        Ok(Self { db })
    }

    pub async fn ping(&self) -> Result<()> {
        self.db
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {e}"),
            })?;
        Ok(())
    }
}

/// pgvector literal: "[1,2.5,...]"
fn vector_literal(v: &[f32]) -> String {
    let parts: Vec<String> = v.iter().map(|f| f.to_string()).collect();
    format!("[{}]", parts.join(","))
}

fn retrieved_from_row(row: &QueryResult) -> std::result::Result<RetrievedChunk, TryGetError> {
    Ok(RetrievedChunk {
        chunk_id: row.try_get("", "id")?,
        doc_id: row.try_get("", "doc_id")?,
        subject: row.try_get("", "subject")?,
        topic_slug: row.try_get("", "topic_slug")?,
        content: row.try_get("", "content")?,
        vec_score: row.try_get("", "vec_score")?,
        fts_score: row.try_get("", "fts_score")?,
        final_score: row.try_get("", "final_score")?,
    })
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn upsert_doc(&self, subject: &str, topic_slug: &str, title: &str) -> Result<Uuid> {
        let now = chrono::Utc::now();
        let doc = models::doc::ActiveModel {
            id: Set(Uuid::new_v4()),
            subject: Set(subject.to_string()),
            topic_slug: Set(topic_slug.to_string()),
            title: Set(title.to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let saved = models::doc::Entity::insert(doc)
            .on_conflict(
                OnConflict::columns([
                    models::doc::Column::Subject,
                    models::doc::Column::TopicSlug,
                ])
                .update_columns([models::doc::Column::Title, models::doc::Column::UpdatedAt])
                .to_owned(),
            )
            .exec_with_returning(&self.db)
            .await
            .map_err(|e| AppError::store(StoreOp::UpsertDoc, e))?;

        Ok(saved.id)
    }

    async fn replace_chunks(&self, doc_id: Uuid, rows: Vec<ChunkRow>) -> Result<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::store(StoreOp::DeleteChunks, e))?;

        models::chunk::Entity::delete_many()
            .filter(models::chunk::Column::DocId.eq(doc_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::store(StoreOp::DeleteChunks, e))?;

        for row in rows {
            let embedding = row.embedding.vector().map(vector_literal);

            let insert = Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                INSERT INTO kb_chunks (id, doc_id, chunk_index, content, embedding, created_at)
                VALUES ($1, $2, $3, $4, $5::vector, NOW())
                "#,
                vec![
                    Uuid::new_v4().into(),
                    doc_id.into(),
                    row.index.into(),
                    row.content.into(),
                    embedding.into(),
                ],
            );
            txn.execute(insert)
                .await
                .map_err(|e| AppError::store(StoreOp::InsertChunks, e))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::store(StoreOp::InsertChunks, e))
    }

    async fn hybrid_search(
        &self,
        query: &str,
        query_vec: Option<&[f32]>,
        subject: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        // Vector sub-expressions drop out of the SQL entirely when there is
        // no query vector; the embedding literal is built internally, never
        // from user input.
        let (vec_score_expr, vec_candidate_filter) = match query_vec {
            Some(v) => {
                let literal = vector_literal(v);
                (
                    format!(
                        "CASE WHEN c.embedding IS NOT NULL \
                         THEN (1 - (c.embedding <=> '{literal}'::vector))::float8 END"
                    ),
                    format!(
                        "OR (c.embedding IS NOT NULL \
                         AND (c.embedding <=> '{literal}'::vector) < {MAX_VECTOR_DISTANCE})"
                    ),
                )
            }
            None => ("NULL::float8".to_string(), String::new()),
        };

        let sql = format!(
            r#"
            WITH scored AS (
                SELECT c.id, c.doc_id, d.subject, d.topic_slug, c.content,
                       c.chunk_index, d.updated_at,
                       {vec_score_expr} AS vec_score,
                       NULLIF(ts_rank_cd(to_tsvector('english', c.content),
                                         plainto_tsquery('english', $1)), 0)::float8 AS fts_score
                FROM kb_chunks c
                JOIN kb_docs d ON d.id = c.doc_id
                WHERE d.subject = $2
                  AND (to_tsvector('english', c.content) @@ plainto_tsquery('english', $1)
                       {vec_candidate_filter})
            )
            SELECT id, doc_id, subject, topic_slug, content, vec_score, fts_score,
                   ({VECTOR_WEIGHT} * COALESCE(vec_score, 0)
                    + {LEXICAL_WEIGHT} * COALESCE(fts_score, 0))::float8 AS final_score
            FROM scored
            ORDER BY final_score DESC, updated_at DESC, chunk_index ASC
            LIMIT {k}
            "#
        );

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            &sql,
            vec![query.into(), subject.into()],
        );

        let rows = self
            .db
            .query_all(stmt)
            .await
            .map_err(|e| AppError::store(StoreOp::Search, e))?;

        // A row that fails to decode is a backend failure, not a miss
        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            results.push(
                retrieved_from_row(row)
                    .map_err(|e| AppError::store(StoreOp::Search, e.into()))?,
            );
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    #[test]
    fn vector_literal_format() {
        assert_eq!(vector_literal(&[1.0, 2.5, -0.5]), "[1,2.5,-0.5]");
        assert_eq!(vector_literal(&[]), "[]");
    }

    fn result_row(content: &str, final_score: f64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            ("id", Uuid::new_v4().into()),
            ("doc_id", Uuid::new_v4().into()),
            ("subject", "math".into()),
            ("topic_slug", "percentages".into()),
            ("content", content.into()),
            ("vec_score", Option::<f64>::None.into()),
            ("fts_score", Some(0.4f64).into()),
            ("final_score", final_score.into()),
        ])
    }

    #[tokio::test]
    async fn search_rows_decode_into_retrieved_chunks() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                result_row("percent means out of one hundred", 0.12),
                result_row("ten percent is one tenth", 0.09),
            ]])
            .into_connection();
        let store = PgNoteStore { db };

        let results = store.hybrid_search("percent", None, "math", 6).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].subject, "math");
        assert_eq!(results[0].fts_score, Some(0.4));
        assert!(results[0].vec_score.is_none());
        assert_eq!(results[1].final_score, 0.09);
    }

    #[tokio::test]
    async fn undecodable_search_row_is_an_error_not_a_miss() {
        let mut bad = result_row("percent facts", 0.1);
        bad.insert("final_score", "not a number".into());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![result_row("percent facts", 0.2), bad]])
            .into_connection();
        let store = PgNoteStore { db };

        let err = store
            .hybrid_search("percent", None, "math", 6)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Store {
                op: StoreOp::Search,
                ..
            }
        ));
    }
}
