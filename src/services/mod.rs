//! Service layer
//!
//! Ingestion and search logic, plus the deterministic fallback reply
//! builder. Route handlers stay thin and delegate here.

pub mod fallback;
pub mod ingest;
pub mod search;

use crate::db::RetrievedChunk;
use async_trait::async_trait;
use fallback::{Language, TutorReply};
use ingest::IngestService;
use search::SearchService;
use std::sync::Arc;

/// Generative reply step. The tutor endpoint tries this first and falls
/// back to [`fallback::extract`] on any error, so implementations are
/// free to fail.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(
        &self,
        input: &str,
        chunks: &[RetrievedChunk],
        language: Language,
        grade: &str,
    ) -> anyhow::Result<TutorReply>;
}

/// No generative backend configured; every call takes the fallback path.
pub struct DisabledCompletion;

#[async_trait]
impl Completion for DisabledCompletion {
    async fn complete(
        &self,
        _input: &str,
        _chunks: &[RetrievedChunk],
        _language: Language,
        _grade: &str,
    ) -> anyhow::Result<TutorReply> {
        anyhow::bail!("completion backend disabled")
    }
}

/// Shared application state handed to every route handler
#[derive(Clone)]
pub struct AppState {
    pub ingest_service: Arc<IngestService>,
    pub search_service: Arc<SearchService>,
    pub completion: Arc<dyn Completion>,
}
