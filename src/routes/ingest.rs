use super::Subject;
use crate::errors::AppError;
use crate::services::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct IngestRequest {
    pub subject: Subject,
    /// Full note text; chunking happens server-side
    pub text: String,
    /// File name the topic slug and title are derived from, e.g. "percentages.md"
    pub source_name: String,
}

#[derive(Serialize)]
pub struct IngestResponse {
    pub doc_id: Option<Uuid>,
    pub chunks_inserted: usize,
}

#[instrument(skip(state, payload))]
pub async fn ingest_document(
    State(state): State<AppState>,
    Json(payload): Json<IngestRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.source_name.trim().is_empty() {
        return Err(AppError::validation("source_name is required"));
    }

    let outcome = state
        .ingest_service
        .ingest(payload.subject.as_str(), &payload.text, &payload.source_name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            doc_id: outcome.doc_id,
            chunks_inserted: outcome.chunks_inserted,
        }),
    ))
}
