use super::Subject;
use crate::db::RetrievedChunk;
use crate::errors::AppError;
use crate::services::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Hard cap on requested result count
const MAX_K: usize = 50;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: String,
    subject: Subject,
    k: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    results: Vec<RetrievedChunk>,
}

#[instrument(skip(state))]
pub async fn search_notes(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    if params.q.trim().is_empty() {
        return Err(AppError::validation("Query string cannot be empty"));
    }

    let k = params.k.unwrap_or(crate::DEFAULT_SEARCH_K).min(MAX_K);

    let results = state
        .search_service
        .search(&params.q, params.subject.as_str(), k)
        .await?;

    Ok(Json(SearchResponse { results }))
}
