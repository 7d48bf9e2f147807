use super::Subject;
use crate::errors::AppError;
use crate::services::fallback::{self, Language, TutorReply};
use crate::services::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use tracing::instrument;

fn default_grade() -> String {
    "3".to_string()
}

#[derive(Deserialize)]
pub struct TutorRequest {
    pub subject: Subject,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_grade")]
    pub grade: String,
    pub input: String,
}

/// Answer a child's question from the subject's notes.
///
/// Retrieval always runs; the generative step is optional and any failure
/// there drops to the deterministic extractor, so the endpoint degrades
/// rather than erroring once notes exist.
#[instrument(skip(state, payload))]
pub async fn tutor_reply(
    State(state): State<AppState>,
    Json(payload): Json<TutorRequest>,
) -> Result<Json<TutorReply>, AppError> {
    let input = payload.input.trim();
    let query = if input.is_empty() { "basics" } else { input };

    let chunks = state
        .search_service
        .search(query, payload.subject.as_str(), crate::DEFAULT_SEARCH_K)
        .await?;

    if chunks.is_empty() {
        return Ok(Json(fallback::no_notes(payload.language)));
    }

    let reply = match state
        .completion
        .complete(query, &chunks, payload.language, &payload.grade)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            tracing::debug!(error = %e, "Completion unavailable, using extracted reply");
            fallback::extract(&chunks, payload.language)
        }
    };

    Ok(Json(reply))
}
