//! HTTP surface

pub mod health;
pub mod ingest;
pub mod search;
pub mod tutor;

use crate::services::AppState;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Subjects the knowledge base is partitioned by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Math,
    English,
    Urdu,
    Science,
    Islamiat,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::English => "english",
            Subject::Urdu => "urdu",
            Subject::Science => "science",
            Subject::Islamiat => "islamiat",
        }
    }
}

pub fn create_router(
    state: AppState,
    metrics_handle: PrometheusHandle,
    request_timeout: Duration,
) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ingest", post(ingest::ingest_document))
        .route("/search", get(search::search_notes))
        .route("/tutor", post(tutor::tutor_reply))
        .with_state(state)
        .route(
            "/metrics",
            get(move || async move { metrics_handle.render() }),
        )
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
}
