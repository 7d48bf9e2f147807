//! Error types for the retrieval core
//!
//! Store failures carry the operation that failed (doc upsert vs chunk
//! replace vs search) so a batch run can report precisely what broke.
//! Embedding-provider failures are deliberately NOT represented here:
//! the embedding adapter absorbs them into `Embedding::Unavailable`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// The store operation that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    UpsertDoc,
    DeleteChunks,
    InsertChunks,
    Search,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StoreOp::UpsertDoc => "upsert doc",
            StoreOp::DeleteChunks => "delete chunks",
            StoreOp::InsertChunks => "insert chunks",
            StoreOp::Search => "search",
        };
        f.write_str(s)
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("store {op} failed: {source}")]
    Store {
        op: StoreOp,
        #[source]
        source: sea_orm::DbErr,
    },

    #[error("database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Wrap a database error with the store operation it occurred in
    pub fn store(op: StoreOp, source: sea_orm::DbErr) -> Self {
        AppError::Store { op, source }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::DatabaseConnection { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store { .. }
            | AppError::Configuration(_)
            | AppError::Io(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(error = %message, status = status.as_u16(), "Server error");
        } else {
            tracing::debug!(error = %message, status = status.as_u16(), "Client error");
        }

        let body = Json(json!({
            "error": {
                "status": status.as_u16(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
