//! Error types for the store layer and the HTTP handlers
//!
//! `StoreError` is what the document store and the batched lookup return.
//! `ApiError` is what handlers return; it renders as a JSON body of the form
//! `{"error": "...", "code": "..."}` with a matching status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors raised by the document store and anything built directly on it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The embedded database failed (open, transaction, table, commit)
    #[error("database error: {0}")]
    Database(#[from] redb::Error),

    /// A stored document could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The query violates a backend constraint (e.g. membership limit)
    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    /// A document expected to exist is missing
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: &'static str, id: String },

    /// A blocking store task panicked or was cancelled
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

macro_rules! redb_error_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for StoreError {
                fn from(err: $ty) -> Self {
                    StoreError::Database(err.into())
                }
            }
        )*
    };
}

redb_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Errors returned from request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid or missing authorization header")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "invalid_input",
            ApiError::NotFound(_) => "not_found",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Conflict(_) => "conflict",
            ApiError::Store(StoreError::NotFound { .. }) => "not_found",
            ApiError::Store(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Store internals are logged, never echoed to the client
        let message = match &self {
            ApiError::Store(StoreError::NotFound { .. }) => self.to_string(),
            ApiError::Store(err) => {
                error!(error = %err, "store operation failed");
                "Internal server error".to_string()
            }
            ApiError::Unauthorized => "Unauthorized".to_string(),
            other => other.to_string(),
        };

        let mut body = json!({
            "error": message,
            "code": self.code(),
        });
        if let ApiError::Unauthorized = self {
            body["message"] = json!(self.to_string());
        }

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
