//! Error types for the HTTP surface

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use iv_types::{IvError, SearchError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),

    /// The body could not be read as JSON; keeps the extractor's status.
    #[error("{}", .0.body_text())]
    Rejected(#[from] JsonRejection),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Rejected(rejection) => rejection.status(),
        }
    }
}

impl From<IvError> for ApiError {
    fn from(err: IvError) -> Self {
        // Caller-facing sentences are passed through without the category prefix.
        let message = match &err {
            IvError::Validation(msg) => msg.clone(),
            IvError::Search(inner @ (SearchError::NoVariants | SearchError::NoModelsOptimized)) => inner.to_string(),
            other => other.to_string(),
        };
        if err.is_client_error() {
            ApiError::BadRequest(message)
        } else {
            ApiError::Internal(message)
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("Search task failed: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(detail = %self, "Optimize request failed");
        } else {
            tracing::warn!(detail = %self, "Optimize request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
