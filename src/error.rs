use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::{
    auth::{jwt::InvalidTokenError, password::HashingError, policy::PolicyViolation},
    users::repo::RepoError,
};

/// Service-level error taxonomy. Every handler returns this.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    UnprocessableEntity(#[from] PolicyViolation),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("internal error: {0}")]
    Unknown(String),
}

/// JSON error body: `{code, name, message, cause?}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cause: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let status = self.status();
        let (message, cause) = match self {
            // internal causes stay in the logs
            AppError::BackendUnavailable(_) => ("service temporarily unavailable".to_string(), None),
            AppError::Unknown(_) => ("internal server error".to_string(), None),
            AppError::UnprocessableEntity(v) => (v.to_string(), Some(v.rule().to_string())),
            other => (other.to_string(), None),
        };
        ErrorBody {
            code: status.as_u16(),
            name: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message,
            cause,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict(msg) => AppError::Conflict(msg),
            RepoError::BackendUnavailable(msg) => AppError::BackendUnavailable(msg),
            RepoError::Unknown(msg) => AppError::Unknown(msg),
        }
    }
}

impl From<HashingError> for AppError {
    fn from(e: HashingError) -> Self {
        AppError::Unknown(e.to_string())
    }
}

impl From<InvalidTokenError> for AppError {
    fn from(e: InvalidTokenError) -> Self {
        match e {
            InvalidTokenError::Signing(msg) => AppError::Unknown(msg),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(e: PathRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}
