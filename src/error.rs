//! Error and response envelope shared by every handler.
//!
//! Mutation endpoints answer `{ success, data?, error? }`; failures never
//! leak database details to the client, they are logged here instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::db::is_unique_violation;

/// `{ success, data?, error? }` result of an action.
#[derive(Debug, Serialize)]
pub struct ActionResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ActionResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ActionResponse<()> {
    /// Success without a payload.
    pub fn done() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    TooManyRequests(String),

    #[error("Database not available")]
    Unavailable,

    /// A persistence failure; `message` is what the client sees.
    #[error("{message}")]
    Database {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{0}")]
    Upstream(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Wrap a sqlx error with the user-facing message for the failed action.
    /// Unique violations become conflicts; everything else is logged.
    pub fn persistence(message: &str, source: sqlx::Error) -> Self {
        if is_unique_violation(&source) {
            tracing::warn!(error = %source, "{}: duplicate value", message);
            return AppError::Conflict(format!("{message}: a record with this value already exists"));
        }
        tracing::error!(error = %source, "{}", message);
        AppError::Database {
            message: message.to_string(),
            source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database { .. } | AppError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(ActionResponse::failure(self.to_string()))).into_response()
    }
}
