//! Error handling for the kitchen stock service
//!
//! Domain errors from `shared` map onto HTTP statuses here. Everything else is
//! a 500 with the detail kept in the logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::DomainError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] validator::ValidationErrors),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(resource: &str) -> Self {
        AppError::Domain(DomainError::NotFound(resource.to_string()))
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Domain(DomainError::validation(field, message))
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }
}

fn domain_detail(err: &DomainError) -> (StatusCode, ErrorDetail) {
    match err {
        DomainError::Validation { field, message } => (
            StatusCode::BAD_REQUEST,
            ErrorDetail {
                code: "VALIDATION_ERROR".to_string(),
                message: message.clone(),
                field: Some(field.clone()),
            },
        ),
        DomainError::NotFound(resource) => (
            StatusCode::NOT_FOUND,
            ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
        ),
        DomainError::Conflict(message) => (
            StatusCode::CONFLICT,
            ErrorDetail::new("CONFLICT", message.clone()),
        ),
        DomainError::InsufficientStock { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("INSUFFICIENT_STOCK", err.to_string()),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Domain(err) => domain_detail(err),
            AppError::InvalidRequest(errors) => {
                let field = errors.field_errors().keys().next().map(|k| k.to_string());
                (
                    StatusCode::BAD_REQUEST,
                    ErrorDetail {
                        code: "VALIDATION_ERROR".to_string(),
                        message: errors.to_string(),
                        field,
                    },
                )
            }
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        };

        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
