//! Error handling utilities for route handlers

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::intake::IntakeError;

/// Error body: `{"detail": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Intake(#[from] IntakeError),

    /// Request body could not be read as JSON
    #[error("{0}")]
    BadBody(String),

    #[error("Image not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Intake(IntakeError::Validation(_)) | AppError::BadBody(_) => StatusCode::BAD_REQUEST,
            AppError::Intake(IntakeError::SourceFetch(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Intake(IntakeError::Upstream { .. }) | AppError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Client-facing detail. Server-side failures never leak their cause.
    pub fn detail(&self) -> String {
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Intake failures were already logged with their stage
        if let AppError::Database(e) = &self {
            error!("Database error: {}", e);
        }
        let body = ErrorDetail { detail: self.detail() };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Extension trait for logging errors and converting to StatusCode
pub trait LogErr<T> {
    /// Log error with context and return INTERNAL_SERVER_ERROR
    fn log_500(self, context: &str) -> Result<T, StatusCode>;
}

impl<T, E: std::fmt::Display> LogErr<T> for Result<T, E> {
    fn log_500(self, context: &str) -> Result<T, StatusCode> {
        self.map_err(|e| {
            error!("{}: {}", context, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
    }
}
