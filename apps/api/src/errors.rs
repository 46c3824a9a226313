use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::orchestrator::ExtractionError;
use crate::extraction::update::UpdateError;
use crate::pdf::TextExtractionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The uploaded PDF cannot be read. The user can fix this.
    #[error("PDF extraction error: {0}")]
    PdfExtraction(#[from] TextExtractionError),

    #[error("LLM error: {0}")]
    Llm(String),

    /// Skill reference tables are missing or malformed. An operator has to fix this.
    #[error("Reference data error: {0}")]
    ReferenceData(String),

    #[error("Storage error: {0}")]
    Storage(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ExtractionError> for AppError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::Text(e) => AppError::PdfExtraction(e),
            ExtractionError::Agent(e) => AppError::Llm(e.to_string()),
            ExtractionError::Reference(e) => AppError::ReferenceData(e.to_string()),
            ExtractionError::Join(e) => AppError::Internal(anyhow::anyhow!(e)),
        }
    }
}

impl From<UpdateError> for AppError {
    fn from(e: UpdateError) -> Self {
        match e {
            UpdateError::Empty => AppError::Validation(e.to_string()),
            UpdateError::NotFound(_) => AppError::NotFound(e.to_string()),
            UpdateError::InvalidDocument { .. } => AppError::Storage(anyhow::anyhow!(e.to_string())),
            UpdateError::Storage(e) => AppError::Storage(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::PdfExtraction(e) => {
                tracing::warn!("PDF extraction failed ({}): {e}", e.kind());
                (StatusCode::BAD_REQUEST, "PDF_EXTRACTION_ERROR", e.to_string())
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::ReferenceData(msg) => {
                tracing::error!("Reference data error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "REFERENCE_DATA_ERROR",
                    "Skill reference data is unavailable".to_string(),
                )
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
