use std::path::Path;

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use bytes::Bytes;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::orchestrator::extract_cv_from_pdf;
use crate::extraction::update::{update_latest_cv, CvUpdate};
use crate::state::AppState;
use crate::storage::{self, ObjectKind};

/// Multipart field carrying the CV.
const FILE_FIELD: &str = "file";
const ALLOWED_CONTENT_TYPES: &[&str] = &["application/pdf", "application/x-pdf", "application/octet-stream"];

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct StoragePaths {
    pub raw: String,
    pub parsed: String,
}

#[derive(Debug, Serialize)]
pub struct CvExtractionResponse {
    pub status: String,
    pub cv_data: Value,
    pub metadata: Value,
    pub storage_paths: StoragePaths,
}

#[derive(Debug, Serialize)]
pub struct CvUpdateResponse {
    pub status: String,
    pub message: String,
    pub storage_path: String,
}

struct PdfUpload {
    file_name: String,
    bytes: Bytes,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/cv/extract
///
/// Extracts a structured CV from an uploaded PDF, then stores the raw PDF and the
/// parsed JSON under the same timestamp. Nothing is stored when extraction fails.
pub async fn handle_extract(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
    mut multipart: Multipart,
) -> Result<Json<CvExtractionResponse>, AppError> {
    let upload = read_pdf_upload(&mut multipart, state.config.max_upload_bytes).await?;
    info!("CV extraction: {} ({} bytes)", upload.file_name, upload.bytes.len());

    let timestamp = storage::timestamp(Local::now());
    let cv_name = storage::cv_name(&upload.file_name);

    let record = extract_cv_from_pdf(
        upload.bytes.clone(),
        state.extractor.clone(),
        state.llm.as_ref(),
        &state.config.pipeline,
    )
    .await?;

    let cv_data = serde_json::to_value(&record)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize CvRecord: {e}")))?;

    let raw_path = state
        .store
        .put_raw_pdf(params.user_id, &cv_name, &timestamp, upload.bytes)
        .await
        .map_err(AppError::Storage)?;
    let parsed_path = state
        .store
        .put_parsed(params.user_id, &cv_name, &timestamp, &cv_data)
        .await
        .map_err(AppError::Storage)?;

    info!("CV extraction completed: {}", upload.file_name);
    Ok(Json(CvExtractionResponse {
        status: "success".to_string(),
        metadata: cv_data.get("metadata").cloned().unwrap_or_else(|| json!({})),
        cv_data,
        storage_paths: StoragePaths {
            raw: raw_path,
            parsed: parsed_path,
        },
    }))
}

/// PATCH /api/v1/cv/update
///
/// Edits identity fields and/or the explicit skills of the user's latest parsed CV.
pub async fn handle_update(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
    Json(update): Json<CvUpdate>,
) -> Result<Json<CvUpdateResponse>, AppError> {
    let storage_path = update_latest_cv(state.store.as_ref(), params.user_id, &update).await?;

    Ok(Json(CvUpdateResponse {
        status: "success".to_string(),
        message: "CV data updated successfully".to_string(),
        storage_path,
    }))
}

/// GET /api/v1/cv/latest
pub async fn handle_latest(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<CvExtractionResponse>, AppError> {
    let parsed = state
        .store
        .latest(params.user_id, ObjectKind::Parsed)
        .await
        .map_err(AppError::Storage)?
        .ok_or_else(|| AppError::NotFound("No parsed CV found for user".to_string()))?;

    let cv_data: Value = serde_json::from_slice(&parsed.bytes).map_err(|e| {
        AppError::Storage(anyhow::anyhow!("Stored CV {} is not valid JSON: {e}", parsed.key))
    })?;

    let raw_path = state
        .store
        .latest_key(params.user_id, ObjectKind::Raw)
        .await
        .map_err(AppError::Storage)?
        .unwrap_or_default();

    Ok(Json(CvExtractionResponse {
        status: "success".to_string(),
        metadata: cv_data.get("metadata").cloned().unwrap_or_else(|| json!({})),
        cv_data,
        storage_paths: StoragePaths {
            raw: raw_path,
            parsed: parsed.key,
        },
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Upload validation
// ────────────────────────────────────────────────────────────────────────────

async fn read_pdf_upload(multipart: &mut Multipart, max_bytes: usize) -> Result<PdfUpload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        check_file_type(&file_name, content_type.as_deref())?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read uploaded file: {e}")))?;
        check_size(bytes.len(), max_bytes)?;

        return Ok(PdfUpload { file_name, bytes });
    }

    Err(AppError::Validation(format!(
        "Missing multipart field '{FILE_FIELD}'"
    )))
}

fn check_file_type(file_name: &str, content_type: Option<&str>) -> Result<(), AppError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    if extension.as_deref() != Some("pdf") {
        return Err(AppError::Validation(format!(
            "Invalid file extension. Allowed: .pdf. Received: {}",
            extension.map_or_else(|| "no extension".to_string(), |e| format!(".{e}"))
        )));
    }

    if let Some(content_type) = content_type {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        if !ALLOWED_CONTENT_TYPES.contains(&essence.as_str()) {
            return Err(AppError::Validation(format!(
                "Invalid file type. Allowed types: PDF. Received: {content_type}"
            )));
        }
    }
    Ok(())
}

fn check_size(len: usize, max_bytes: usize) -> Result<(), AppError> {
    if len == 0 {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if len > max_bytes {
        return Err(AppError::Validation(format!(
            "File size exceeds {}MB limit",
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}
