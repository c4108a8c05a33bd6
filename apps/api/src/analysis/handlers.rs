//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;

use crate::analysis::pipeline::{run_analysis, AnalysisInput, ResumeSource};
use crate::analysis::report::AnalysisResponse;
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub resume_text: String,
    pub job_posting: String,
    #[serde(default)]
    pub model_id: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /analyze
///
/// JSON body with the resume already as text.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    if request.job_posting.trim().is_empty() {
        return Err(AppError::Validation(
            "job_posting cannot be empty".to_string(),
        ));
    }
    if request.resume_text.trim().is_empty() {
        return Err(AppError::Validation(
            "resume_text cannot be empty".to_string(),
        ));
    }

    let input = AnalysisInput {
        resume: ResumeSource::Text(request.resume_text),
        job_posting: request.job_posting,
        model_id: request.model_id,
    };

    let response = run_analysis(&state, input).await?;
    Ok(Json(response))
}

/// POST /analyze/file
///
/// Multipart form: `resume` (PDF or DOCX file), `job_posting` (text),
/// `model_id` (optional text). Maps to the same pipeline input as /analyze.
pub async fn handle_analyze_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResponse>, AppError> {
    let mut resume: Option<(Bytes, Option<String>)> = None;
    let mut job_posting: Option<String> = None;
    let mut model_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart request: {e}")))?
    {
        // Copy identifying metadata out before consuming the field body.
        let name = field.name().map(|s| s.to_string());
        let filename = field.file_name().map(|s| s.to_string());

        match name.as_deref() {
            Some("resume") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read resume upload: {e}")))?;
                resume = Some((bytes, filename));
            }
            Some("job_posting") => {
                let text = field.text().await.map_err(|e| {
                    AppError::Validation(format!("failed to read job_posting field: {e}"))
                })?;
                job_posting = Some(text);
            }
            Some("model_id") => {
                let text = field.text().await.map_err(|e| {
                    AppError::Validation(format!("failed to read model_id field: {e}"))
                })?;
                model_id = Some(text);
            }
            // Unknown fields are ignored rather than rejected.
            _ => {}
        }
    }

    let (bytes, filename) = resume.ok_or_else(|| {
        AppError::Validation("multipart field 'resume' is required".to_string())
    })?;
    let job_posting = job_posting.ok_or_else(|| {
        AppError::Validation("multipart field 'job_posting' is required".to_string())
    })?;
    if job_posting.trim().is_empty() {
        return Err(AppError::Validation(
            "job_posting cannot be empty".to_string(),
        ));
    }

    let input = AnalysisInput {
        resume: ResumeSource::Document { bytes, filename },
        job_posting,
        model_id,
    };

    let response = run_analysis(&state, input).await?;
    Ok(Json(response))
}
