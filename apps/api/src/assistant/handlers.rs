//! Axum route handlers for the assistant endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;

use crate::assistant::{
    analyze_document, analyze_resume, generate_job_description, generate_resume,
    JobDescriptionRequest, ResumeRequest,
};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub analysis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_saved: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerationResponse {
    pub success: bool,
    pub result: String,
}

/// POST /api/v1/documents/:id/analysis
pub async fn handle_analyze_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let result = analyze_document(&state.documents, state.extractor.as_ref(), &id).await?;
    Ok(Json(AnalysisResponse {
        success: true,
        analysis: result.analysis,
        file_saved: Some(result.file_saved),
    }))
}

/// POST /api/v1/documents/:id/resume-analysis
pub async fn handle_analyze_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let analysis = analyze_resume(&state.documents, state.extractor.as_ref(), &id).await?;
    Ok(Json(AnalysisResponse {
        success: true,
        analysis,
        file_saved: None,
    }))
}

/// POST /api/v1/generate/job-description
pub async fn handle_generate_job_description(
    State(state): State<AppState>,
    payload: Result<Json<JobDescriptionRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>, AppError> {
    let Json(request) = payload?;
    let result = generate_job_description(&state.documents, &request).await?;
    Ok(Json(GenerationResponse {
        success: true,
        result,
    }))
}

/// POST /api/v1/generate/resume
pub async fn handle_generate_resume(
    State(state): State<AppState>,
    payload: Result<Json<ResumeRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>, AppError> {
    let Json(request) = payload?;
    let result = generate_resume(&state.documents, &request).await?;
    Ok(Json(GenerationResponse {
        success: true,
        result,
    }))
}
