//! HR assistant — resume analysis and job description / resume generation.
//!
//! Every model call goes through `DocumentService::generate_text`, every text
//! extraction through a `TextExtractor`.

pub mod handlers;
pub mod prompts;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assistant::prompts::{
    DOCUMENT_ANALYSIS_SYSTEM, JOB_DESCRIPTION_SYSTEM, JOB_DESCRIPTION_TEMPLATE,
    RESUME_REVIEW_SYSTEM, RESUME_TEMPLATE, RESUME_WRITER_SYSTEM,
};
use crate::documents::service::DocumentService;
use crate::errors::AppError;
use crate::extract::TextExtractor;

#[derive(Debug, Clone, Deserialize)]
pub struct JobDescriptionRequest {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub skills: String,
    #[serde(default)]
    pub experience: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResumeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub skills: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    pub analysis: String,
    pub file_saved: String,
}

/// Extracts the document's text, analyzes it and stores the result as the
/// document's analysis.
pub async fn analyze_document(
    service: &DocumentService,
    extractor: &dyn TextExtractor,
    id: &str,
) -> Result<DocumentAnalysis, AppError> {
    let text = extract_document_text(service, extractor, id).await?;
    let analysis = service.generate_text(DOCUMENT_ANALYSIS_SYSTEM, &text).await?;
    let record = service.attach_analysis(id, &analysis).await?;

    info!("Stored analysis for document {id}");
    Ok(DocumentAnalysis {
        analysis,
        file_saved: record.analysis_path.unwrap_or_default(),
    })
}

/// Recruiter review of a resume document. Nothing is persisted.
pub async fn analyze_resume(
    service: &DocumentService,
    extractor: &dyn TextExtractor,
    id: &str,
) -> Result<String, AppError> {
    let text = extract_document_text(service, extractor, id).await?;
    service.generate_text(RESUME_REVIEW_SYSTEM, &text).await
}

pub async fn generate_job_description(
    service: &DocumentService,
    request: &JobDescriptionRequest,
) -> Result<String, AppError> {
    let body = job_description_body(request)?;
    service.generate_text(JOB_DESCRIPTION_SYSTEM, &body).await
}

pub async fn generate_resume(
    service: &DocumentService,
    request: &ResumeRequest,
) -> Result<String, AppError> {
    let body = resume_body(request)?;
    service.generate_text(RESUME_WRITER_SYSTEM, &body).await
}

async fn extract_document_text(
    service: &DocumentService,
    extractor: &dyn TextExtractor,
    id: &str,
) -> Result<String, AppError> {
    let (_, path) = service.content_path(id).await?;
    let text = extractor.extract_text(&path).await?;
    if text.trim().is_empty() {
        return Err(AppError::Extraction(format!(
            "No text could be extracted from document {id}"
        )));
    }
    Ok(text)
}

fn job_description_body(request: &JobDescriptionRequest) -> Result<String, AppError> {
    let role = request.role.trim();
    if role.is_empty() {
        return Err(AppError::Validation("role cannot be empty".to_string()));
    }
    Ok(JOB_DESCRIPTION_TEMPLATE
        .replace("{role}", role)
        .replace("{skills}", request.skills.trim())
        .replace("{experience}", request.experience.trim()))
}

fn resume_body(request: &ResumeRequest) -> Result<String, AppError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    Ok(RESUME_TEMPLATE
        .replace("{name}", name)
        .replace("{contact}", request.contact.trim())
        .replace("{education}", request.education.trim())
        .replace("{experience}", request.experience.trim())
        .replace("{skills}", request.skills.trim()))
}
