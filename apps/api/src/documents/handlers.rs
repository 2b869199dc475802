//! Axum route handlers for the Documents API.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::documents::service::content_url;
use crate::errors::AppError;
use crate::models::document::{content_type_for, DocumentRecord, DocumentType};
use crate::state::AppState;

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Multipart field names accepted for the file part.
const FILE_FIELDS: &[&str] = &["pdf_file", "file"];

#[derive(Debug, Serialize)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub record: DocumentRecord,
    pub view_url: Option<String>,
}

struct UploadForm {
    file_name: String,
    content: bytes::Bytes,
    doc_type: DocumentType,
}

/// GET /api/v1/documents
pub async fn handle_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentRecord>>, AppError> {
    Ok(Json(state.documents.list().await?))
}

/// POST /api/v1/documents
///
/// Multipart upload. The file goes in `pdf_file` (or `file`); an optional
/// `type` field sets the kind for non-pdf files (default `signature`).
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentRecord>), AppError> {
    let form = read_upload_form(multipart).await?;
    let record = state
        .documents
        .upload(&form.content, &form.file_name, form.doc_type)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut file: Option<(String, bytes::Bytes)> = None;
    let mut doc_type = DocumentType::Signature;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if FILE_FIELDS.contains(&name.as_str()) {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
            file = Some((file_name, content));
        } else if name == "type" {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
            if !text.trim().is_empty() {
                doc_type = DocumentType::from(text.trim().to_string());
            }
        }
    }

    let (file_name, content) =
        file.ok_or_else(|| AppError::Validation("Please provide a file".to_string()))?;
    Ok(UploadForm {
        file_name,
        content,
        doc_type,
    })
}

/// GET /api/v1/documents/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentDetail>, AppError> {
    let view_url = state.documents.resolve_view_url(&id).await?;
    let record = state.documents.get(&id).await?;
    Ok(Json(DocumentDetail { record, view_url }))
}

/// DELETE /api/v1/documents/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.documents.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/documents/:id/download
pub async fn handle_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let (record, bytes) = state.documents.read_content(&id).await?;
    let download_name = if record.filename.is_empty() {
        id
    } else {
        record.filename.clone()
    };
    Ok(file_response(&download_name, bytes, "attachment"))
}

/// GET /api/v1/documents/:id/content
///
/// Streams the stored file inline. This is the view URL of pdf documents.
pub async fn handle_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let (record, bytes) = state.documents.read_content(&id).await?;
    Ok(file_response(&record.stored_filename, bytes, "inline"))
}

/// GET /api/v1/documents/:id/sign
///
/// Record plus the URL the signing view should embed. The content must exist.
pub async fn handle_sign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentDetail>, AppError> {
    let (record, _) = state.documents.content_path(&id).await?;
    let view_url = Some(content_url(&record.id));
    Ok(Json(DocumentDetail { record, view_url }))
}

/// GET /api/v1/files/:name
///
/// Serves content by the name it was uploaded under.
pub async fn handle_file_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let (record, bytes) = state.documents.read_by_original_name(&name).await?;
    Ok(file_response(&record.stored_filename, bytes, "inline"))
}

fn file_response(file_name: &str, bytes: Vec<u8>, disposition: &'static str) -> Response {
    // Uploaded names are sanitized ASCII; bootstrapped ones may not be and drop the filename.
    let disposition = HeaderValue::from_str(&format!("{disposition}; filename=\"{file_name}\""))
        .unwrap_or_else(|_| HeaderValue::from_static(disposition));
    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(content_type_for(file_name)),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}
