pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::assistant::handlers as assistant;
use crate::documents::handlers::{self as documents, MAX_UPLOAD_BYTES};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Documents
        .route(
            "/api/v1/documents",
            get(documents::handle_list).post(documents::handle_upload),
        )
        .route(
            "/api/v1/documents/:id",
            get(documents::handle_get).delete(documents::handle_delete),
        )
        .route(
            "/api/v1/documents/:id/download",
            get(documents::handle_download),
        )
        .route(
            "/api/v1/documents/:id/content",
            get(documents::handle_content),
        )
        .route("/api/v1/documents/:id/sign", get(documents::handle_sign))
        .route("/api/v1/files/:name", get(documents::handle_file_by_name))
        // Assistant
        .route(
            "/api/v1/documents/:id/analysis",
            post(assistant::handle_analyze_document),
        )
        .route(
            "/api/v1/documents/:id/resume-analysis",
            post(assistant::handle_analyze_resume),
        )
        .route(
            "/api/v1/generate/job-description",
            post(assistant::handle_generate_job_description),
        )
        .route(
            "/api/v1/generate/resume",
            post(assistant::handle_generate_resume),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
