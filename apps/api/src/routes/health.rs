use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, version and the active generation backend.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let generator = state.documents.generator();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "signdesk",
        "llm_backend": generator.backend_name(),
        "llm_model": generator.model(),
    }))
}
