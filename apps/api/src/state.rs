use std::sync::Arc;

use crate::documents::service::DocumentService;
use crate::extract::TextExtractor;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Lifecycle service; owns the metadata store and the text generator.
    pub documents: Arc<DocumentService>,
    /// Pluggable text extraction. Default: `PdfTextExtractor`.
    pub extractor: Arc<dyn TextExtractor>,
}
