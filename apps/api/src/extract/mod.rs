//! Text Extraction Adapter — file path in, plain text out.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("extraction of {path} timed out after {secs}s")]
    TimedOut { path: String, secs: u64 },

    #[error("extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, path: &Path) -> Result<String, ExtractError>;
}

/// PDF text extraction backed by `pdf-extract`, run on the blocking pool.
///
/// Pages are joined with a newline; pages that yield no text contribute nothing.
pub struct PdfTextExtractor {
    timeout: Duration,
}

impl PdfTextExtractor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, path: &Path) -> Result<String, ExtractError> {
        let owned: PathBuf = path.to_path_buf();
        let task = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text(&owned).map_err(|e| ExtractError::Unreadable {
                path: owned.display().to_string(),
                message: e.to_string(),
            })
        });

        let raw = match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => joined??,
            Err(_) => {
                return Err(ExtractError::TimedOut {
                    path: path.display().to_string(),
                    secs: self.timeout.as_secs(),
                })
            }
        };

        let text = join_pages(&raw);
        debug!("Extracted {} chars from {}", text.len(), path.display());
        Ok(text)
    }
}

/// `pdf-extract` separates pages with form feeds. Keep non-empty pages, one
/// trailing newline each.
fn join_pages(raw: &str) -> String {
    let mut out = String::new();
    for page in raw.split('\u{000C}') {
        let page = page.trim();
        if page.is_empty() {
            continue;
        }
        out.push_str(page);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_join_pages_skips_blank_pages() {
        let raw = "Jane Doe\nEngineer\u{000C}  \u{000C}Experience\n";
        assert_eq!(join_pages(raw), "Jane Doe\nEngineer\nExperience\n");
    }

    #[test]
    fn test_join_pages_empty() {
        assert_eq!(join_pages(""), "");
    }

    #[tokio::test]
    async fn test_garbage_file_is_extraction_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        let extractor = PdfTextExtractor::new(Duration::from_secs(10));
        assert!(extractor.extract_text(&path).await.is_err());
    }
}
