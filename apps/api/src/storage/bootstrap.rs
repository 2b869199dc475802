//! Bootstrap migration — synthesizes metadata for content files that predate
//! the metadata store.
//!
//! Runs only while the store is empty. Once any record exists it never runs
//! again, so it does not reconcile files uploaded later without metadata.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::{
    has_extension, now_timestamp, sort_newest_first, DocumentRecord, DocumentStatus,
    DocumentType, DOCUMENT_EXTENSIONS, IMAGE_EXTENSIONS,
};
use crate::storage::MetadataStore;

/// Creates one record per recognized content file when the store holds no
/// records. Returns the records written (empty when the store was non-empty).
pub async fn bootstrap_if_empty(
    store: &dyn MetadataStore,
    content_dir: &Path,
) -> Result<Vec<DocumentRecord>, AppError> {
    if !store.list().await?.is_empty() {
        return Ok(Vec::new());
    }

    let candidates = recognized_files(content_dir).await?;
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    info!(
        "Metadata store is empty; creating records for {} existing file(s)",
        candidates.len()
    );

    let mut created = Vec::with_capacity(candidates.len());
    for (name, path) in candidates {
        let record = record_for_existing_file(name, &path);
        store.put(&record).await?;
        created.push(record);
    }

    sort_newest_first(&mut created);
    Ok(created)
}

fn record_for_existing_file(name: String, path: &Path) -> DocumentRecord {
    DocumentRecord {
        id: Uuid::new_v4().to_string(),
        original_filename: name.clone(),
        stored_filename: name.clone(),
        filename: name.clone(),
        file_path: path.to_string_lossy().into_owned(),
        doc_type: DocumentType::infer(&name, DocumentType::Signature),
        status: DocumentStatus::Uploaded,
        timestamp: Some(now_timestamp()),
        url: None,
        analysis_path: None,
        extra: Default::default(),
    }
}

/// Regular files in `dir` with a document or image extension, sorted by name.
async fn recognized_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, AppError> {
    let mut found = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            warn!("Skipping non UTF-8 file name in {}", dir.display());
            continue;
        };
        if !is_content_file_name(&name) {
            continue;
        }
        if !entry.file_type().await?.is_file() {
            continue;
        }
        found.push((name, absolute(&entry.path())));
    }

    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}

pub fn is_content_file_name(name: &str) -> bool {
    has_extension(name, DOCUMENT_EXTENSIONS) || has_extension(name, IMAGE_EXTENSIONS)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonSidecarStore;
    use std::collections::HashSet;
    use tempfile::TempDir;

    async fn setup(files: &[&str]) -> (JsonSidecarStore, TempDir) {
        let dir = TempDir::new().unwrap();
        for f in files {
            std::fs::write(dir.path().join(f), b"content").unwrap();
        }
        let store = JsonSidecarStore::open(dir.path()).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_bootstrap_creates_one_record_per_file() {
        let (store, dir) = setup(&["contract.pdf", "sig.png", "scan.JPEG", "notes.txt"]).await;

        let created = bootstrap_if_empty(&store, dir.path()).await.unwrap();
        assert_eq!(created.len(), 3);

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 3);

        let ids: HashSet<_> = listed.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids.len(), 3);

        for r in &listed {
            assert_eq!(r.original_filename, r.stored_filename);
            assert_eq!(r.filename, r.stored_filename);
            assert_eq!(r.status, DocumentStatus::Uploaded);
            assert!(Path::new(&r.file_path).is_absolute());
            let expected = if r.filename == "contract.pdf" {
                DocumentType::Pdf
            } else {
                DocumentType::Signature
            };
            assert_eq!(r.doc_type, expected, "{}", r.filename);
        }
    }

    #[tokio::test]
    async fn test_bootstrap_runs_once() {
        let (store, dir) = setup(&["a.pdf", "b.pdf", "c.png"]).await;

        assert_eq!(bootstrap_if_empty(&store, dir.path()).await.unwrap().len(), 3);
        std::fs::write(dir.path().join("late.pdf"), b"late").unwrap();

        assert!(bootstrap_if_empty(&store, dir.path()).await.unwrap().is_empty());
        assert_eq!(store.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_bootstrap_with_no_files_is_noop() {
        let (store, dir) = setup(&["readme.md"]).await;
        assert!(bootstrap_if_empty(&store, dir.path()).await.unwrap().is_empty());
        assert!(store.list().await.unwrap().is_empty());
    }
}
