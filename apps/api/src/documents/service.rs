//! Document Lifecycle Service — upload, lookup, view-URL resolution, deletion,
//! analysis attachment and generation calls, on top of a `MetadataStore`.
//!
//! Upload writes the content file first and the metadata second. If the
//! metadata write fails the content file is removed again; a crash between the
//! two steps leaves an orphan content file, which `report_orphans` lists at
//! start-up. Deletion runs the other way round (content, then metadata) and a
//! crash there leaves metadata pointing at a missing file, which reads report
//! as not found.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::documents::sanitize::sanitize_filename;
use crate::errors::AppError;
use crate::llm_client::TextGenerator;
use crate::models::document::{DocumentRecord, DocumentType};
use crate::storage::bootstrap::{bootstrap_if_empty, is_content_file_name};
use crate::storage::{MetadataStore, METADATA_EXTENSION};

pub const ANALYSIS_PREFIX: &str = "analysis_";

/// Path of the inline content endpoint for a document.
pub fn content_url(id: &str) -> String {
    format!("/api/v1/documents/{id}/content")
}

/// Where a document can be viewed: pdfs stream from this service, Google docs
/// live at their stored link, anything else has no viewer.
pub fn view_url(record: &DocumentRecord) -> Option<String> {
    match record.doc_type {
        DocumentType::Pdf => Some(content_url(&record.id)),
        DocumentType::GoogleDoc => record.url.clone(),
        _ => None,
    }
}

pub struct DocumentService {
    store: Arc<dyn MetadataStore>,
    content_dir: PathBuf,
    generator: Arc<dyn TextGenerator>,
    llm_timeout: Duration,
}

impl DocumentService {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        content_dir: impl Into<PathBuf>,
        generator: Arc<dyn TextGenerator>,
        llm_timeout: Duration,
    ) -> Self {
        let content_dir = content_dir.into();
        let content_dir = std::path::absolute(&content_dir).unwrap_or(content_dir);
        Self {
            store,
            content_dir,
            generator,
            llm_timeout,
        }
    }

    pub fn generator(&self) -> &dyn TextGenerator {
        self.generator.as_ref()
    }

    /// All documents, newest first. On an empty store this first synthesizes
    /// records for any pre-existing content files.
    pub async fn list(&self) -> Result<Vec<DocumentRecord>, AppError> {
        let records = self.store.list().await?;
        if !records.is_empty() {
            return Ok(records);
        }
        bootstrap_if_empty(self.store.as_ref(), &self.content_dir).await
    }

    pub async fn get(&self, id: &str) -> Result<DocumentRecord, AppError> {
        self.store.get(id).await
    }

    /// Stores `content` as `{id}_{sanitized name}` and records its metadata.
    /// Document extensions are typed `pdf`; anything else gets `fallback_type`.
    pub async fn upload(
        &self,
        content: &[u8],
        original_name: &str,
        fallback_type: DocumentType,
    ) -> Result<DocumentRecord, AppError> {
        if original_name.trim().is_empty() {
            return Err(AppError::Validation("Please provide a file".to_string()));
        }
        let sanitized = sanitize_filename(original_name);
        if sanitized.is_empty() {
            return Err(AppError::Validation(format!(
                "File name '{original_name}' has no usable characters"
            )));
        }

        let id = Uuid::new_v4().to_string();
        let stored_filename = format!("{id}_{sanitized}");
        let file_path = self.content_dir.join(&stored_filename);
        let doc_type = DocumentType::infer(&sanitized, fallback_type);

        fs::write(&file_path, content).await?;

        let record = DocumentRecord::uploaded(id, sanitized, stored_filename, &file_path, doc_type);
        if let Err(e) = self.store.put(&record).await {
            if let Err(cleanup) = fs::remove_file(&file_path).await {
                warn!(
                    "Could not remove {} after failed metadata write: {cleanup}",
                    file_path.display()
                );
            }
            return Err(e);
        }

        info!(
            "Uploaded {} as {} ({} bytes, type {})",
            record.original_filename,
            record.id,
            content.len(),
            record.doc_type
        );
        Ok(record)
    }

    /// First record with this original name whose content is still on disk.
    /// Matches the name as given and in its sanitized form.
    pub async fn find_by_original_name(&self, name: &str) -> Result<DocumentRecord, AppError> {
        let sanitized = sanitize_filename(name);
        for record in self.store.list().await? {
            let name_matches = record.original_filename == name
                || (!sanitized.is_empty() && record.original_filename == sanitized);
            if !name_matches || record.stored_filename.is_empty() {
                continue;
            }
            if fs::try_exists(self.content_dir.join(&record.stored_filename))
                .await
                .unwrap_or(false)
            {
                return Ok(record);
            }
        }
        Err(AppError::NotFound(format!("No stored file found for {name}")))
    }

    /// Content of the file found by `find_by_original_name`.
    pub async fn read_by_original_name(
        &self,
        name: &str,
    ) -> Result<(DocumentRecord, Vec<u8>), AppError> {
        let record = self.find_by_original_name(name).await?;
        let bytes = fs::read(self.content_dir.join(&record.stored_filename)).await?;
        Ok((record, bytes))
    }

    pub async fn resolve_view_url(&self, id: &str) -> Result<Option<String>, AppError> {
        Ok(view_url(&self.get(id).await?))
    }

    /// The record plus the path of its content, which must exist.
    pub async fn content_path(&self, id: &str) -> Result<(DocumentRecord, PathBuf), AppError> {
        let record = self.get(id).await?;
        let path = PathBuf::from(&record.file_path);
        if record.file_path.is_empty() || !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(AppError::NotFound(format!(
                "Document file not found on disk for {id}"
            )));
        }
        Ok((record, path))
    }

    pub async fn read_content(&self, id: &str) -> Result<(DocumentRecord, Vec<u8>), AppError> {
        let (record, path) = self.content_path(id).await?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::NotFound(format!(
                    "Document file not found on disk for {id}"
                )))
            }
            Err(e) => return Err(e.into()),
        };
        Ok((record, bytes))
    }

    /// Removes the content file (and any attached analysis) if present, then
    /// the metadata. Returns the record as it was before deletion.
    pub async fn delete(&self, id: &str) -> Result<DocumentRecord, AppError> {
        let record = self.get(id).await?;

        if !record.file_path.is_empty() {
            remove_if_exists(Path::new(&record.file_path)).await?;
        }
        if let Some(analysis) = &record.analysis_path {
            remove_if_exists(Path::new(analysis)).await?;
        }
        self.store.delete(id).await?;

        info!("Deleted document {} ({})", id, record.filename);
        Ok(record)
    }

    /// Writes `analysis_{id}.txt` next to the content, overwriting an earlier
    /// analysis, and records its path on the document.
    pub async fn attach_analysis(
        &self,
        id: &str,
        analysis_text: &str,
    ) -> Result<DocumentRecord, AppError> {
        self.get(id).await?;

        let path = self.analysis_path_for(id);
        fs::write(&path, analysis_text).await?;

        let mut fields = Map::new();
        fields.insert(
            "analysis_path".to_string(),
            Value::String(path.to_string_lossy().into_owned()),
        );
        self.store.update(id, fields).await
    }

    pub fn analysis_path_for(&self, id: &str) -> PathBuf {
        self.content_dir.join(format!("{ANALYSIS_PREFIX}{id}.txt"))
    }

    /// One generation call, bounded by the configured timeout. No retries.
    pub async fn generate_text(
        &self,
        system_prompt: &str,
        user_body: &str,
    ) -> Result<String, AppError> {
        match tokio::time::timeout(
            self.llm_timeout,
            self.generator.complete(system_prompt, user_body),
        )
        .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(AppError::Backend(format!(
                "{} call timed out after {}s",
                self.generator.backend_name(),
                self.llm_timeout.as_secs()
            ))),
        }
    }

    /// Content files no record points at. Logged, never adopted: bootstrap
    /// only runs on an empty store, and on an empty store nothing is reported
    /// since the first `list` adopts every content file.
    pub async fn report_orphans(&self) -> Result<Vec<String>, AppError> {
        let referenced: HashSet<String> = self
            .store
            .list()
            .await?
            .into_iter()
            .map(|r| r.stored_filename)
            .collect();
        if referenced.is_empty() {
            return Ok(Vec::new());
        }

        let mut orphans = Vec::new();
        let mut entries = fs::read_dir(&self.content_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let is_metadata = Path::new(&name)
                .extension()
                .map(|e| e == METADATA_EXTENSION)
                .unwrap_or(false);
            if is_metadata || name.starts_with(ANALYSIS_PREFIX) || !is_content_file_name(&name) {
                continue;
            }
            if !referenced.contains(&name) {
                orphans.push(name);
            }
        }

        orphans.sort();
        for name in &orphans {
            warn!("Content file {name} has no metadata record");
        }
        Ok(orphans)
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), AppError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::storage::JsonSidecarStore;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use tempfile::TempDir;

    /// Echoes its inputs, or fails the way it was told to.
    pub(crate) struct StubGenerator {
        pub fail_unavailable: bool,
        pub delay: Option<Duration>,
    }

    impl StubGenerator {
        pub(crate) fn echo() -> Self {
            Self {
                fail_unavailable: false,
                delay: None,
            }
        }
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        async fn complete(&self, system_prompt: &str, body: &str) -> Result<String, LlmError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_unavailable {
                return Err(LlmError::Unavailable("stub offline".to_string()));
            }
            Ok(format!("[{system_prompt}] {}", body.trim()))
        }

        fn backend_name(&self) -> &'static str {
            "stub"
        }

        fn model(&self) -> &str {
            "stub-model"
        }
    }

    pub(crate) async fn service_with(generator: StubGenerator) -> (DocumentService, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = JsonSidecarStore::open(dir.path()).await.unwrap();
        let service = DocumentService::new(
            Arc::new(store),
            dir.path(),
            Arc::new(generator),
            Duration::from_secs(5),
        );
        (service, dir)
    }

    pub(crate) async fn service() -> (DocumentService, TempDir) {
        service_with(StubGenerator::echo()).await
    }

    #[tokio::test]
    async fn test_upload_writes_content_and_metadata() {
        let (svc, dir) = service().await;
        let record = svc
            .upload(b"%PDF-1.4 test", "résumé final.pdf", DocumentType::Signature)
            .await
            .unwrap();

        assert_eq!(record.original_filename, "resume_final.pdf");
        assert_eq!(record.filename, "resume_final.pdf");
        assert_eq!(record.stored_filename, format!("{}_resume_final.pdf", record.id));
        assert!(!record.stored_filename.contains('/'));
        assert_eq!(record.doc_type, DocumentType::Pdf);
        assert!(record.timestamp.is_some());

        let on_disk = std::fs::read(dir.path().join(&record.stored_filename)).unwrap();
        assert_eq!(on_disk, b"%PDF-1.4 test");
        assert!(dir.path().join(format!("{}.json", record.id)).exists());
        assert_eq!(svc.get(&record.id).await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_upload_then_find_by_original_name() {
        let (svc, _dir) = service().await;
        let record = svc
            .upload(b"pdf", "résumé final.pdf", DocumentType::Signature)
            .await
            .unwrap();

        let found = svc.find_by_original_name("résumé final.pdf").await.unwrap();
        assert_eq!(found.id, record.id);
        let found = svc.find_by_original_name("resume_final.pdf").await.unwrap();
        assert_eq!(found.id, record.id);
    }

    #[tokio::test]
    async fn test_upload_ids_unique() {
        let (svc, _dir) = service().await;
        let mut ids = HashSet::new();
        for _ in 0..25 {
            let r = svc.upload(b"x", "same.pdf", DocumentType::Pdf).await.unwrap();
            ids.insert(r.id);
        }
        assert_eq!(ids.len(), 25);
        assert_eq!(svc.list().await.unwrap().len(), 25);
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_names() {
        let (svc, _dir) = service().await;
        for name in ["", "   ", "///"] {
            assert!(
                matches!(
                    svc.upload(b"x", name, DocumentType::Pdf).await,
                    Err(AppError::Validation(_))
                ),
                "{name:?}"
            );
        }
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_non_pdf_uses_fallback_type() {
        let (svc, _dir) = service().await;
        let r = svc.upload(b"png", "sig.png", DocumentType::Signature).await.unwrap();
        assert_eq!(r.doc_type, DocumentType::Signature);
        assert_eq!(svc.resolve_view_url(&r.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_skips_records_whose_content_is_gone() {
        let (svc, dir) = service().await;
        let gone = svc.upload(b"1", "cv.pdf", DocumentType::Pdf).await.unwrap();
        std::fs::remove_file(dir.path().join(&gone.stored_filename)).unwrap();

        assert!(matches!(
            svc.find_by_original_name("cv.pdf").await,
            Err(AppError::NotFound(_))
        ));

        let present = svc.upload(b"2", "cv.pdf", DocumentType::Pdf).await.unwrap();
        assert_eq!(svc.find_by_original_name("cv.pdf").await.unwrap().id, present.id);
    }

    #[tokio::test]
    async fn test_resolve_view_url() {
        let (svc, _dir) = service().await;
        let pdf = svc.upload(b"x", "a.pdf", DocumentType::Pdf).await.unwrap();
        assert_eq!(
            svc.resolve_view_url(&pdf.id).await.unwrap(),
            Some(format!("/api/v1/documents/{}/content", pdf.id))
        );

        let mut gdoc = pdf.clone();
        gdoc.id = "gdoc-1".to_string();
        gdoc.doc_type = DocumentType::GoogleDoc;
        gdoc.url = Some("https://docs.google.com/document/d/abc".to_string());
        svc.store.put(&gdoc).await.unwrap();
        assert_eq!(
            svc.resolve_view_url("gdoc-1").await.unwrap().as_deref(),
            Some("https://docs.google.com/document/d/abc")
        );

        assert!(matches!(
            svc.resolve_view_url("missing").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_content_analysis_and_metadata() {
        let (svc, dir) = service().await;
        let r = svc.upload(b"x", "a.pdf", DocumentType::Pdf).await.unwrap();
        svc.attach_analysis(&r.id, "good").await.unwrap();

        svc.delete(&r.id).await.unwrap();

        assert!(!dir.path().join(&r.stored_filename).exists());
        assert!(!svc.analysis_path_for(&r.id).exists());
        assert!(matches!(svc.get(&r.id).await, Err(AppError::NotFound(_))));
        assert!(svc.list().await.unwrap().iter().all(|d| d.id != r.id));
    }

    #[tokio::test]
    async fn test_delete_with_missing_content_still_removes_metadata() {
        let (svc, dir) = service().await;
        let r = svc.upload(b"x", "a.pdf", DocumentType::Pdf).await.unwrap();
        std::fs::remove_file(dir.path().join(&r.stored_filename)).unwrap();

        svc.delete(&r.id).await.unwrap();
        assert!(matches!(svc.get(&r.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let (svc, _dir) = service().await;
        let keep = svc.upload(b"x", "a.pdf", DocumentType::Pdf).await.unwrap();
        assert!(matches!(svc.delete("nope").await, Err(AppError::NotFound(_))));
        assert_eq!(svc.list().await.unwrap()[0].id, keep.id);
    }

    #[tokio::test]
    async fn test_read_content_missing_file_is_not_found() {
        let (svc, dir) = service().await;
        let r = svc.upload(b"bytes", "a.pdf", DocumentType::Pdf).await.unwrap();
        assert_eq!(svc.read_content(&r.id).await.unwrap().1, b"bytes");

        std::fs::remove_file(dir.path().join(&r.stored_filename)).unwrap();
        assert!(matches!(
            svc.read_content(&r.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_attach_analysis_overwrites_and_records_path() {
        let (svc, _dir) = service().await;
        let r = svc.upload(b"x", "a.pdf", DocumentType::Pdf).await.unwrap();

        svc.attach_analysis(&r.id, "first").await.unwrap();
        let updated = svc.attach_analysis(&r.id, "second").await.unwrap();

        let path = svc.analysis_path_for(&r.id);
        assert!(path.ends_with(format!("analysis_{}.txt", r.id)));
        assert_eq!(updated.analysis_path.as_deref(), Some(path.to_str().unwrap()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(updated.original_filename, r.original_filename);
        assert_eq!(updated.timestamp, r.timestamp);
    }

    #[tokio::test]
    async fn test_attach_analysis_unknown_id() {
        let (svc, _dir) = service().await;
        assert!(matches!(
            svc.attach_analysis("ghost", "text").await,
            Err(AppError::NotFound(_))
        ));
        assert!(!svc.analysis_path_for("ghost").exists());
    }

    #[tokio::test]
    async fn test_list_bootstraps_existing_files() {
        let (svc, dir) = service().await;
        std::fs::write(dir.path().join("legacy.pdf"), b"old").unwrap();
        std::fs::write(dir.path().join("legacy-sig.jpg"), b"old").unwrap();

        let listed = svc.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        let again = svc.list().await.unwrap();
        assert_eq!(again.len(), 2);
    }

    #[tokio::test]
    async fn test_report_orphans() {
        let (svc, dir) = service().await;
        let r = svc.upload(b"x", "a.pdf", DocumentType::Pdf).await.unwrap();
        svc.attach_analysis(&r.id, "notes").await.unwrap();
        std::fs::write(dir.path().join("stray.pdf"), b"lost").unwrap();

        assert_eq!(svc.report_orphans().await.unwrap(), vec!["stray.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_report_orphans_empty_store_reports_nothing() {
        let (svc, dir) = service().await;
        std::fs::write(dir.path().join("legacy.pdf"), b"old").unwrap();

        assert!(svc.report_orphans().await.unwrap().is_empty());
        assert_eq!(svc.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_does_not_bootstrap_when_records_lack_type() {
        let (svc, dir) = service().await;
        std::fs::write(
            dir.path().join("abc.json"),
            br#"{"id": "abc", "original_filename": "old.pdf", "stored_filename": "old.pdf"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("old.pdf"), b"old").unwrap();
        std::fs::write(dir.path().join("other.pdf"), b"old").unwrap();

        let listed = svc.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "abc");
        assert_eq!(view_url(&listed[0]), None);
    }

    /// Store whose writes always fail; reads see nothing.
    struct FailingStore;

    #[async_trait]
    impl MetadataStore for FailingStore {
        async fn put(&self, _record: &DocumentRecord) -> Result<(), AppError> {
            Err(AppError::Io(std::io::Error::new(
                ErrorKind::PermissionDenied,
                "read-only store",
            )))
        }

        async fn get(&self, id: &str) -> Result<DocumentRecord, AppError> {
            Err(AppError::NotFound(format!("Document {id} not found")))
        }

        async fn list(&self) -> Result<Vec<DocumentRecord>, AppError> {
            Ok(Vec::new())
        }

        async fn update(
            &self,
            id: &str,
            _fields: Map<String, Value>,
        ) -> Result<DocumentRecord, AppError> {
            Err(AppError::NotFound(format!("Document {id} not found")))
        }

        async fn delete(&self, id: &str) -> Result<(), AppError> {
            Err(AppError::NotFound(format!("Document {id} not found")))
        }
    }

    #[tokio::test]
    async fn test_upload_removes_content_when_metadata_write_fails() {
        let dir = TempDir::new().unwrap();
        let svc = DocumentService::new(
            Arc::new(FailingStore),
            dir.path(),
            Arc::new(StubGenerator::echo()),
            Duration::from_secs(5),
        );

        let err = svc
            .upload(b"%PDF-1.4", "offer.pdf", DocumentType::Signature)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_generate_text_delegates() {
        let (svc, _dir) = service().await;
        assert_eq!(svc.generate_text("sys", " body ").await.unwrap(), "[sys] body");
    }

    #[tokio::test]
    async fn test_generate_text_propagates_unavailable() {
        let (svc, _dir) = service_with(StubGenerator {
            fail_unavailable: true,
            delay: None,
        })
        .await;
        assert!(matches!(
            svc.generate_text("s", "b").await,
            Err(AppError::BackendUnavailable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_text_times_out() {
        let (svc, _dir) = service_with(StubGenerator {
            fail_unavailable: false,
            delay: Some(Duration::from_secs(600)),
        })
        .await;
        assert!(matches!(
            svc.generate_text("s", "b").await,
            Err(AppError::Backend(msg)) if msg.contains("timed out")
        ));
    }
}
