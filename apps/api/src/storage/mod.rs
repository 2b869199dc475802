//! Metadata Store — one JSON sidecar file per document, named `{id}.json`.
//!
//! The file is the only source of truth for a record; there is no index.
//! Callers hold an `Arc<dyn MetadataStore>` so the sidecar layout can be
//! swapped for an embedded database without touching them.
//!
//! Concurrent writers to the same id race with last-write-wins semantics.

pub mod bootstrap;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::models::document::{sort_newest_first, DocumentRecord};

pub const METADATA_EXTENSION: &str = "json";

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Writes the full record, replacing whatever was stored under its id.
    async fn put(&self, record: &DocumentRecord) -> Result<(), AppError>;

    async fn get(&self, id: &str) -> Result<DocumentRecord, AppError>;

    /// Every readable record, newest first. Unreadable records are skipped.
    async fn list(&self) -> Result<Vec<DocumentRecord>, AppError>;

    /// Shallow-merges `fields` into the stored record and persists it.
    async fn update(
        &self,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<DocumentRecord, AppError>;

    /// Removes the metadata only. Content files are left alone.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

/// Sidecar-file implementation of `MetadataStore`.
#[derive(Debug, Clone)]
pub struct JsonSidecarStore {
    dir: PathBuf,
}

impl JsonSidecarStore {
    /// Opens the store, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{METADATA_EXTENSION}"))
    }

    async fn write_record(&self, record: &DocumentRecord) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("serializing {}: {e}", record.id)))?;

        // Write-then-rename so a reader never sees a half-written file.
        // The temp name does not end in `.json`, so `list` never picks it up.
        let path = self.path_for(&record.id);
        let tmp = self.dir.join(format!("{}.{METADATA_EXTENSION}.tmp", record.id));
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for JsonSidecarStore {
    async fn put(&self, record: &DocumentRecord) -> Result<(), AppError> {
        if !is_valid_id(&record.id) {
            return Err(AppError::Validation(format!(
                "Invalid document id '{}'",
                record.id
            )));
        }
        self.write_record(record).await?;
        debug!("Wrote metadata for {}", record.id);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<DocumentRecord, AppError> {
        if !is_valid_id(id) {
            return Err(not_found(id));
        }
        let bytes = match fs::read(self.path_for(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found(id)),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|source| AppError::CorruptRecord {
            id: id.to_string(),
            source,
        })
    }

    async fn list(&self) -> Result<Vec<DocumentRecord>, AppError> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_metadata = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == METADATA_EXTENSION)
                .unwrap_or(false);
            if !is_metadata {
                continue;
            }

            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping unreadable metadata {}: {e}", path.display());
                    continue;
                }
            };
            match serde_json::from_slice::<DocumentRecord>(&bytes) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping malformed metadata {}: {e}", path.display()),
            }
        }

        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn update(
        &self,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<DocumentRecord, AppError> {
        let existing = self.get(id).await?;

        if let Some(new_id) = fields.get("id") {
            if new_id.as_str() != Some(id) {
                return Err(AppError::Validation(format!(
                    "Document id is immutable (tried to change {id})"
                )));
            }
        }

        let mut merged = match serde_json::to_value(&existing) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "record {id} serialized to non-object: {other}"
                )))
            }
            Err(e) => return Err(AppError::Internal(anyhow::anyhow!("serializing {id}: {e}"))),
        };
        merged.extend(fields);

        let updated: DocumentRecord = serde_json::from_value(Value::Object(merged))
            .map_err(|e| AppError::Validation(format!("Invalid update for {id}: {e}")))?;

        self.write_record(&updated).await?;
        info!("Updated metadata for {id}");
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        if !is_valid_id(id) {
            return Err(not_found(id));
        }
        match fs::remove_file(self.path_for(id)).await {
            Ok(()) => {
                info!("Deleted metadata for {id}");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(id)),
            Err(e) => Err(e.into()),
        }
    }
}

/// Ids become file names, so only a safe alphabet is accepted.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Metadata not found for id: {id}"))
}
