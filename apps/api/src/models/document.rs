use std::fmt;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Extensions treated as documents. Anything uploaded with one of these is a `pdf`.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf"];
/// Extensions treated as images (signatures, scans).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Content kind of a document. Unknown kinds written by other tools survive a
/// read/write cycle through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentType {
    Pdf,
    Signature,
    GoogleDoc,
    Other(String),
}

impl DocumentType {
    pub fn as_str(&self) -> &str {
        match self {
            DocumentType::Pdf => "pdf",
            DocumentType::Signature => "signature",
            DocumentType::GoogleDoc => "google_doc",
            DocumentType::Other(s) => s.as_str(),
        }
    }

    /// True for records that carry no `type` key at all.
    pub fn is_unset(&self) -> bool {
        matches!(self, DocumentType::Other(s) if s.is_empty())
    }

    /// Document extensions map to `Pdf`; everything else gets `fallback`.
    pub fn infer(file_name: &str, fallback: DocumentType) -> DocumentType {
        if has_extension(file_name, DOCUMENT_EXTENSIONS) {
            DocumentType::Pdf
        } else {
            fallback
        }
    }
}

impl Default for DocumentType {
    fn default() -> Self {
        DocumentType::Other(String::new())
    }
}

impl From<String> for DocumentType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pdf" => DocumentType::Pdf,
            "signature" => DocumentType::Signature,
            "google_doc" => DocumentType::GoogleDoc,
            _ => DocumentType::Other(s),
        }
    }
}

impl From<DocumentType> for String {
    fn from(t: DocumentType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state. Only `Uploaded` is ever assigned by this service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentStatus {
    #[default]
    Uploaded,
    Signed,
    Other(String),
}

impl DocumentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Signed => "signed",
            DocumentStatus::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for DocumentStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "uploaded" => DocumentStatus::Uploaded,
            "signed" => DocumentStatus::Signed,
            _ => DocumentStatus::Other(s),
        }
    }
}

impl From<DocumentStatus> for String {
    fn from(s: DocumentStatus) -> Self {
        s.as_str().to_string()
    }
}

/// Metadata for one document, persisted as `{id}.json`.
///
/// Keys this struct does not know about are kept in `extra` so that a shallow
/// merge never drops data written by another tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    #[serde(default)]
    pub original_filename: String,
    #[serde(default)]
    pub stored_filename: String,
    /// Display name. Same as `original_filename` for everything this service writes.
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(rename = "type", default, skip_serializing_if = "DocumentType::is_unset")]
    pub doc_type: DocumentType,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DocumentRecord {
    /// A freshly uploaded record stamped with the current time.
    pub fn uploaded(
        id: String,
        original_filename: String,
        stored_filename: String,
        file_path: &Path,
        doc_type: DocumentType,
    ) -> Self {
        Self {
            id,
            filename: original_filename.clone(),
            original_filename,
            stored_filename,
            file_path: file_path.to_string_lossy().into_owned(),
            doc_type,
            status: DocumentStatus::Uploaded,
            timestamp: Some(now_timestamp()),
            url: None,
            analysis_path: None,
            extra: Map::new(),
        }
    }

    /// Timestamp used for ordering; empty strings count as missing.
    pub fn sort_timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref().filter(|t| !t.is_empty())
    }
}

/// Orders newest first; records without a timestamp go last, keeping their
/// relative order.
pub fn sort_newest_first(records: &mut [DocumentRecord]) {
    // ISO-8601 UTC strings in one format order lexicographically.
    records.sort_by(|a, b| match (a.sort_timestamp(), b.sort_timestamp()) {
        (Some(ta), Some(tb)) => tb.cmp(ta),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

/// Current UTC time as `2024-05-01T12:00:00.123456Z`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn has_extension(file_name: &str, extensions: &[&str]) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// MIME type served for a stored file.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
