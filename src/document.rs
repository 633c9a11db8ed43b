//! The user-selected document and its declared media type.
//!
//! A [`Document`] is immutable once built: selecting another file replaces it
//! wholesale. The declared MIME type is all the session looks at when it
//! validates a selection, so a non-PDF is rejected before any byte is read.

use crate::error::ExtractionError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The only media type the session accepts.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Fallback type for unknown extensions.
pub const OCTET_STREAM_MIME_TYPE: &str = "application/octet-stream";

/// Where the document bytes live.
#[derive(Debug, Clone)]
pub enum DocumentContent {
    /// A file on the local file system, read lazily.
    File(PathBuf),
    /// Bytes already held in memory (downloads, uploads, tests).
    Memory(Arc<[u8]>),
}

/// A file selected by the user.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// Display name, usually the file name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Declared media type, e.g. `application/pdf`.
    pub mime_type: String,
    #[serde(skip)]
    content: DocumentContent,
}

impl Document {
    /// Build a document from in-memory bytes with an explicit declared type.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime_type: mime_type.into(),
            content: DocumentContent::Memory(bytes),
        }
    }

    /// Build a document backed by a local file.
    ///
    /// The declared type comes from the file extension; nothing is read.
    pub fn from_file(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            size,
            mime_type: mime_type_for_path(&path).to_string(),
            content: DocumentContent::File(path),
        }
    }

    /// Override the declared media type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn content(&self) -> &DocumentContent {
        &self.content
    }

    /// Whether the declared type is the PDF media type.
    ///
    /// Parameters (`; charset=...`) and letter case are ignored.
    pub fn is_pdf(&self) -> bool {
        essence(&self.mime_type).eq_ignore_ascii_case(PDF_MIME_TYPE)
    }

    /// Read the full byte content.
    pub async fn read_bytes(&self) -> Result<Vec<u8>, ExtractionError> {
        match &self.content {
            DocumentContent::Memory(bytes) => Ok(bytes.to_vec()),
            DocumentContent::File(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|source| ExtractionError::Read {
                        name: self.name.clone(),
                        source,
                    })
            }
        }
    }
}

/// Strip media-type parameters: `"application/pdf; x=y"` → `"application/pdf"`.
pub fn essence(mime_type: &str) -> &str {
    mime_type.split(';').next().unwrap_or("").trim()
}

/// Guess a declared media type from a file extension.
pub fn mime_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => PDF_MIME_TYPE,
        "txt" | "text" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "epub" => "application/epub+zip",
        "zip" => "application/zip",
        _ => OCTET_STREAM_MIME_TYPE,
    }
}
