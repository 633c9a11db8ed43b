//! Input resolution: turn a user-supplied path or URL into a [`Document`].
//!
//! Only metadata is gathered here. The declared media type comes from the
//! file extension (local files) or the `Content-Type` header (downloads), and
//! the session validates it before any extraction happens. Local files are
//! not read at this stage; downloads are held in memory.

use crate::document::{essence, mime_type_for_path, Document, OCTET_STREAM_MIME_TYPE};
use crate::error::PdfQaError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a document handle.
///
/// If the input is a URL, download it into memory.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<Document, PdfQaError> {
    if input.trim().is_empty() {
        return Err(PdfQaError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence and read permission.
fn resolve_local(path_str: &str) -> Result<Document, PdfQaError> {
    let path = PathBuf::from(path_str);

    let metadata = match std::fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PdfQaError::PermissionDenied { path });
        }
        Err(_) => return Err(PdfQaError::FileNotFound { path }),
    };
    if !metadata.is_file() {
        return Err(PdfQaError::InvalidInput {
            input: path_str.to_string(),
        });
    }

    // Check read permission by attempting to open
    if let Err(e) = std::fs::File::open(&path) {
        return Err(if e.kind() == std::io::ErrorKind::PermissionDenied {
            PdfQaError::PermissionDenied { path }
        } else {
            PdfQaError::FileNotFound { path }
        });
    }

    debug!("Resolved local file: {}", path.display());
    Ok(Document::from_file(path, metadata.len()))
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Document, PdfQaError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PdfQaError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            PdfQaError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PdfQaError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(PdfQaError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = extract_filename(url);
    let header_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let mime_type = declared_type(header_type.as_deref(), Path::new(&filename));

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            PdfQaError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PdfQaError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    info!("Downloaded {} bytes ({})", bytes.len(), mime_type);
    Ok(Document::from_bytes(filename, mime_type, bytes.to_vec()))
}

/// Pick the declared type of a download.
///
/// A specific `Content-Type` wins; generic ones (`application/octet-stream`,
/// missing header) fall back to the file extension.
fn declared_type(content_type: Option<&str>, filename: &Path) -> String {
    match content_type.map(essence) {
        Some(t) if !t.is_empty() && !t.eq_ignore_ascii_case(OCTET_STREAM_MIME_TYPE) => {
            t.to_ascii_lowercase()
        }
        _ => mime_type_for_path(filename).to_string(),
    }
}

/// Extract a reasonable filename from the URL.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
