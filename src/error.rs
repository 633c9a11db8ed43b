//! Error types for the edgequake-pdfqa library.
//!
//! Four error types map onto four distinct failure modes:
//!
//! * [`PdfQaError`] — **Fatal**: the session cannot be set up at all (input
//!   file missing, download failed, provider not configured). Returned as
//!   `Err(PdfQaError)` from the top-level `ask*` / `extract_text` functions.
//!
//! * [`ExtractionError`] — the [`crate::pipeline::extract::TextExtractor`]
//!   could not turn the PDF bytes into text. Its `Display` output is what the
//!   user sees, so every message is written for a human.
//!
//! * [`ServiceError`] — the [`crate::pipeline::query::QueryService`] failed.
//!   The detail is logged but never shown to the user.
//!
//! * [`PipelineError`] — the user-facing outcome of one session operation.
//!   Every variant resolves to an error status plus a short message; none of
//!   them is fatal to the process.

use std::path::PathBuf;
use thiserror::Error;

/// Surfaced when the selected file does not declare the PDF media type.
pub const INVALID_FILE_TYPE_MESSAGE: &str = "Invalid file type. Please upload a PDF.";

/// Surfaced when a question is submitted before a document is ready.
pub const NO_DOCUMENT_MESSAGE: &str = "Please upload and process a PDF first.";

/// Surfaced when the submitted question is blank.
pub const EMPTY_QUESTION_MESSAGE: &str = "Please enter a question.";

/// Surfaced for every query-service failure, whatever the underlying cause.
pub const SERVICE_FAILURE_MESSAGE: &str =
    "Failed to get a response from the AI model. Please check your API key and network connection.";

/// Used when the extractor fails without a usable message.
pub const EXTRACTION_FALLBACK_MESSAGE: &str = "An unknown error occurred during PDF parsing.";

/// All fatal errors returned by the edgequake-pdfqa library.
#[derive(Debug, Error)]
pub enum PdfQaError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Session errors ────────────────────────────────────────────────────
    /// A session operation ended in an error state.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure reported by a text extractor.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The document content could not be read.
    #[error("Failed to read '{name}': {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_DYNAMIC_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("The PDF is corrupt or unsupported: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was provided.
    #[error("The PDF is encrypted and requires a password.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for the encrypted PDF.")]
    WrongPassword,

    /// The text layer of one page could not be loaded.
    #[error("Failed to read the text of page {page}: {detail}")]
    PageText { page: usize, detail: String },

    /// Unexpected internal error (e.g. the extraction task panicked).
    #[error("{0}")]
    Internal(String),
}

/// Failure reported by a query service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The LLM API returned an error (network, auth, quota, malformed response).
    #[error("LLM API error: {message}")]
    Api { message: String },

    /// The call did not finish within the configured timeout.
    #[error("LLM call timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// User-facing outcome of a failed session operation.
///
/// `Display` yields exactly the message the presentation layer should show.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Bad input shape: wrong file type or an empty question.
    #[error("{0}")]
    Validation(String),

    /// The operation is not allowed in the current state.
    #[error("{0}")]
    Precondition(String),

    /// The PDF could not be turned into text; carries the extractor's message.
    #[error("{0}")]
    Extraction(String),

    /// The query service failed; always the fixed generic message.
    #[error("{}", SERVICE_FAILURE_MESSAGE)]
    Service,
}

impl PipelineError {
    pub fn invalid_file_type() -> Self {
        Self::Validation(INVALID_FILE_TYPE_MESSAGE.to_string())
    }

    pub fn empty_question() -> Self {
        Self::Validation(EMPTY_QUESTION_MESSAGE.to_string())
    }

    pub fn no_document() -> Self {
        Self::Precondition(NO_DOCUMENT_MESSAGE.to_string())
    }

    /// Map an extractor failure to the message shown to the user.
    pub fn from_extraction(err: &ExtractionError) -> Self {
        let message = err.to_string();
        if message.trim().is_empty() {
            Self::Extraction(EXTRACTION_FALLBACK_MESSAGE.to_string())
        } else {
            Self::Extraction(message)
        }
    }
}
