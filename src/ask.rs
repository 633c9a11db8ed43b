//! One-shot entry points: resolve, extract, ask, return.
//!
//! These wrap a [`DocumentPipeline`] for callers that have a single question
//! about a single file. Interactive callers (several questions, document
//! replacement, progress display) should drive a [`DocumentPipeline`]
//! directly.

use crate::config::PipelineConfig;
use crate::error::{PdfQaError, PipelineError};
use crate::output::{ExtractionResult, Outcome};
use crate::pipeline::extract::{extract_document, PdfiumExtractor};
use crate::pipeline::input;
use crate::session::DocumentPipeline;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// Answer to a one-shot question.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Model response, verbatim.
    pub response: String,
    /// Name of the document that was queried.
    pub document: String,
    /// Pages in the document.
    pub page_count: usize,
    /// Wall-clock time for extraction plus the query.
    pub duration_ms: u64,
}

/// Ask a single question about a PDF file or URL.
///
/// # Arguments
/// * `input_str` — Local file path or HTTP/HTTPS URL to a PDF
/// * `question`  — Free-form question about the document
/// * `config`    — Session configuration
///
/// # Errors
/// Returns `Err(PdfQaError)` when the input cannot be resolved, no provider
/// is configured, or the session ends in an error state (the wrapped
/// [`crate::error::PipelineError`] carries the user-facing message).
pub async fn ask(
    input_str: impl AsRef<str>,
    question: &str,
    config: &PipelineConfig,
) -> Result<Answer, PdfQaError> {
    let start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Answering question about: {}", input_str);

    let document = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let name = document.name.clone();
    let pipeline = DocumentPipeline::from_config(config)?;

    ensure_applied(pipeline.select_document(document).await?)?;
    ensure_applied(pipeline.submit_query(question).await?)?;

    let snapshot = pipeline.snapshot();
    let page_count = snapshot.extraction.map(|e| e.page_count).unwrap_or(0);
    let response = snapshot
        .response
        .ok_or_else(|| PdfQaError::Internal("session finished without a response".into()))?;

    Ok(Answer {
        response,
        document: name,
        page_count,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Synchronous wrapper around [`ask`].
///
/// Creates a temporary tokio runtime internally.
pub fn ask_sync(
    input_str: impl AsRef<str>,
    question: &str,
    config: &PipelineConfig,
) -> Result<Answer, PdfQaError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PdfQaError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(ask(input_str, question, config))
}

/// Extract the text of a PDF without asking anything.
///
/// Does not require an LLM provider or API key. The declared type is
/// validated exactly as [`DocumentPipeline::select_document`] does.
pub async fn extract_text(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<ExtractionResult, PdfQaError> {
    let document = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    if !document.is_pdf() {
        return Err(PipelineError::invalid_file_type().into());
    }

    let mut extractor = PdfiumExtractor::new();
    if let Some(ref pwd) = config.password {
        extractor = extractor.with_password(pwd.clone());
    }

    let bytes = document
        .read_bytes()
        .await
        .map_err(|e| PipelineError::from_extraction(&e))?;
    extract_document(&extractor, bytes)
        .await
        .map_err(|e| PipelineError::from_extraction(&e).into())
}

/// A private session has no competing callers.
fn ensure_applied(outcome: Outcome) -> Result<(), PdfQaError> {
    match outcome {
        Outcome::Applied => Ok(()),
        Outcome::Superseded => Err(PdfQaError::Internal(
            "session state changed unexpectedly".into(),
        )),
    }
}
