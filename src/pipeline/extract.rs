//! Text extraction: PDF bytes → ordered page fragments → document text.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to call from async contexts. The whole extraction
//! runs on the blocking pool so Tokio workers never stall on a large PDF.
//!
//! ## Why fragments?
//!
//! The extractor reports each page as the raw sequence of text segments
//! pdfium found, and [`assemble_text`] owns the joining rules. Any backend
//! (or a test stub) therefore produces identical document text.

use crate::error::ExtractionError;
use crate::output::ExtractionResult;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Text fragments of one page, in reading order.
pub type PageFragments = Vec<String>;

/// Turns raw PDF bytes into per-page text fragments.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Return one entry per page, in ascending page order.
    async fn extract_pages(&self, bytes: Vec<u8>) -> Result<Vec<PageFragments>, ExtractionError>;
}

/// Join fragments with single spaces per page; follow every page with `"\n\n"`.
pub fn assemble_text(pages: &[PageFragments]) -> String {
    let mut text = String::new();
    for fragments in pages {
        text.push_str(&fragments.join(" "));
        text.push_str("\n\n");
    }
    text
}

/// Run an extractor and assemble its output into an [`ExtractionResult`].
pub async fn extract_document(
    extractor: &dyn TextExtractor,
    bytes: Vec<u8>,
) -> Result<ExtractionResult, ExtractionError> {
    let pages = extractor.extract_pages(bytes).await?;
    let text = assemble_text(&pages);
    debug!("Assembled {} pages into {} bytes of text", pages.len(), text.len());
    Ok(ExtractionResult {
        text,
        page_count: pages.len(),
    })
}

/// Production extractor backed by pdfium's native text layer.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    password: Option<String>,
}

impl PdfiumExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open encrypted documents with this user password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

#[async_trait]
impl TextExtractor for PdfiumExtractor {
    async fn extract_pages(&self, bytes: Vec<u8>) -> Result<Vec<PageFragments>, ExtractionError> {
        let password = self.password.clone();
        tokio::task::spawn_blocking(move || extract_pages_blocking(&bytes, password.as_deref()))
            .await
            .map_err(|e| ExtractionError::Internal(format!("Extraction task panicked: {}", e)))?
    }
}

/// Blocking implementation of page text extraction.
fn extract_pages_blocking(
    bytes: &[u8],
    password: Option<&str>,
) -> Result<Vec<PageFragments>, ExtractionError> {
    let pdfium = load_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| map_load_error(&format!("{:?}", e), password.is_some()))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let mut results = Vec::with_capacity(total_pages);

    for (idx, page) in pages.iter().enumerate() {
        let text = page.text().map_err(|e| ExtractionError::PageText {
            page: idx + 1,
            detail: format!("{:?}", e),
        })?;

        let fragments: PageFragments = text.segments().iter().map(|s| s.text()).collect();
        debug!("Page {}: {} text fragments", idx + 1, fragments.len());

        results.push(fragments);
    }

    Ok(results)
}

/// Load the pdfium dynamic library.
///
/// Discovery order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` env var (explicit path to the library file)
/// 2. Alongside the running executable
/// 3. System library search paths
fn load_pdfium() -> Result<Pdfium, ExtractionError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        if !path.is_empty() {
            debug!("Loading pdfium from PDFIUM_DYNAMIC_LIB_PATH={}", path);
            let bindings = Pdfium::bind_to_library(&path).map_err(|e| {
                ExtractionError::PdfiumBindingFailed(format!("{path}: {e:?}"))
            })?;
            return Ok(Pdfium::new(bindings));
        }
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let lib_path =
                Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
            if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                debug!("Loaded pdfium from {}", dir.display());
                return Ok(Pdfium::new(bindings));
            }
        }
    }

    let bindings = Pdfium::bind_to_system_library()
        .map_err(|e| ExtractionError::PdfiumBindingFailed(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

/// Classify a pdfium load failure; encrypted documents get a dedicated message.
fn map_load_error(detail: &str, password_given: bool) -> ExtractionError {
    let lower = detail.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        if password_given {
            ExtractionError::WrongPassword
        } else {
            ExtractionError::PasswordRequired
        }
    } else {
        ExtractionError::CorruptPdf {
            detail: detail.to_string(),
        }
    }
}
