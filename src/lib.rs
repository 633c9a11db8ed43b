//! # edgequake-pdfqa
//!
//! Ask free-form questions about PDF documents with Large Language Models.
//!
//! ## Why this crate?
//!
//! Answering a question about a document is a three-stage job: get the
//! file, turn it into text, and hand the text plus the question to a model
//! that is told to answer from the document only. Each stage is simple. The
//! state in between is not: the user may pick another file while the first
//! is still parsing, or reset while an answer is on its way.
//! [`DocumentPipeline`] owns that state.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Select   validate the declared type (application/pdf only)
//!  ├─ 2. Extract  page text fragments via pdfium (spawn_blocking)
//!  ├─ 3. Prompt   embed the full text and the question in a fixed template
//!  └─ 4. Query    one call to gemini / openai / anthropic / …
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfqa::{ask, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = PipelineConfig::default();
//!     let answer = ask("report.pdf", "What was revenue growth?", &config).await?;
//!     println!("{}", answer.response);
//!     Ok(())
//! }
//! ```
//!
//! ## Sessions
//!
//! ```rust,no_run
//! use edgequake_pdfqa::{resolve_input, DocumentPipeline, PipelineConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::default();
//! let session = DocumentPipeline::from_config(&config)?;
//! let doc = resolve_input("report.pdf", config.download_timeout_secs).await?;
//! session.select_document(doc).await?;
//! session.submit_query("Summarise section 2").await?;
//! println!("{:?}", session.snapshot().response);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfqa` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod ask;
pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use ask::{ask, ask_sync, extract_text, Answer};
pub use config::{PipelineConfig, PipelineConfigBuilder, DEFAULT_MODEL};
pub use document::{Document, PDF_MIME_TYPE};
pub use error::{ExtractionError, PdfQaError, PipelineError, ServiceError};
pub use output::{ExtractionResult, Outcome, PipelineStatus, QueryStatus, SessionSnapshot};
pub use pipeline::extract::{PageFragments, PdfiumExtractor, TextExtractor};
pub use pipeline::input::resolve_input;
pub use pipeline::query::{LlmQueryService, QueryService};
pub use progress::{NoopObserver, ObserverHandle, SessionObserver};
pub use session::DocumentPipeline;
