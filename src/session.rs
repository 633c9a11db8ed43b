//! The document session: upload → extract → query state machine.
//!
//! ## State machine
//!
//! ```text
//! PipelineStatus: idle ──select(pdf)──▶ parsing ──ok──▶ ready
//!                 idle ──select(other)─▶ error
//!                 parsing ──failure──▶ error
//!                 any ──reset──▶ idle
//! QueryStatus:    idle ──submit(valid)──▶ processing ──ok──▶ success
//!                                                    ──err─▶ error
//!                 idle ──submit(invalid)─▶ error
//!                 any ──new document / reset──▶ idle
//! ```
//!
//! ## Supersession
//!
//! Extraction and query calls are awaited without holding the state lock.
//! Every selection and reset bumps a document generation, and every
//! submitted question bumps a query generation. A task records the
//! generations it started under and, on completion, applies its result in a
//! single critical section only if they are still current. Stale results are
//! dropped and reported as [`Outcome::Superseded`].

use crate::config::PipelineConfig;
use crate::document::Document;
use crate::error::{PdfQaError, PipelineError};
use crate::output::{ExtractionResult, Outcome, PipelineStatus, QueryStatus, SessionSnapshot};
use crate::pipeline::extract::{extract_document, PdfiumExtractor, TextExtractor};
use crate::pipeline::query::{LlmQueryService, QueryService};
use crate::progress::{NoopObserver, ObserverHandle};
use crate::prompts::build_query_prompt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct SessionState {
    document: Option<Document>,
    extraction: Option<ExtractionResult>,
    extraction_error: Option<String>,
    query: String,
    query_status: QueryStatus,
    response: Option<String>,
    query_error: Option<String>,
    document_generation: u64,
    query_generation: u64,
}

impl SessionState {
    /// Status is derived, never stored.
    fn status(&self) -> PipelineStatus {
        if self.extraction_error.is_some() {
            PipelineStatus::Error
        } else if self.document.is_none() {
            PipelineStatus::Idle
        } else if self.extraction.is_some() {
            PipelineStatus::Ready
        } else {
            PipelineStatus::Parsing
        }
    }

    /// Drop everything tied to the current document and invalidate in-flight work.
    fn clear(&mut self) {
        self.document = None;
        self.extraction = None;
        self.extraction_error = None;
        self.clear_query();
        self.document_generation += 1;
    }

    fn clear_query(&mut self) {
        self.query.clear();
        self.query_status = QueryStatus::Idle;
        self.response = None;
        self.query_error = None;
        self.query_generation += 1;
    }

    fn fail_query(&mut self, err: &PipelineError) {
        self.query_status = QueryStatus::Error;
        self.query_error = Some(err.to_string());
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status(),
            document: self.document.clone(),
            extraction: self.extraction.clone(),
            extraction_error: self.extraction_error.clone(),
            query: self.query.clone(),
            query_status: self.query_status,
            response: self.response.clone(),
            query_error: self.query_error.clone(),
        }
    }
}

/// One user session: the current document, its text, and the current question.
///
/// All operations take `&self`, so a session can be shared between tasks via
/// `Arc`. Sessions are independent of each other.
pub struct DocumentPipeline {
    extractor: Arc<dyn TextExtractor>,
    query_service: Arc<dyn QueryService>,
    observer: ObserverHandle,
    state: Mutex<SessionState>,
}

impl DocumentPipeline {
    pub fn new(extractor: Arc<dyn TextExtractor>, query_service: Arc<dyn QueryService>) -> Self {
        Self {
            extractor,
            query_service,
            observer: Arc::new(NoopObserver),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Build a session with the pdfium extractor and an LLM query service.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PdfQaError> {
        let mut extractor = PdfiumExtractor::new();
        if let Some(ref pwd) = config.password {
            extractor = extractor.with_password(pwd.clone());
        }
        let service = LlmQueryService::from_config(config)?;

        let mut pipeline = Self::new(Arc::new(extractor), Arc::new(service));
        if let Some(ref observer) = config.observer {
            pipeline = pipeline.with_observer(Arc::clone(observer));
        }
        Ok(pipeline)
    }

    pub fn with_observer(mut self, observer: ObserverHandle) -> Self {
        self.observer = observer;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // A panic while holding the lock cannot leave the state half-written:
        // every transition is a sequence of plain field assignments.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the current state for rendering.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    pub fn status(&self) -> PipelineStatus {
        self.lock().status()
    }

    /// Select a document and extract its text.
    ///
    /// A document whose declared type is not PDF is rejected before any byte
    /// is read: the session ends up with no document and an error status.
    /// Otherwise the previous document, answer and errors are dropped, the
    /// status becomes `parsing`, and the call resolves once extraction ends.
    ///
    /// Returns `Ok(Outcome::Superseded)` when another selection or a reset
    /// happened while extraction was running; the result is then discarded.
    pub async fn select_document(&self, document: Document) -> Result<Outcome, PipelineError> {
        if !document.is_pdf() {
            let err = PipelineError::invalid_file_type();
            warn!(
                "Rejected '{}': declared type '{}' is not PDF",
                document.name, document.mime_type
            );
            {
                let mut state = self.lock();
                state.clear();
                state.extraction_error = Some(err.to_string());
            }
            self.observer.on_extraction_error(&err.to_string());
            return Err(err);
        }

        let generation = {
            let mut state = self.lock();
            state.clear();
            state.document = Some(document.clone());
            state.document_generation
        };
        info!("Parsing '{}' ({} bytes)", document.name, document.size);
        self.observer.on_document_selected(&document.name, document.size);

        let result = match document.read_bytes().await {
            Ok(bytes) => extract_document(self.extractor.as_ref(), bytes).await,
            Err(e) => Err(e),
        };

        let mut state = self.lock();
        if state.document_generation != generation {
            debug!("Discarding extraction of '{}': superseded", document.name);
            return Ok(Outcome::Superseded);
        }

        match result {
            Ok(extraction) => {
                info!(
                    "Extracted {} pages ({} bytes of text) from '{}'",
                    extraction.page_count,
                    extraction.text.len(),
                    document.name
                );
                let (pages, len) = (extraction.page_count, extraction.text.len());
                state.extraction = Some(extraction);
                drop(state);
                self.observer.on_extraction_complete(pages, len);
                Ok(Outcome::Applied)
            }
            Err(e) => {
                warn!("Error processing '{}': {}", document.name, e);
                let err = PipelineError::from_extraction(&e);
                state.extraction = None;
                state.extraction_error = Some(err.to_string());
                drop(state);
                self.observer.on_extraction_error(&err.to_string());
                Err(err)
            }
        }
    }

    /// Return to the idle state. Idempotent.
    ///
    /// In-flight extraction or query results are discarded when they arrive.
    pub fn reset(&self) {
        self.lock().clear();
        debug!("Session reset");
    }

    /// Ask a question about the current document.
    ///
    /// Fails without contacting the query service when no document is ready
    /// (precondition error) or the trimmed question is empty (validation
    /// error). Otherwise the answer replaces any previous one.
    ///
    /// When several questions overlap, the most recently submitted one owns
    /// the session: earlier calls resolve to `Ok(Outcome::Superseded)`.
    pub async fn submit_query(&self, question: &str) -> Result<Outcome, PipelineError> {
        let (prompt, document_generation, query_generation) = {
            let mut state = self.lock();
            state.query = question.to_string();

            let ready_text = if state.status() == PipelineStatus::Ready {
                state.extraction.as_ref().map(|e| e.text.clone())
            } else {
                None
            };

            let rejection = match ready_text {
                None => Some(PipelineError::no_document()),
                Some(_) if question.trim().is_empty() => Some(PipelineError::empty_question()),
                Some(_) => None,
            };
            if let Some(err) = rejection {
                // A rejected submission still owns the session.
                state.query_generation += 1;
                state.fail_query(&err);
                drop(state);
                self.observer.on_query_error(&err.to_string());
                return Err(err);
            }
            let text = ready_text.unwrap_or_default();

            state.query_generation += 1;
            state.query_status = QueryStatus::Processing;
            state.response = None;
            state.query_error = None;

            (
                build_query_prompt(&text, question),
                state.document_generation,
                state.query_generation,
            )
        };

        info!("Submitting question ({} bytes of prompt)", prompt.len());
        self.observer.on_query_start(question);

        let result = self.query_service.generate(&prompt).await;

        let mut state = self.lock();
        if state.document_generation != document_generation
            || state.query_generation != query_generation
        {
            debug!("Discarding answer: superseded");
            return Ok(Outcome::Superseded);
        }

        match result {
            Ok(response) => {
                let len = response.len();
                state.query_status = QueryStatus::Success;
                state.response = Some(response);
                drop(state);
                self.observer.on_query_complete(len);
                Ok(Outcome::Applied)
            }
            Err(e) => {
                warn!("Query service error: {}", e);
                let err = PipelineError::Service;
                state.response = None;
                state.fail_query(&err);
                drop(state);
                self.observer.on_query_error(&err.to_string());
                Err(err)
            }
        }
    }
}
