//! Observer trait for session events.
//!
//! Inject an [`Arc<dyn SessionObserver>`] via
//! [`crate::config::PipelineConfigBuilder::observer`] (or
//! [`crate::session::DocumentPipeline::with_observer`]) to receive events as
//! documents are parsed and questions answered.
//!
//! # Why callbacks instead of channels?
//!
//! Callers can forward events to a terminal spinner, a WebSocket or a log
//! without the library knowing how the host application communicates. The
//! trait is `Send + Sync` because a session is shared between tasks.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfqa::{PipelineConfig, SessionObserver};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingObserver {
//!     answers: AtomicUsize,
//! }
//!
//! impl SessionObserver for CountingObserver {
//!     fn on_query_complete(&self, response_len: usize) {
//!         self.answers.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("answer received ({} bytes)", response_len);
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .observer(Arc::new(CountingObserver { answers: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the session as it moves between states.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events for superseded work are not reported.
pub trait SessionObserver: Send + Sync {
    /// A PDF passed validation and extraction is starting.
    ///
    /// # Arguments
    /// * `name` — display name of the document
    /// * `size` — size in bytes
    fn on_document_selected(&self, name: &str, size: u64) {
        let _ = (name, size);
    }

    /// Extraction finished and the session is ready for questions.
    ///
    /// # Arguments
    /// * `page_count` — pages in the document
    /// * `text_len`   — byte length of the extracted text
    fn on_extraction_complete(&self, page_count: usize, text_len: usize) {
        let _ = (page_count, text_len);
    }

    /// The selection was rejected or extraction failed.
    fn on_extraction_error(&self, message: &str) {
        let _ = message;
    }

    /// A valid question is about to be sent to the query service.
    fn on_query_start(&self, question: &str) {
        let _ = question;
    }

    /// The query service answered.
    fn on_query_complete(&self, response_len: usize) {
        let _ = response_len;
    }

    /// The question was rejected or the query service failed.
    fn on_query_error(&self, message: &str) {
        let _ = message;
    }
}

/// A no-op implementation, used when no observer is configured.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ObserverHandle = Arc<dyn SessionObserver>;
