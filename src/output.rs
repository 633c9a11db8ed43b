//! Observable session state: statuses, extraction results and snapshots.

use crate::document::Document;
use serde::{Deserialize, Serialize};

/// Text extracted from one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Page texts in page order, each followed by a blank line (`"\n\n"`).
    pub text: String,
    /// Number of pages in the document.
    pub page_count: usize,
}

/// Lifecycle of the current document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    /// No document selected.
    #[default]
    Idle,
    /// Extraction in flight.
    Parsing,
    /// Text extracted; questions may be submitted.
    Ready,
    /// The selection was rejected or extraction failed.
    Error,
}

/// Lifecycle of the current question, nested inside a ready document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    #[default]
    Idle,
    Processing,
    Success,
    Error,
}

/// Whether a completed task was allowed to update the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The result became the session state.
    Applied,
    /// A newer selection, query or reset happened first; the result was dropped.
    Superseded,
}

/// Point-in-time copy of everything the presentation layer renders.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSnapshot {
    pub status: PipelineStatus,
    pub document: Option<Document>,
    pub extraction: Option<ExtractionResult>,
    /// Rejected selection or extraction failure message.
    pub extraction_error: Option<String>,
    pub query: String,
    pub query_status: QueryStatus,
    pub response: Option<String>,
    pub query_error: Option<String>,
}

impl SessionSnapshot {
    /// The message to show, if any; query errors take precedence.
    pub fn error_message(&self) -> Option<&str> {
        self.query_error
            .as_deref()
            .or(self.extraction_error.as_deref())
    }

    pub fn is_ready(&self) -> bool {
        self.status == PipelineStatus::Ready
    }
}
