//! Pipeline stages for document question answering.
//!
//! Each submodule implements one stage. The stages are wired together by
//! [`crate::session::DocumentPipeline`], which owns the state transitions.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ (prompt) ──▶ query
//! (path/URL)  (pdfium)               (LLM)
//! ```
//!
//! 1. [`input`]   — resolve the user-supplied path or URL to a `Document`
//! 2. [`extract`] — read page text fragments in page order; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`query`]   — one request/response exchange with the LLM; the only
//!    stage besides downloads with network I/O

pub mod extract;
pub mod input;
pub mod query;
