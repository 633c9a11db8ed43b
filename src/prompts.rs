//! Prompt sent to the LLM for document question answering.
//!
//! The template lives here as a single constant so it can be inspected by
//! tests without a live model. Its wording and layout are part of the
//! observable behaviour: answers are expected to be grounded only in the
//! document text embedded between the `---` markers.

/// Instruction block placed before the document content.
pub const QUERY_INSTRUCTIONS: &str = "You are an expert AI assistant specialized in analyzing PDF documents.
Based *only* on the content of the document provided below, answer the user's question.
Be precise and quote relevant parts of the document if possible.
If the answer cannot be found in the document, state that clearly. Do not use external knowledge.";

/// Build the full prompt embedding the document text and the question.
///
/// Both are inserted verbatim; the question is not trimmed.
pub fn build_query_prompt(document_text: &str, question: &str) -> String {
    format!(
        "{QUERY_INSTRUCTIONS}\n\nDOCUMENT CONTENT:\n---\n{document_text}\n---\n\nUSER'S QUESTION:\n{question}"
    )
}
