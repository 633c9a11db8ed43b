//! Session behaviour against deterministic extractor and query stubs.
//!
//! No pdfium and no network: every external capability is replaced by a
//! stub so state transitions, supersession and error surfacing can be
//! asserted exactly.

use async_trait::async_trait;
use edgequake_pdfqa::error::{
    EMPTY_QUESTION_MESSAGE, EXTRACTION_FALLBACK_MESSAGE, INVALID_FILE_TYPE_MESSAGE,
    NO_DOCUMENT_MESSAGE, SERVICE_FAILURE_MESSAGE,
};
use edgequake_pdfqa::{
    Document, DocumentPipeline, ExtractionError, Outcome, PageFragments, PipelineError,
    PipelineStatus, QueryService, QueryStatus, ServiceError, SessionObserver, SessionSnapshot,
    TextExtractor, PDF_MIME_TYPE,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ── Stubs ────────────────────────────────────────────────────────────────────

/// Splits the document bytes on `|` into pages, and each page on spaces
/// into fragments. Bytes starting with `slow` wait for the gate first;
/// bytes starting with `fail` produce the given error.
#[derive(Default)]
struct ScriptedExtractor {
    gate: Notify,
    failure: Option<fn() -> ExtractionError>,
}

#[async_trait]
impl TextExtractor for ScriptedExtractor {
    async fn extract_pages(&self, bytes: Vec<u8>) -> Result<Vec<PageFragments>, ExtractionError> {
        let body = String::from_utf8_lossy(&bytes).into_owned();
        if body.starts_with("slow") {
            self.gate.notified().await;
        }
        if body.starts_with("fail") {
            if let Some(make) = self.failure {
                return Err(make());
            }
        }
        Ok(body
            .split('|')
            .map(|page| page.split(' ').map(str::to_string).collect())
            .collect())
    }
}

/// Returns a fixed answer, counting calls and recording the last prompt.
/// Prompts mentioning `slow` wait for the gate first.
struct ScriptedService {
    answer: Result<String, fn() -> ServiceError>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
    gate: Notify,
}

impl ScriptedService {
    fn answering(answer: &str) -> Self {
        Self {
            answer: Ok(answer.to_string()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
            gate: Notify::new(),
        }
    }

    fn failing(make: fn() -> ServiceError) -> Self {
        Self {
            answer: Err(make),
            ..Self::answering("")
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryService for ScriptedService {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        if prompt.contains("slow") {
            self.gate.notified().await;
        }
        match &self.answer {
            // Echo the question's last line so overlapping answers differ.
            Ok(answer) if answer.is_empty() => {
                Ok(prompt.lines().last().unwrap_or_default().to_string())
            }
            Ok(answer) => Ok(answer.clone()),
            Err(make) => Err(make()),
        }
    }
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl SessionObserver for RecordingObserver {
    fn on_document_selected(&self, name: &str, size: u64) {
        self.events.lock().unwrap().push(format!("selected {name} {size}"));
    }
    fn on_extraction_complete(&self, page_count: usize, _text_len: usize) {
        self.events.lock().unwrap().push(format!("extracted {page_count}"));
    }
    fn on_extraction_error(&self, message: &str) {
        self.events.lock().unwrap().push(format!("extraction error: {message}"));
    }
    fn on_query_start(&self, question: &str) {
        self.events.lock().unwrap().push(format!("query {question}"));
    }
    fn on_query_complete(&self, response_len: usize) {
        self.events.lock().unwrap().push(format!("answered {response_len}"));
    }
    fn on_query_error(&self, message: &str) {
        self.events.lock().unwrap().push(format!("query error: {message}"));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn corrupt_xref() -> ExtractionError {
    ExtractionError::CorruptPdf {
        detail: "bad xref table".into(),
    }
}

fn blank_failure() -> ExtractionError {
    ExtractionError::Internal("  ".into())
}

fn unauthorized() -> ServiceError {
    ServiceError::Api {
        message: "401 Unauthorized: invalid API key".into(),
    }
}

fn timed_out() -> ServiceError {
    ServiceError::Timeout { secs: 30 }
}

fn pdf(name: &str, body: &str) -> Document {
    Document::from_bytes(name, PDF_MIME_TYPE, body.as_bytes().to_vec())
}

fn session(service: ScriptedService) -> (Arc<DocumentPipeline>, Arc<ScriptedExtractor>, Arc<ScriptedService>) {
    session_with(ScriptedExtractor::default(), service)
}

fn session_with(
    extractor: ScriptedExtractor,
    service: ScriptedService,
) -> (Arc<DocumentPipeline>, Arc<ScriptedExtractor>, Arc<ScriptedService>) {
    let extractor = Arc::new(extractor);
    let service = Arc::new(service);
    let pipeline = DocumentPipeline::new(extractor.clone(), service.clone());
    (Arc::new(pipeline), extractor, service)
}

async fn wait_until(pipeline: &DocumentPipeline, done: impl Fn(&SessionSnapshot) -> bool) {
    for _ in 0..10_000 {
        if done(&pipeline.snapshot()) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("session never reached the expected state: {:?}", pipeline.snapshot());
}

fn assert_idle(s: &SessionSnapshot) {
    assert_eq!(s.status, PipelineStatus::Idle);
    assert!(s.document.is_none());
    assert!(s.extraction.is_none());
    assert!(s.error_message().is_none());
    assert_eq!(s.query, "");
    assert!(s.response.is_none());
    assert_eq!(s.query_status, QueryStatus::Idle);
}

// ── Selection ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn three_pages_join_with_blank_lines() {
    let (p, _, _) = session(ScriptedService::answering("unused"));

    let outcome = p.select_document(pdf("abc.pdf", "A|B|C")).await;

    assert_eq!(outcome, Ok(Outcome::Applied));
    let s = p.snapshot();
    assert_eq!(s.status, PipelineStatus::Ready);
    let extraction = s.extraction.unwrap();
    assert_eq!(extraction.text, "A\n\nB\n\nC\n\n");
    assert_eq!(extraction.page_count, 3);
}

#[tokio::test]
async fn fragments_within_a_page_join_with_spaces() {
    let (p, _, _) = session(ScriptedService::answering("unused"));

    p.select_document(pdf("two.pdf", "Revenue grew 10%.|Page two"))
        .await
        .unwrap();

    let text = p.snapshot().extraction.unwrap().text;
    assert_eq!(text, "Revenue grew 10%.\n\nPage two\n\n");
}

#[tokio::test]
async fn non_pdf_types_are_rejected_before_extraction() {
    for mime in ["text/plain", "image/png", "application/octet-stream", ""] {
        let (p, _, _) = session(ScriptedService::answering("unused"));
        p.select_document(pdf("ok.pdf", "A")).await.unwrap();

        let doc = Document::from_bytes("notes.txt", mime, b"hello".to_vec());
        let err = p.select_document(doc).await.unwrap_err();

        assert_eq!(err, PipelineError::Validation(INVALID_FILE_TYPE_MESSAGE.into()));
        let s = p.snapshot();
        assert_eq!(s.status, PipelineStatus::Error, "mime {mime:?}");
        assert!(s.document.is_none(), "mime {mime:?}");
        assert!(s.extraction.is_none(), "mime {mime:?}");
        assert_eq!(s.error_message(), Some(INVALID_FILE_TYPE_MESSAGE));
    }
}

#[tokio::test]
async fn pdf_type_check_ignores_case_and_parameters() {
    let (p, _, _) = session(ScriptedService::answering("unused"));
    let doc = Document::from_bytes("x.pdf", "Application/PDF; charset=binary", b"A".to_vec());

    assert_eq!(p.select_document(doc).await, Ok(Outcome::Applied));
    assert_eq!(p.status(), PipelineStatus::Ready);
}

#[tokio::test]
async fn extraction_failure_surfaces_extractor_message() {
    let extractor = ScriptedExtractor {
        failure: Some(corrupt_xref),
        ..Default::default()
    };
    let (p, _, _) = session_with(extractor, ScriptedService::answering("unused"));

    let err = p.select_document(pdf("broken.pdf", "fail")).await.unwrap_err();

    let s = p.snapshot();
    assert_eq!(s.status, PipelineStatus::Error);
    assert!(s.extraction.is_none());
    let message = s.error_message().unwrap();
    assert!(message.contains("bad xref table"), "got {message}");
    assert_eq!(err.to_string(), message);
}

#[tokio::test]
async fn blank_extraction_failure_falls_back_to_generic_message() {
    let extractor = ScriptedExtractor {
        failure: Some(blank_failure),
        ..Default::default()
    };
    let (p, _, _) = session_with(extractor, ScriptedService::answering("unused"));

    p.select_document(pdf("broken.pdf", "fail")).await.unwrap_err();

    assert_eq!(p.snapshot().error_message(), Some(EXTRACTION_FALLBACK_MESSAGE));
}

#[tokio::test]
async fn new_selection_drops_previous_answer() {
    let (p, _, _) = session(ScriptedService::answering("first answer"));
    p.select_document(pdf("one.pdf", "A")).await.unwrap();
    p.submit_query("question").await.unwrap();

    p.select_document(pdf("two.pdf", "B")).await.unwrap();

    let s = p.snapshot();
    assert_eq!(s.document.unwrap().name, "two.pdf");
    assert_eq!(s.query_status, QueryStatus::Idle);
    assert!(s.response.is_none());
    assert_eq!(s.query, "");
}

// ── Queries ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn response_is_surfaced_verbatim() {
    let (p, _, service) = session(ScriptedService::answering("10%."));
    p.select_document(pdf("report.pdf", "Revenue grew 10%.")).await.unwrap();

    let outcome = p.submit_query("What was revenue growth?").await;

    assert_eq!(outcome, Ok(Outcome::Applied));
    let s = p.snapshot();
    assert_eq!(s.query_status, QueryStatus::Success);
    assert_eq!(s.response.as_deref(), Some("10%."));
    assert_eq!(s.query, "What was revenue growth?");
    assert_eq!(service.calls(), 1);

    let prompt = service.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("---\nRevenue grew 10%.\n\n\n---"));
    assert!(prompt.ends_with("USER'S QUESTION:\nWhat was revenue growth?"));
}

#[tokio::test]
async fn whitespace_in_response_is_preserved() {
    let (p, _, _) = session(ScriptedService::answering("  line one\n\nline two\n"));
    p.select_document(pdf("r.pdf", "A")).await.unwrap();

    p.submit_query("q").await.unwrap();

    assert_eq!(
        p.snapshot().response.as_deref(),
        Some("  line one\n\nline two\n")
    );
}

#[tokio::test]
async fn empty_question_is_rejected_without_calling_service() {
    for question in ["", "   ", "\n\t"] {
        let (p, _, service) = session(ScriptedService::answering("unused"));
        p.select_document(pdf("r.pdf", "A")).await.unwrap();

        let err = p.submit_query(question).await.unwrap_err();

        assert_eq!(err, PipelineError::Validation(EMPTY_QUESTION_MESSAGE.into()));
        let s = p.snapshot();
        assert_eq!(s.query_status, QueryStatus::Error);
        assert_eq!(s.error_message(), Some(EMPTY_QUESTION_MESSAGE));
        assert_eq!(s.status, PipelineStatus::Ready);
        assert_eq!(service.calls(), 0);
    }
}

#[tokio::test]
async fn query_without_ready_document_is_rejected() {
    // Idle.
    let (p, _, service) = session(ScriptedService::answering("unused"));
    let err = p.submit_query("anything").await.unwrap_err();
    assert_eq!(err, PipelineError::Precondition(NO_DOCUMENT_MESSAGE.into()));
    assert_eq!(p.snapshot().query_status, QueryStatus::Error);

    // Error after a rejected selection.
    let doc = Document::from_bytes("a.txt", "text/plain", b"A".to_vec());
    p.select_document(doc).await.unwrap_err();
    let err = p.submit_query("anything").await.unwrap_err();
    assert_eq!(err, PipelineError::Precondition(NO_DOCUMENT_MESSAGE.into()));
    assert_eq!(p.snapshot().error_message(), Some(NO_DOCUMENT_MESSAGE));

    // Empty question with no document: the precondition wins.
    p.reset();
    let err = p.submit_query("").await.unwrap_err();
    assert_eq!(err, PipelineError::Precondition(NO_DOCUMENT_MESSAGE.into()));

    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn query_while_parsing_is_rejected() {
    let (p, extractor, service) = session(ScriptedService::answering("unused"));
    let task = tokio::spawn({
        let p = p.clone();
        async move { p.select_document(pdf("slow.pdf", "slow")).await }
    });
    wait_until(&p, |s| s.status == PipelineStatus::Parsing).await;

    let err = p.submit_query("too early").await.unwrap_err();
    assert_eq!(err, PipelineError::Precondition(NO_DOCUMENT_MESSAGE.into()));
    assert_eq!(service.calls(), 0);

    extractor.gate.notify_one();
    assert_eq!(task.await.unwrap(), Ok(Outcome::Applied));
    assert_eq!(p.status(), PipelineStatus::Ready);
}

#[tokio::test]
async fn service_failure_shows_generic_message() {
    let failures: [fn() -> ServiceError; 2] = [unauthorized, timed_out];
    for make in failures {
        let (p, _, _) = session(ScriptedService::failing(make));
        p.select_document(pdf("r.pdf", "A")).await.unwrap();

        let err = p.submit_query("q").await.unwrap_err();

        assert_eq!(err, PipelineError::Service);
        let s = p.snapshot();
        assert_eq!(s.query_status, QueryStatus::Error);
        assert!(s.response.is_none());
        assert_eq!(s.error_message(), Some(SERVICE_FAILURE_MESSAGE));
        // The document stays usable.
        assert_eq!(s.status, PipelineStatus::Ready);
    }
}

#[tokio::test]
async fn rejected_question_keeps_previous_answer() {
    let (p, _, _) = session(ScriptedService::answering("first"));
    p.select_document(pdf("r.pdf", "A")).await.unwrap();
    p.submit_query("one").await.unwrap();

    p.submit_query("").await.unwrap_err();

    let s = p.snapshot();
    assert_eq!(s.query_status, QueryStatus::Error);
    assert_eq!(s.response.as_deref(), Some("first"));

    p.submit_query("two").await.unwrap();
    assert!(p.snapshot().error_message().is_none());
}

// ── Reset ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reset_from_every_state_returns_to_idle() {
    // idle
    let (p, _, _) = session(ScriptedService::answering("ok"));
    p.reset();
    assert_idle(&p.snapshot());

    // error (rejected type)
    let doc = Document::from_bytes("a.txt", "text/plain", b"A".to_vec());
    p.select_document(doc).await.unwrap_err();
    p.reset();
    assert_idle(&p.snapshot());

    // ready + success
    p.select_document(pdf("r.pdf", "A")).await.unwrap();
    p.submit_query("q").await.unwrap();
    p.reset();
    assert_idle(&p.snapshot());

    // ready + query error
    p.select_document(pdf("r.pdf", "A")).await.unwrap();
    p.submit_query("").await.unwrap_err();
    p.reset();
    assert_idle(&p.snapshot());

    // idempotent
    p.reset();
    assert_idle(&p.snapshot());
}

#[tokio::test]
async fn reset_while_parsing_discards_extraction() {
    let (p, extractor, _) = session(ScriptedService::answering("ok"));
    let task = tokio::spawn({
        let p = p.clone();
        async move { p.select_document(pdf("slow.pdf", "slow")).await }
    });
    wait_until(&p, |s| s.status == PipelineStatus::Parsing).await;

    p.reset();
    extractor.gate.notify_one();

    assert_eq!(task.await.unwrap(), Ok(Outcome::Superseded));
    assert_idle(&p.snapshot());
}

#[tokio::test]
async fn reset_while_querying_discards_answer() {
    let (p, _, service) = session(ScriptedService::answering("late answer"));
    p.select_document(pdf("r.pdf", "A")).await.unwrap();
    let task = tokio::spawn({
        let p = p.clone();
        async move { p.submit_query("slow question").await }
    });
    wait_until(&p, |s| s.query_status == QueryStatus::Processing).await;

    p.reset();
    service.gate.notify_one();

    assert_eq!(task.await.unwrap(), Ok(Outcome::Superseded));
    assert_idle(&p.snapshot());
}

// ── Supersession ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn stale_extraction_does_not_overwrite_newer_document() {
    let (p, extractor, _) = session(ScriptedService::answering("ok"));
    let first = tokio::spawn({
        let p = p.clone();
        async move { p.select_document(pdf("first.pdf", "slow first")).await }
    });
    wait_until(&p, |s| s.status == PipelineStatus::Parsing).await;

    let second = p.select_document(pdf("second.pdf", "second")).await;
    assert_eq!(second, Ok(Outcome::Applied));

    extractor.gate.notify_one();
    assert_eq!(first.await.unwrap(), Ok(Outcome::Superseded));

    let s = p.snapshot();
    assert_eq!(s.document.unwrap().name, "second.pdf");
    assert_eq!(s.extraction.unwrap().text, "second\n\n");
    assert_eq!(s.status, PipelineStatus::Ready);
}

#[tokio::test]
async fn latest_question_wins() {
    // Empty answer: the stub echoes the question line back.
    let (p, _, service) = session(ScriptedService::answering(""));
    p.select_document(pdf("r.pdf", "A")).await.unwrap();
    let first = tokio::spawn({
        let p = p.clone();
        async move { p.submit_query("slow question").await }
    });
    wait_until(&p, |s| s.query_status == QueryStatus::Processing).await;

    assert_eq!(p.submit_query("fast question").await, Ok(Outcome::Applied));
    service.gate.notify_one();
    assert_eq!(first.await.unwrap(), Ok(Outcome::Superseded));

    let s = p.snapshot();
    assert_eq!(s.query, "fast question");
    assert_eq!(s.response.as_deref(), Some("fast question"));
    assert_eq!(s.query_status, QueryStatus::Success);
    assert_eq!(service.calls(), 2);
}

#[tokio::test]
async fn answer_for_replaced_document_is_discarded() {
    let (p, _, service) = session(ScriptedService::answering("about the old one"));
    p.select_document(pdf("old.pdf", "A")).await.unwrap();
    let task = tokio::spawn({
        let p = p.clone();
        async move { p.submit_query("slow question").await }
    });
    wait_until(&p, |s| s.query_status == QueryStatus::Processing).await;

    p.select_document(pdf("new.pdf", "B")).await.unwrap();
    service.gate.notify_one();

    assert_eq!(task.await.unwrap(), Ok(Outcome::Superseded));
    let s = p.snapshot();
    assert_eq!(s.document.unwrap().name, "new.pdf");
    assert!(s.response.is_none());
    assert_eq!(s.query_status, QueryStatus::Idle);
}

#[tokio::test]
async fn sessions_are_independent() {
    let (a, _, _) = session(ScriptedService::answering("from a"));
    let (b, _, _) = session(ScriptedService::answering("from b"));

    a.select_document(pdf("a.pdf", "A")).await.unwrap();
    a.submit_query("q").await.unwrap();

    assert_eq!(a.status(), PipelineStatus::Ready);
    assert_idle(&b.snapshot());
}

// ── Observer ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn observer_sees_each_transition() {
    let observer = Arc::new(RecordingObserver::default());
    let pipeline = DocumentPipeline::new(
        Arc::new(ScriptedExtractor::default()),
        Arc::new(ScriptedService::answering("10%.")),
    )
    .with_observer(observer.clone());

    let doc = Document::from_bytes("notes.txt", "text/plain", b"x".to_vec());
    pipeline.select_document(doc).await.unwrap_err();
    pipeline.select_document(pdf("r.pdf", "A|B")).await.unwrap();
    pipeline.submit_query("").await.unwrap_err();
    pipeline.submit_query("growth?").await.unwrap();

    let events = observer.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            format!("extraction error: {INVALID_FILE_TYPE_MESSAGE}"),
            "selected r.pdf 3".to_string(),
            "extracted 2".to_string(),
            format!("query error: {EMPTY_QUESTION_MESSAGE}"),
            "query growth?".to_string(),
            "answered 4".to_string(),
        ]
    );
}

#[tokio::test]
async fn snapshot_serialises_lowercase_statuses() {
    let (p, _, _) = session(ScriptedService::answering("ok"));
    p.select_document(pdf("r.pdf", "A")).await.unwrap();

    let json = serde_json::to_value(p.snapshot()).unwrap();

    assert_eq!(json["status"], "ready");
    assert_eq!(json["query_status"], "idle");
    assert_eq!(json["document"]["name"], "r.pdf");
    assert_eq!(json["extraction"]["page_count"], 1);
}
