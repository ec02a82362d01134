//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::{spawn_session, SessionHandle, SseEvent};
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use crate::state_machine::SessionContext;
use crate::transcript::Session;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify, Semaphore};

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock LLM service that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record_and_pop(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.record_and_pop(request)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Gated Mock LLM Service (for in-flight testing)
// ============================================================================

/// Mock LLM service whose calls block until the test opens the gate
pub struct GatedMockLlmService {
    inner: MockLlmService,
    gate: Semaphore,
    /// Notified when a request starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

impl GatedMockLlmService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            inner: MockLlmService::new(model_id),
            gate: Semaphore::new(0),
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.inner.queue_response(response);
    }

    /// Let one pending (or future) request complete
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl LlmService for GatedMockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.request_started.notify_one();
        let permit = self.gate.acquire().await;
        if let Ok(permit) = permit {
            permit.forget();
        }
        self.inner.record_and_pop(request)
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

/// Mock LLM service that panics mid-request
pub struct PanickingLlmService;

#[async_trait]
impl LlmService for PanickingLlmService {
    async fn complete(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        panic!("generation client crashed");
    }

    fn model_id(&self) -> &str {
        "panicking-model"
    }
}

// ============================================================================
// Test Runtime Builder
// ============================================================================

/// Helper for building test runtimes with minimal boilerplate
pub struct TestRuntime {
    pub handle: SessionHandle,
    pub broadcast_rx: broadcast::Receiver<SseEvent>,
}

impl TestRuntime {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> TestRuntimeBuilder {
        TestRuntimeBuilder {
            session_id: "test-session".to_string(),
            llm: None,
            configured: true,
        }
    }
}

pub struct TestRuntimeBuilder {
    session_id: String,
    llm: Option<Arc<dyn LlmService>>,
    configured: bool,
}

impl TestRuntimeBuilder {
    pub fn llm<L: LlmService + 'static>(mut self, llm: Arc<L>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Build the runtime as if no credential were configured
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self.llm = None;
        self
    }

    pub fn build(self) -> TestRuntime {
        let context = if self.configured {
            SessionContext::new(&self.session_id, "test-model")
        } else {
            SessionContext::unconfigured(&self.session_id, "test-model")
        };
        let llm = match (self.llm, self.configured) {
            (Some(llm), _) => Some(llm),
            (None, true) => {
                Some(Arc::new(MockLlmService::new("test-model")) as Arc<dyn LlmService>)
            }
            (None, false) => None,
        };

        let handle = spawn_session(context, llm);
        let broadcast_rx = handle.subscribe();
        TestRuntime {
            handle,
            broadcast_rx,
        }
    }
}

impl TestRuntime {
    pub async fn submit(&self, text: &str) {
        self.handle.submit(text).await.expect("Failed to submit");
    }

    pub async fn set_draft(&self, text: &str) {
        self.handle.set_draft(text).await.expect("Failed to set draft");
    }

    pub fn session(&self) -> Session {
        self.handle.snapshot()
    }

    /// Wait until the published session satisfies `predicate`
    pub async fn wait_for(
        &self,
        timeout: Duration,
        predicate: impl FnMut(&Session) -> bool,
    ) -> Option<Session> {
        let mut rx = self.handle.watch();
        let result = match tokio::time::timeout(timeout, rx.wait_for(predicate)).await {
            Ok(Ok(session)) => Some(session.clone()),
            _ => None,
        };
        result
    }

    /// Process all previously sent events by round-tripping a draft change
    pub async fn barrier(&self, marker: &str) -> Session {
        self.set_draft(marker).await;
        self.wait_for(Duration::from_secs(2), |s| s.draft() == marker)
            .await
            .expect("barrier not reached")
    }

    /// Wait for Done event with timeout
    pub async fn wait_for_done(&mut self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.broadcast_rx.recv()).await {
                Ok(Ok(SseEvent::Done)) => return true,
                _ => continue,
            }
        }
        false
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmMessage, MessageRole};
    use crate::state_machine::ERROR_PREFIX;
    use crate::system_prompt::SYSTEM_INSTRUCTION;
    use crate::transcript::{Role, SessionStatus};

    const WAIT: Duration = Duration::from_secs(2);

    fn not_sending(session: &Session) -> bool {
        !session.is_sending() && !session.transcript().is_empty()
    }

    #[tokio::test]
    async fn test_mock_llm_service() {
        let mock = MockLlmService::new("test-model");
        mock.queue_response(LlmResponse::text("Hello"));

        let request = crate::system_prompt::build_request(&[], "Hi");
        let response = mock.complete(&request).await.unwrap();
        assert_eq!(response.text, "Hello");
        assert_eq!(mock.recorded_requests().len(), 1);

        // Empty queue falls back to an error
        assert!(mock.complete(&request).await.is_err());
    }

    /// Submit with a working collaborator
    #[tokio::test]
    async fn test_simple_text_response() {
        let llm = Arc::new(MockLlmService::new("test-model"));
        llm.queue_response(LlmResponse::text("Hi there!"));

        let mut rt = TestRuntime::new().llm(llm.clone()).build();
        rt.submit("Hello").await;

        assert!(rt.wait_for_done(WAIT).await);
        let session = rt.session();
        assert_eq!(session.status(), &SessionStatus::Idle);

        let turns: Vec<(Role, &str)> = session
            .transcript()
            .iter()
            .map(|m| (m.role, m.text.as_str()))
            .collect();
        assert_eq!(turns, vec![(Role::User, "Hello"), (Role::Model, "Hi there!")]);

        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system.as_deref(), Some(SYSTEM_INSTRUCTION));
        assert_eq!(requests[0].messages, vec![LlmMessage::user("Hello")]);
    }

    /// Whitespace-only submissions are ignored
    #[tokio::test]
    async fn test_blank_submit_is_noop() {
        let llm = Arc::new(MockLlmService::new("test-model"));
        let rt = TestRuntime::new().llm(llm.clone()).build();

        rt.submit("  ").await;
        let session = rt.barrier("marker").await;

        assert!(session.transcript().is_empty());
        assert_eq!(session.status(), &SessionStatus::Idle);
        assert!(llm.recorded_requests().is_empty());
    }

    /// Collaborator failure keeps the user turn and shows the error
    #[tokio::test]
    async fn test_llm_error_handling() {
        let llm = Arc::new(MockLlmService::new("test-model"));
        llm.queue_error(LlmError::rate_limit("quota exceeded"));

        let rt = TestRuntime::new().llm(llm).build();
        rt.set_draft("Hello").await;
        rt.submit("Hello").await;

        let session = rt.wait_for(WAIT, not_sending).await.unwrap();
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].text, "Hello");
        let error = session.last_error().unwrap();
        assert!(error.starts_with(ERROR_PREFIX));
        assert!(error.contains("quota exceeded"));
        // The optimistic clear is not undone by the failure
        assert_eq!(session.draft(), "");
    }

    /// Submissions made while a request is in flight are dropped
    #[tokio::test]
    async fn test_submit_while_sending_is_dropped() {
        let llm = Arc::new(GatedMockLlmService::new("test-model"));
        llm.queue_response(LlmResponse::text("Reply to Y"));
        let started = llm.request_started.clone();

        let rt = TestRuntime::new().llm(llm.clone()).build();
        rt.submit("Y").await;
        tokio::time::timeout(WAIT, started.notified())
            .await
            .expect("request never started");

        rt.submit("X").await;
        let during = rt.barrier("typing").await;
        assert!(during.is_sending());
        assert_eq!(during.transcript().len(), 1);

        llm.release();
        let session = rt.wait_for(WAIT, |s| s.transcript().len() == 2).await.unwrap();
        assert_eq!(session.status(), &SessionStatus::Idle);
        assert_eq!(session.transcript()[0].text, "Y");
        assert_eq!(session.transcript()[1].text, "Reply to Y");
        // The draft typed during the request survives
        assert_eq!(session.draft(), "typing");
        assert_eq!(llm.recorded_requests().len(), 1);
    }

    /// Without a credential nothing can be submitted
    #[tokio::test]
    async fn test_unconfigured_never_submits() {
        let rt = TestRuntime::new().unconfigured().build();

        rt.submit("Hello").await;
        let session = rt.barrier("marker").await;

        assert!(session.transcript().is_empty());
        assert_eq!(session.status(), &SessionStatus::Idle);
        assert!(!rt.handle.view().input_enabled);
    }

    #[tokio::test]
    async fn test_recovery_after_error_sends_history() {
        let llm = Arc::new(MockLlmService::new("test-model"));
        llm.queue_error(LlmError::server_error("unavailable"));
        llm.queue_response(LlmResponse::text("Back again"));

        let rt = TestRuntime::new().llm(llm.clone()).build();
        rt.submit("First").await;
        rt.wait_for(WAIT, not_sending).await.unwrap();

        rt.submit("Second").await;
        let session = rt
            .wait_for(WAIT, |s| s.transcript().len() == 3)
            .await
            .unwrap();
        assert_eq!(session.status(), &SessionStatus::Idle);
        assert_eq!(session.last_error(), None);

        // The failed user turn is still part of the history
        let requests = llm.recorded_requests();
        let roles: Vec<MessageRole> = requests[1].messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::User]);
    }

    #[tokio::test]
    async fn test_content_block_reported() {
        let llm = Arc::new(MockLlmService::new("test-model"));
        llm.queue_error(LlmError::content_blocked("Prompt was blocked").with_block_reason("SAFETY"));

        let rt = TestRuntime::new().llm(llm).build();
        rt.submit("Hello").await;

        let session = rt.wait_for(WAIT, not_sending).await.unwrap();
        let error = session.last_error().unwrap();
        assert!(error.contains("Blocked due to: SAFETY"));
    }

    /// A crashing collaborator still releases the sending status
    #[tokio::test]
    async fn test_panicking_service_releases_sending() {
        let rt = TestRuntime::new().llm(Arc::new(PanickingLlmService)).build();
        rt.submit("Hello").await;

        let session = rt.wait_for(WAIT, not_sending).await.unwrap();
        assert!(session.last_error().is_some());
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_clears_draft() {
        let llm = Arc::new(GatedMockLlmService::new("test-model"));
        llm.queue_response(LlmResponse::text("ok"));

        let rt = TestRuntime::new().llm(llm.clone()).build();
        rt.set_draft("Hello").await;
        rt.submit("Hello").await;

        let session = rt.wait_for(WAIT, Session::is_sending).await.unwrap();
        assert_eq!(session.draft(), "");
        llm.release();
    }

    #[tokio::test]
    async fn test_broadcast_order() {
        let llm = Arc::new(MockLlmService::new("test-model"));
        llm.queue_response(LlmResponse::text("Hi"));

        let mut rt = TestRuntime::new().llm(llm).build();
        rt.submit("Hello").await;

        let mut kinds = Vec::new();
        while kinds.last() != Some(&"done") {
            let event = tokio::time::timeout(WAIT, rt.broadcast_rx.recv())
                .await
                .expect("timed out")
                .expect("channel closed");
            kinds.push(match event {
                SseEvent::Init { .. } => "init",
                SseEvent::StateChange { .. } => "state_change",
                SseEvent::Message { .. } => "message",
                SseEvent::Done => "done",
            });
        }
        assert_eq!(
            kinds,
            vec!["message", "state_change", "message", "state_change", "done"]
        );
    }
}
