//! Runtime for executing chat sessions
//!
//! Each session is owned by one task that drains its event channel. Callers
//! interact with it through a cloneable [`SessionHandle`].

mod executor;

#[cfg(test)]
pub mod testing;

use executor::SessionRuntime;

use crate::llm::LlmService;
use crate::state_machine::{Event, SessionContext};
use crate::transcript::{Message, Session};
use crate::view::{render, SessionView};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, RwLock};

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    Init { session: SessionView },
    StateChange { session: SessionView },
    Message { message: Message },
    Done,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Session has shut down")]
    Closed,
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    context: Arc<SessionContext>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    snapshot_rx: watch::Receiver<Session>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.context.session_id
    }

    #[cfg(test)]
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Queue a submission. Whether it is accepted is decided by the
    /// session task; rejected submissions change nothing.
    pub async fn submit(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.send(Event::submit(text)).await
    }

    pub async fn set_draft(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.send(Event::draft_changed(text)).await
    }

    async fn send(&self, event: Event) -> Result<(), SessionError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Latest published session state
    pub fn snapshot(&self) -> Session {
        self.snapshot_rx.borrow().clone()
    }

    pub fn view(&self) -> SessionView {
        render(&self.snapshot(), &self.context)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SseEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Number of open event streams
    pub fn subscriber_count(&self) -> usize {
        self.broadcast_tx.receiver_count()
    }

    #[cfg(test)]
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.snapshot_rx.clone()
    }
}

/// Start a session task with an empty transcript.
///
/// The task ends once every handle is dropped and no request is in flight.
pub fn spawn_session<L>(context: SessionContext, llm: Option<Arc<L>>) -> SessionHandle
where
    L: LlmService + ?Sized + 'static,
{
    let context = Arc::new(context);
    let (event_tx, event_rx) = mpsc::channel(32);
    let (broadcast_tx, _) = broadcast::channel(128);
    let (snapshot_tx, snapshot_rx) = watch::channel(Session::new());

    let runtime = SessionRuntime::new(
        context.clone(),
        llm,
        event_rx,
        event_tx.downgrade(),
        broadcast_tx.clone(),
        snapshot_tx,
    );

    let session_id = context.session_id.clone();
    tokio::spawn(async move {
        runtime.run().await;
        tracing::info!(session_id = %session_id, "Session runtime finished");
    });

    SessionHandle {
        context,
        event_tx,
        broadcast_tx,
        snapshot_rx,
    }
}

/// How long a session may go without an event stream before it is reaped
const IDLE_GRACE: Duration = Duration::from_secs(30);

/// How often the manager looks for unwatched sessions
const REAP_INTERVAL: Duration = Duration::from_secs(10);

struct SessionEntry {
    handle: SessionHandle,
    unwatched_since: Option<Instant>,
}

/// Registry of live sessions, one per open page
pub struct SessionManager {
    llm: Option<Arc<dyn LlmService>>,
    model_id: String,
    sessions: RwLock<HashMap<String, SessionEntry>>,
    idle_grace: Duration,
}

impl SessionManager {
    /// Create a manager and start its reaper task.
    ///
    /// `llm` is `None` when no credential is configured; every session is
    /// then created with submission disabled.
    pub fn new(llm: Option<Arc<dyn LlmService>>, model_id: impl Into<String>) -> Arc<Self> {
        Self::with_reaping(llm, model_id, IDLE_GRACE, REAP_INTERVAL)
    }

    /// Like [`SessionManager::new`] with explicit reaping timings
    pub fn with_reaping(
        llm: Option<Arc<dyn LlmService>>,
        model_id: impl Into<String>,
        idle_grace: Duration,
        interval: Duration,
    ) -> Arc<Self> {
        let manager = Arc::new(Self {
            llm,
            model_id: model_id.into(),
            sessions: RwLock::new(HashMap::new()),
            idle_grace,
        });

        // Weak so the task does not keep the manager alive
        let manager_weak = Arc::downgrade(&manager);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(manager) = manager_weak.upgrade() else {
                    tracing::debug!("SessionManager dropped, reaper exiting");
                    break;
                };
                manager.reap_idle_sessions().await;
            }
        });

        manager
    }

    pub fn submission_enabled(&self) -> bool {
        self.llm.is_some()
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub async fn create(&self) -> SessionHandle {
        let session_id = uuid::Uuid::new_v4().to_string();
        let context = if self.submission_enabled() {
            SessionContext::new(&session_id, &self.model_id)
        } else {
            SessionContext::unconfigured(&session_id, &self.model_id)
        };

        let handle = spawn_session(context, self.llm.clone());
        let live = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(
                session_id.clone(),
                SessionEntry {
                    handle: handle.clone(),
                    unwatched_since: None,
                },
            );
            sessions.len()
        };

        tracing::info!(
            session_id = %session_id,
            submission_enabled = self.submission_enabled(),
            live_sessions = live,
            "Session created"
        );
        handle
    }

    pub async fn get(&self, session_id: &str) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|entry| entry.handle.clone())
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// Discard a session. Its task stops after any in-flight request
    /// completes and the remaining handles are dropped.
    pub async fn close(&self, session_id: &str) -> Result<(), SessionError> {
        if self.sessions.write().await.remove(session_id).is_none() {
            return Err(SessionError::NotFound(session_id.to_string()));
        }
        tracing::info!(session_id = %session_id, "Session closed");
        Ok(())
    }

    /// Discard every session
    pub async fn close_all(&self) {
        let closed = std::mem::take(&mut *self.sessions.write().await);
        tracing::info!(count = closed.len(), "Closed all sessions");
    }

    /// Drop sessions that have had no event stream subscriber for longer
    /// than the idle grace. Covers pages that went away without closing.
    pub async fn reap_idle_sessions(&self) {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|session_id, entry| {
            if entry.handle.subscriber_count() > 0 {
                entry.unwatched_since = None;
                return true;
            }
            let since = *entry.unwatched_since.get_or_insert(now);
            let keep = now.duration_since(since) < self.idle_grace;
            if !keep {
                tracing::info!(session_id = %session_id, "Reaping unwatched session");
            }
            keep
        });

        let reaped = before - sessions.len();
        if reaped > 0 {
            tracing::debug!(reaped, live_sessions = sessions.len(), "Idle sessions reaped");
        }
    }

    #[cfg(test)]
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
