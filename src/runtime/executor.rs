//! Session runtime executor

use super::SseEvent;

use crate::llm::LlmService;
use crate::state_machine::{transition, Effect, Event, SessionContext, TransitionError};
use crate::system_prompt::build_request;
use crate::transcript::{Message, Session};
use crate::view::render;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

/// Runtime that owns one session and performs the effects of its transitions
pub struct SessionRuntime<L: LlmService + ?Sized + 'static> {
    context: Arc<SessionContext>,
    session: Session,
    /// `None` when no credential is configured
    llm: Option<Arc<L>>,
    event_rx: mpsc::Receiver<Event>,
    /// Weak so that dropping every handle ends the loop
    event_tx: mpsc::WeakSender<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    snapshot_tx: watch::Sender<Session>,
}

impl<L: LlmService + ?Sized + 'static> SessionRuntime<L> {
    pub fn new(
        context: Arc<SessionContext>,
        llm: Option<Arc<L>>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::WeakSender<Event>,
        broadcast_tx: broadcast::Sender<SseEvent>,
        snapshot_tx: watch::Sender<Session>,
    ) -> Self {
        let session = snapshot_tx.borrow().clone();
        Self {
            context,
            session,
            llm,
            event_rx,
            event_tx,
            broadcast_tx,
            snapshot_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            session_id = %self.context.session_id,
            model = %self.context.model_id,
            "Starting session runtime"
        );

        while let Some(event) = self.event_rx.recv().await {
            self.process_event(event);
        }

        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        let result = match transition(&self.session, &self.context, event) {
            Ok(r) => r,
            Err(
                e @ (TransitionError::EmptyMessage
                | TransitionError::SessionBusy
                | TransitionError::SubmissionDisabled),
            ) => {
                // Ignored submissions are a normal part of the input flow
                tracing::debug!(
                    session_id = %self.context.session_id,
                    reason = %e,
                    "Submission ignored"
                );
                return;
            }
            Err(e) => {
                tracing::warn!(session_id = %self.context.session_id, error = %e, "Event rejected");
                return;
            }
        };

        self.session = result.new_session;

        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::PublishSession => {
                self.snapshot_tx.send_replace(self.session.clone());
                let _ = self.broadcast_tx.send(SseEvent::StateChange {
                    session: render(&self.session, &self.context),
                });
            }

            Effect::NotifyMessage { message } => {
                let _ = self.broadcast_tx.send(SseEvent::Message { message });
            }

            Effect::NotifyDone => {
                let _ = self.broadcast_tx.send(SseEvent::Done);
            }

            Effect::RequestGeneration { history, prompt } => {
                self.spawn_generation(history, prompt);
            }
        }
    }

    /// Run the generation call in the background and feed its outcome back
    /// as exactly one completion event.
    fn spawn_generation(&self, history: Vec<Message>, prompt: String) {
        let Some(event_tx) = self.event_tx.upgrade() else {
            // Every handle is gone, so no one is left to observe the outcome
            tracing::warn!(session_id = %self.context.session_id, "Event channel closed");
            return;
        };
        let llm = self.llm.clone();
        let session_id = self.context.session_id.clone();

        tokio::spawn(async move {
            tracing::info!(
                session_id = %session_id,
                turns = history.len() + 1,
                "Making generation request (background)"
            );

            // The call runs in its own task so a panic still yields a
            // completion event and releases the sending status
            let work = tokio::spawn(async move {
                let Some(llm) = llm else {
                    return Event::GenerationFailed {
                        message: Some("No generation service is configured".to_string()),
                        block_reason: None,
                    };
                };
                let request = build_request(&history, &prompt);
                match llm.complete(&request).await {
                    Ok(response) => Event::GenerationSucceeded {
                        text: response.text,
                    },
                    Err(e) => Event::generation_failed(&e),
                }
            });

            let event = match work.await {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(session_id = %session_id, error = %e, "Generation task failed");
                    Event::GenerationFailed {
                        message: Some(format!("Request task failed: {e}")),
                        block_reason: None,
                    }
                }
            };

            if event_tx.send(event).await.is_err() {
                tracing::debug!(session_id = %session_id, "Session gone before completion");
            }
        });
    }
}
