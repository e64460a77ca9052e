//! Async driver for the [`Coordinator`].
//!
//! Owns the event channel. Network calls and timers run in spawned tasks and
//! post their completion back as events, so frame handling never waits on
//! them.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::coordinator::{CoachEvent, Coordinator, Effect};
use crate::conversation::Role;
use crate::error::Result;
use crate::overlay::Overlay;

pub use crate::schemas::{AssistantRequest, AssistantResponse as AssistantReply, FeedbackRequest};

/// Network side of the client: the coach server endpoints
#[async_trait]
pub trait CoachBackend: Send + Sync + 'static {
    async fn feedback(&self, request: &FeedbackRequest) -> Result<String>;
    async fn ask(&self, request: &AssistantRequest) -> Result<AssistantReply>;
    async fn start_workout(&self) -> Result<i64>;
    async fn end_workout(&self, session_id: i64, summary: &str) -> Result<()>;
}

/// Device side of the client: drawing and speech.
///
/// Implementations report speech callbacks (output started/ended, input
/// ended, transcripts) by sending [`CoachEvent`]s on the runtime's channel.
pub trait Platform: Send {
    fn render(&mut self, overlay: &Overlay);
    fn speak(&mut self, text: &str);
    fn start_input(&mut self);
    fn stop_input(&mut self);
    fn show_message(&mut self, role: Role, text: &str);
    fn status(&mut self, text: &str);
}

pub struct CoachRuntime<P: Platform> {
    coordinator: Coordinator,
    backend: Arc<dyn CoachBackend>,
    platform: P,
    events_tx: mpsc::UnboundedSender<CoachEvent>,
    events_rx: mpsc::UnboundedReceiver<CoachEvent>,
}

impl<P: Platform> CoachRuntime<P> {
    /// Build a runtime around an existing channel, so the platform can be
    /// handed a sender before the runtime exists.
    pub fn new(
        coordinator: Coordinator,
        backend: Arc<dyn CoachBackend>,
        platform: P,
        events_tx: mpsc::UnboundedSender<CoachEvent>,
        events_rx: mpsc::UnboundedReceiver<CoachEvent>,
    ) -> Self {
        Self {
            coordinator,
            backend,
            platform,
            events_tx,
            events_rx,
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<CoachEvent> {
        self.events_tx.clone()
    }

    /// Process events until [`CoachEvent::Shutdown`]. Returns the final
    /// coordinator and platform for inspection.
    pub async fn run(mut self) -> (Coordinator, P) {
        while let Some(event) = self.events_rx.recv().await {
            if matches!(event, CoachEvent::Shutdown) {
                debug!("coach runtime shutting down");
                break;
            }
            let now = tokio::time::Instant::now().into_std();
            let effects = self.coordinator.handle(event, now);
            for effect in effects {
                self.execute(effect);
            }
        }
        (self.coordinator, self.platform)
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Render(overlay) => self.platform.render(&overlay),
            Effect::Speak(text) => self.platform.speak(&text),
            Effect::StartInput => self.platform.start_input(),
            Effect::StopInput => self.platform.stop_input(),
            Effect::ShowMessage { role, text } => self.platform.show_message(role, &text),
            Effect::Status(text) => self.platform.status(&text),
            Effect::DispatchFeedback(request) => {
                let backend = self.backend.clone();
                self.spawn_reply(async move {
                    let result = backend.feedback(&request).await.map_err(|e| e.to_string());
                    CoachEvent::FeedbackSettled(result)
                });
            }
            Effect::AskAssistant(request) => {
                let backend = self.backend.clone();
                self.spawn_reply(async move {
                    match backend.ask(&request).await {
                        Ok(reply) => CoachEvent::AssistantReplied(reply),
                        Err(e) => CoachEvent::AssistantFailed(e.to_string()),
                    }
                });
            }
            Effect::OpenSession => {
                let backend = self.backend.clone();
                self.spawn_reply(async move {
                    match backend.start_workout().await {
                        Ok(session_id) => CoachEvent::SessionOpened { session_id },
                        Err(e) => CoachEvent::SessionOpenFailed(e.to_string()),
                    }
                });
            }
            Effect::CloseSession {
                session_id,
                summary,
            } => {
                let backend = self.backend.clone();
                tokio::spawn(async move {
                    if let Err(e) = backend.end_workout(session_id, &summary).await {
                        warn!(session_id, "failed to close workout session: {}", e);
                    }
                });
            }
            Effect::ResumeListeningAfter(delay) => {
                self.spawn_reply(async move {
                    tokio::time::sleep(delay).await;
                    CoachEvent::ResumeListening
                });
            }
        }
    }

    fn spawn_reply<F>(&self, task: F)
    where
        F: std::future::Future<Output = CoachEvent> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = task.await;
            // receiver gone means the runtime already shut down
            let _ = tx.send(event);
        });
    }
}
