//! Global inbound-message dispatcher.
//!
//! One task per session holds the live "all messages" subscription and
//! turns each event into an unread-counter upsert on the social graph.
//! Lifecycle: `Idle -> Starting -> Streaming -> Stopped`; nothing restarts
//! it, a new session gets a new dispatcher.

use consent_core::event::{project, InboundMessageEvent, ProjectionContext, SkipReason};
use consent_core::identity::canonicalize;
use consent_core::settings::BridgeSettings;
use consent_core::{EngineError, UnreadCounterUpdate};
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::capabilities::{MessageStream, MessagingClient, SocialGraph, StreamFilter};
use crate::session::Session;

/// The conversation currently open in the UI, owned by the host.
pub type ActiveConversation = watch::Receiver<Option<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatcherState {
    Idle,
    Starting,
    Streaming,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub preview_max_chars: usize,
    pub preview_placeholder: String,
}

impl From<&BridgeSettings> for DispatcherConfig {
    fn from(settings: &BridgeSettings) -> Self {
        Self {
            preview_max_chars: settings.preview_max_chars,
            preview_placeholder: settings.preview_placeholder.clone(),
        }
    }
}

pub struct InboundDispatcher {
    session: Arc<Session>,
    local_user: String,
    graph: Arc<dyn SocialGraph>,
    active_conversation: ActiveConversation,
    config: DispatcherConfig,
}

/// Owner's side of a running dispatcher. Dropping it stops the task.
pub struct DispatcherHandle {
    state: watch::Receiver<DispatcherState>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    pub fn state(&self) -> DispatcherState {
        *self.state.borrow()
    }

    /// Request shutdown. Repeat calls are harmless.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Wait for the task to reach `Stopped`.
    pub async fn stopped(&mut self) {
        while *self.state.borrow_and_update() != DispatcherState::Stopped {
            if self.state.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl InboundDispatcher {
    pub fn new(
        session: Arc<Session>,
        local_user: impl Into<String>,
        graph: Arc<dyn SocialGraph>,
        active_conversation: ActiveConversation,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            session,
            local_user: local_user.into(),
            graph,
            active_conversation,
            config,
        }
    }

    pub fn spawn(self) -> DispatcherHandle {
        let (state_tx, state_rx) = watch::channel(DispatcherState::Idle);
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(state_tx, stop_rx));
        DispatcherHandle {
            state: state_rx,
            stop: stop_tx,
            task,
        }
    }

    fn cancelled(&self, stop: &watch::Receiver<bool>) -> bool {
        *stop.borrow() || self.session.is_stopped()
    }

    async fn run(self, state: watch::Sender<DispatcherState>, mut stop: watch::Receiver<bool>) {
        let identity = self.session.identity().clone();

        let Some(client) = self.wait_for_client(&mut stop).await else {
            debug!(identity = %identity, "dispatcher stopped before session was ready");
            state.send_replace(DispatcherState::Stopped);
            return;
        };
        if canonicalize(&self.local_user).is_empty() {
            debug!("dispatcher has no local identity");
            state.send_replace(DispatcherState::Stopped);
            return;
        }

        state.send_replace(DispatcherState::Starting);
        let opened = client
            .open_all_messages_stream(StreamFilter::allowed_only())
            .await;
        if self.cancelled(&stop) {
            if let Ok(stream) = opened {
                stream.handle.close();
            }
            info!(identity = %identity, "dispatcher cancelled while opening stream");
            state.send_replace(DispatcherState::Stopped);
            return;
        }
        let MessageStream { mut events, handle } = match opened {
            Ok(stream) => stream,
            Err(err) => {
                let err = EngineError::StreamOpenFailed(format!("{err:#}"));
                error!(identity = %identity, error = %err, "inbound stream failed to open");
                state.send_replace(DispatcherState::Stopped);
                return;
            }
        };

        state.send_replace(DispatcherState::Streaming);
        info!(identity = %identity, "inbound stream open");

        let own_inbox_id = client.inbox_id();
        let mut session_rx = self.session.subscribe();
        loop {
            tokio::select! {
                biased;
                _ = stop.changed() => break,
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                next = events.next() => match next {
                    Some(Ok(event)) => {
                        self.process_event(&own_inbox_id, &event).await;
                    }
                    Some(Err(err)) => warn!(identity = %identity, error = %err, "inbound stream error"),
                    None => {
                        info!(identity = %identity, "inbound stream ended");
                        break;
                    }
                },
            }
            if self.cancelled(&stop) {
                break;
            }
        }

        handle.close();
        state.send_replace(DispatcherState::Stopped);
        info!(identity = %identity, "dispatcher stopped");
    }

    async fn wait_for_client(
        &self,
        stop: &mut watch::Receiver<bool>,
    ) -> Option<Arc<dyn MessagingClient>> {
        let mut session_rx = self.session.subscribe();
        loop {
            if *stop.borrow() {
                return None;
            }
            let snapshot = session_rx.borrow_and_update().clone();
            if snapshot.stopped {
                return None;
            }
            if let Some(client) = snapshot.client {
                return Some(client);
            }
            if !snapshot.initializing {
                // settled without a client: initialisation failed
                return None;
            }
            tokio::select! {
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
            }
        }
    }

    /// Run one event through the filter chain and, if it survives, upsert
    /// the unread counter. Returns the update that was sent.
    pub async fn process_event(
        &self,
        own_inbox_id: &str,
        event: &InboundMessageEvent,
    ) -> Option<UnreadCounterUpdate> {
        // read per event: the user may navigate while the stream is live
        let active = self.active_conversation.borrow().clone();
        let ctx = ProjectionContext {
            local_user: &self.local_user,
            own_inbox_id,
            active_conversation: active.as_deref(),
            now_ms: consent_core::now_ms(),
            preview_max_chars: self.config.preview_max_chars,
            preview_placeholder: &self.config.preview_placeholder,
        };

        let update = match project(event, &ctx) {
            Ok(update) => update,
            Err(reason) => {
                log_skip(&event.id, reason);
                return None;
            }
        };

        if let Err(err) = self.graph.upsert_unread_counter(update.clone()).await {
            let err = EngineError::CounterUpdateFailed(format!("{err:#}"));
            warn!(message_id = %event.id, error = %err, "unread counter update failed");
            return None;
        }
        debug!(message_id = %event.id, peer = %update.peer_inbox_id, "unread counter updated");
        Some(update)
    }
}

fn log_skip(message_id: &str, reason: SkipReason) {
    debug!(message_id, ?reason, "inbound event skipped");
}
