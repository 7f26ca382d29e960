//! Top-level coordinator wiring sessions, consent sync and dispatch to the
//! host's wallet lifecycle.
//!
//! connect → session initialised → friend consent re-asserted → dispatcher
//! started. disconnect (or connecting a different identity) tears all of
//! that down again.

use consent_core::cooldown::CooldownWindow;
use consent_core::friendship::FriendshipEvent;
use consent_core::identity::{canonicalize, CanonicalId};
use consent_core::settings::{BridgeSettings, SettingsError};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::capabilities::{AssetProbe, ClientFactory, ClientOptions, SocialGraph, WalletSigner};
use crate::consent_sync::ConsentSynchronizer;
use crate::cooldown_watch::{Clock, CooldownObserver};
use crate::dispatcher::{
    ActiveConversation, DispatcherConfig, DispatcherHandle, DispatcherState, InboundDispatcher,
};
use crate::session::{Session, SessionManager};

struct RunningDispatcher {
    session: Arc<Session>,
    handle: DispatcherHandle,
}

/// Result of applying one friendship transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendshipOutcome {
    pub consent_applied: bool,
    pub cooldown: Option<CooldownWindow>,
}

pub struct MessagingBridge {
    settings: BridgeSettings,
    sessions: Arc<SessionManager>,
    consent: ConsentSynchronizer,
    graph: Arc<dyn SocialGraph>,
    active_conversation: ActiveConversation,
    current: Mutex<Option<CanonicalId>>,
    dispatchers: Mutex<HashMap<CanonicalId, RunningDispatcher>>,
}

impl MessagingBridge {
    /// Fails when `settings` do not pass [`BridgeSettings::validate`].
    pub fn new(
        settings: BridgeSettings,
        factory: Arc<dyn ClientFactory>,
        probe: Arc<dyn AssetProbe>,
        graph: Arc<dyn SocialGraph>,
        active_conversation: ActiveConversation,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        let sessions = Arc::new(SessionManager::new(
            factory,
            probe,
            ClientOptions::from(&settings),
        ));
        Ok(Self {
            consent: ConsentSynchronizer::new(sessions.clone()),
            settings,
            sessions,
            graph,
            active_conversation,
            current: Mutex::new(None),
            dispatchers: Mutex::new(HashMap::new()),
        })
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn consent(&self) -> &ConsentSynchronizer {
        &self.consent
    }

    pub fn current_identity(&self) -> Option<CanonicalId> {
        self.current.lock().clone()
    }

    pub fn dispatcher_state(&self, identity: &str) -> Option<DispatcherState> {
        self.dispatchers
            .lock()
            .get(&canonicalize(identity))
            .map(|running| running.handle.state())
    }

    /// Bring messaging up for `identity`, replacing any other connected one.
    pub async fn connect(&self, identity: &str, wallet: Arc<dyn WalletSigner>) -> Arc<Session> {
        let id = canonicalize(identity);
        if !id.is_empty() {
            let previous = self.current.lock().replace(id.clone());
            if let Some(previous) = previous.filter(|p| *p != id) {
                info!(from = %previous, to = %id, "identity changed");
                self.shutdown_identity(&previous);
            }
        }

        let session = self.sessions.initialize(identity, wallet).await;
        if session.is_stopped() || session.last_error().is_some() {
            return session;
        }
        if session.is_ready() {
            self.consent.load_and_sync(identity, self.graph.as_ref()).await;
            if !self.is_live(&session) {
                info!(identity = %session.identity(), "session torn down during friend sync");
                return session;
            }
        }
        self.ensure_dispatcher(&session, identity);
        session
    }

    /// Still registered and not stopped.
    fn is_live(&self, session: &Arc<Session>) -> bool {
        !session.is_stopped()
            && self
                .sessions
                .get_session(session.identity().as_str())
                .is_some_and(|registered| Arc::ptr_eq(&registered, session))
    }

    /// Tear down everything for `identity`. Safe to repeat.
    pub fn disconnect(&self, identity: &str) {
        let id = canonicalize(identity);
        {
            let mut current = self.current.lock();
            if current.as_ref() == Some(&id) {
                *current = None;
            }
        }
        self.shutdown_identity(&id);
    }

    pub fn shutdown(&self) {
        let drained: Vec<_> = self.dispatchers.lock().drain().collect();
        for (_, running) in drained {
            running.handle.stop();
        }
        self.sessions.teardown_all();
        *self.current.lock() = None;
    }

    fn shutdown_identity(&self, id: &CanonicalId) {
        if let Some(running) = self.dispatchers.lock().remove(id) {
            running.handle.stop();
        }
        self.sessions.teardown(id.as_str());
    }

    fn ensure_dispatcher(&self, session: &Arc<Session>, identity: &str) {
        let id = session.identity().clone();
        let mut dispatchers = self.dispatchers.lock();
        if !self.is_live(session) {
            return;
        }
        if let Some(running) = dispatchers.get(&id) {
            if Arc::ptr_eq(&running.session, session) {
                if running.handle.state() != DispatcherState::Stopped {
                    return;
                }
            } else if !running.session.is_stopped() {
                // belongs to a newer session
                return;
            }
        }
        let handle = InboundDispatcher::new(
            session.clone(),
            identity,
            self.graph.clone(),
            self.active_conversation.clone(),
            DispatcherConfig::from(&self.settings),
        )
        .spawn();
        // replacing drops (and so stops) any stale dispatcher
        dispatchers.insert(
            id,
            RunningDispatcher {
                session: session.clone(),
                handle,
            },
        );
    }

    /// Re-load accepted friends for the current identity and re-assert consent.
    pub async fn refresh_friends(&self) -> bool {
        let Some(id) = self.current_identity() else {
            return false;
        };
        self.consent
            .load_and_sync(&id.to_prefixed(), self.graph.as_ref())
            .await
    }

    /// Apply one friendship transition to protocol consent, without a full
    /// resync.
    pub async fn apply_friendship(&self, event: &FriendshipEvent) -> FriendshipOutcome {
        let Some(id) = self.current_identity() else {
            warn!("friendship transition without a connected identity");
            return FriendshipOutcome {
                consent_applied: false,
                cooldown: event.cooldown(),
            };
        };
        let consent_applied = self
            .consent
            .set_consent(id.as_str(), event.peer(), event.consent())
            .await;
        FriendshipOutcome {
            consent_applied,
            cooldown: event.cooldown(),
        }
    }

    /// Tick a cooldown window at the configured cadence.
    pub fn observe_cooldown(&self, window: CooldownWindow, clock: Clock) -> CooldownObserver {
        CooldownObserver::start(
            window,
            Duration::from_millis(self.settings.cooldown_tick_ms),
            clock,
        )
    }
}

impl Drop for MessagingBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}
