//! Messaging sessions: one authenticated protocol client per connected
//! identity.
//!
//! The manager's map doubles as the in-progress marker. A session is
//! inserted (initialising) under the lock before the first suspension
//! point, so a second `initialize` for the same identity always finds it
//! and returns it instead of starting another client.

use consent_core::identity::{canonicalize, CanonicalId};
use consent_core::EngineError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::capabilities::{AssetProbe, ClientFactory, ClientOptions, MessagingClient, WalletSigner};

mod signer;

pub use signer::RecoverableSigner;

/// Snapshot of a session's lifecycle.
#[derive(Clone, Default)]
pub struct SessionState {
    pub client: Option<Arc<dyn MessagingClient>>,
    pub initializing: bool,
    pub last_error: Option<EngineError>,
    pub stopped: bool,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("client", &self.client.as_ref().map(|c| c.inbox_id()))
            .field("initializing", &self.initializing)
            .field("last_error", &self.last_error)
            .field("stopped", &self.stopped)
            .finish()
    }
}

pub struct Session {
    identity: CanonicalId,
    state: watch::Sender<SessionState>,
}

impl Session {
    fn new(identity: CanonicalId, initial: SessionState) -> Self {
        let (state, _) = watch::channel(initial);
        Self { identity, state }
    }

    fn initializing(identity: CanonicalId) -> Self {
        Self::new(
            identity,
            SessionState {
                initializing: true,
                ..SessionState::default()
            },
        )
    }

    fn failed(identity: CanonicalId, error: EngineError) -> Self {
        Self::new(
            identity,
            SessionState {
                last_error: Some(error),
                ..SessionState::default()
            },
        )
    }

    pub fn identity(&self) -> &CanonicalId {
        &self.identity
    }

    pub fn status(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn client(&self) -> Option<Arc<dyn MessagingClient>> {
        self.state.borrow().client.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().client.is_some()
    }

    pub fn is_initializing(&self) -> bool {
        self.state.borrow().initializing
    }

    pub fn is_stopped(&self) -> bool {
        self.state.borrow().stopped
    }

    pub fn last_error(&self) -> Option<EngineError> {
        self.state.borrow().last_error.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Wait until initialisation settles one way or the other.
    pub async fn wait_ready(&self) -> Result<Arc<dyn MessagingClient>, EngineError> {
        let mut rx = self.subscribe();
        loop {
            {
                let state = rx.borrow_and_update();
                if let Some(client) = &state.client {
                    return Ok(client.clone());
                }
                if let Some(err) = &state.last_error {
                    return Err(err.clone());
                }
                if state.stopped {
                    return Err(EngineError::WalletNotConnected);
                }
            }
            if rx.changed().await.is_err() {
                return Err(EngineError::WalletNotConnected);
            }
        }
    }

    /// Install the created client unless the session was torn down
    /// meanwhile. Returns whether it was installed.
    fn complete(&self, client: Arc<dyn MessagingClient>) -> bool {
        self.state.send_if_modified(|state| {
            if state.stopped {
                return false;
            }
            state.client = Some(client);
            state.initializing = false;
            state.last_error = None;
            true
        })
    }

    fn fail(&self, error: EngineError) {
        self.state.send_modify(|state| {
            state.initializing = false;
            state.last_error = Some(error);
        });
    }

    fn stop(&self) {
        self.state.send_modify(|state| {
            state.stopped = true;
            state.initializing = false;
            state.client = None;
        });
    }
}

/// Owns every live [`Session`], keyed by canonical identity.
pub struct SessionManager {
    factory: Arc<dyn ClientFactory>,
    probe: Arc<dyn AssetProbe>,
    options: ClientOptions,
    sessions: Mutex<HashMap<CanonicalId, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        probe: Arc<dyn AssetProbe>,
        options: ClientOptions,
    ) -> Self {
        Self {
            factory,
            probe,
            options,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create (or join) the session for `identity`.
    ///
    /// A session that is ready or still initialising is returned as is.
    /// A failed or absent one is replaced by a fresh attempt, which this
    /// call drives to completion before returning.
    pub async fn initialize(&self, identity: &str, wallet: Arc<dyn WalletSigner>) -> Arc<Session> {
        let id = canonicalize(identity);
        if id.is_empty() {
            warn!("initialize called without a connected identity");
            return Arc::new(Session::failed(id, EngineError::WalletNotConnected));
        }

        let session = {
            let mut sessions = self.sessions.lock();
            if let Some(existing) = sessions.get(&id) {
                if existing.is_ready() || existing.is_initializing() {
                    debug!(identity = %id, "session already present; joining");
                    return existing.clone();
                }
            }
            let session = Arc::new(Session::initializing(id.clone()));
            sessions.insert(id.clone(), session.clone());
            session
        };

        info!(identity = %id, "initialising messaging session");
        match self.create_client(&session, wallet).await {
            Ok(Some(client)) => {
                if session.complete(client) {
                    info!(identity = %id, "messaging session ready");
                } else {
                    info!(identity = %id, "session torn down during creation; client discarded");
                }
            }
            Ok(None) => {
                info!(identity = %id, "session torn down during creation");
            }
            Err(err) => {
                warn!(identity = %id, error = %err, "messaging session failed");
                session.fail(err);
            }
        }
        session
    }

    /// `Ok(None)` when the session was stopped at a suspension point.
    async fn create_client(
        &self,
        session: &Session,
        wallet: Arc<dyn WalletSigner>,
    ) -> Result<Option<Arc<dyn MessagingClient>>, EngineError> {
        let id = session.identity().clone();

        let wallet_address = match wallet.address().await {
            Ok(address) => canonicalize(&address),
            Err(err) => {
                debug!(error = %err, "wallet address unavailable");
                CanonicalId::default()
            }
        };
        if session.is_stopped() {
            return Ok(None);
        }
        if wallet_address.is_empty() {
            return Err(EngineError::WalletNotConnected);
        }
        if wallet_address != id {
            warn!(identity = %id, wallet = %wallet_address, "wallet no longer matches identity");
            return Err(EngineError::WalletNotConnected);
        }

        let location = self.options.runtime_asset_location.clone();
        let present = match self.probe.exists(&location).await {
            Ok(present) => present,
            Err(err) => {
                warn!(%location, error = %err, "runtime asset probe failed");
                false
            }
        };
        if session.is_stopped() {
            return Ok(None);
        }
        if !present {
            return Err(EngineError::RuntimeAssetMissing(location));
        }

        let signer = Arc::new(RecoverableSigner::new(wallet, id.to_prefixed()));
        let client = self
            .factory
            .create(signer, self.options.clone())
            .await
            .map_err(|err| EngineError::classify(&err))?;
        Ok(Some(client))
    }

    pub fn get_session(&self, identity: &str) -> Option<Arc<Session>> {
        self.sessions.lock().get(&canonicalize(identity)).cloned()
    }

    /// Stop and forget the session for `identity`. Safe to call repeatedly.
    pub fn teardown(&self, identity: &str) -> bool {
        let id = canonicalize(identity);
        let removed = self.sessions.lock().remove(&id);
        match removed {
            Some(session) => {
                session.stop();
                info!(identity = %id, "messaging session torn down");
                true
            }
            None => false,
        }
    }

    pub fn teardown_all(&self) {
        let drained: Vec<_> = self.sessions.lock().drain().collect();
        for (id, session) in drained {
            session.stop();
            info!(identity = %id, "messaging session torn down");
        }
    }
}
