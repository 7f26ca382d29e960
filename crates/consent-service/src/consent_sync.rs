//! Keeps protocol consent in line with the social graph.
//!
//! Every operation needs a ready session; without one it logs and reports
//! failure. Protocol errors are absorbed the same way so one bad peer or a
//! flaky backend never aborts the caller.

use consent_core::consent::{entity_for, records_for_peers, ConsentRecord, ConsentState};
use consent_core::friendship::FriendSummary;
use consent_core::identity::canonicalize;
use consent_core::EngineError;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::capabilities::{MessagingClient, SocialGraph};
use crate::session::SessionManager;

#[derive(Clone)]
pub struct ConsentSynchronizer {
    sessions: Arc<SessionManager>,
}

impl ConsentSynchronizer {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    fn ready_client(&self, owner: &str) -> Option<Arc<dyn MessagingClient>> {
        let client = self
            .sessions
            .get_session(owner)
            .and_then(|session| session.client());
        if client.is_none() {
            debug!(owner = %canonicalize(owner), "consent call without a ready session");
        }
        client
    }

    /// Set one peer's consent. Returns whether the protocol accepted it.
    pub async fn set_consent(&self, owner: &str, peer: &str, state: ConsentState) -> bool {
        let Some(client) = self.ready_client(owner) else {
            return false;
        };
        let Some(record) = ConsentRecord::for_peer(peer, state) else {
            warn!(peer, "consent peer is unresolvable");
            return false;
        };
        apply(client.as_ref(), vec![record]).await.is_ok()
    }

    /// Set many peers' consent in one protocol call. Unresolvable peers are
    /// dropped; an empty remainder is a failure.
    pub async fn batch_set_consent<'a, I>(&self, owner: &str, peers: I, state: ConsentState) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let Some(client) = self.ready_client(owner) else {
            return false;
        };
        let records = records_for_peers(peers, state);
        if records.is_empty() {
            debug!("batch consent has no resolvable peers");
            return false;
        }
        apply(client.as_ref(), records).await.is_ok()
    }

    /// Re-assert `allowed` for every accepted friend. Runs on each friend
    /// list load without diffing; the protocol treats repeats as no-ops.
    pub async fn sync_friends(&self, owner: &str, friends: &[FriendSummary]) -> bool {
        let ok = self
            .batch_set_consent(
                owner,
                friends.iter().map(|f| f.user_address.as_str()),
                ConsentState::Allowed,
            )
            .await;
        if ok {
            info!(owner = %canonicalize(owner), friends = friends.len(), "friend consent re-asserted");
        }
        ok
    }

    /// Load the accepted-friend list from the backend, then [`Self::sync_friends`].
    pub async fn load_and_sync(&self, owner: &str, graph: &dyn SocialGraph) -> bool {
        match graph.list_accepted_friends(owner).await {
            Ok(friends) => self.sync_friends(owner, &friends).await,
            Err(err) => {
                warn!(error = %err, "accepted friend list unavailable");
                false
            }
        }
    }

    /// `None` when the session is not ready, the peer is unresolvable, or
    /// the protocol lookup failed.
    pub async fn get_consent(&self, owner: &str, peer: &str) -> Option<ConsentState> {
        let client = self.ready_client(owner)?;
        let (entity, entity_id) = entity_for(&canonicalize(peer))?;
        match client.get_consent_state(entity, &entity_id).await {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(peer, error = %err, "consent lookup failed");
                None
            }
        }
    }
}

async fn apply(client: &dyn MessagingClient, records: Vec<ConsentRecord>) -> Result<(), EngineError> {
    let count = records.len();
    client.set_consent_states(records).await.map_err(|err| {
        let err = EngineError::ConsentUpdateFailed(err.to_string());
        warn!(error = %err, count, "consent update failed");
        err
    })?;
    debug!(count, "consent records applied");
    Ok(())
}
