//! Contracts for the collaborators the bridge drives but does not own:
//! the wallet, the messaging-protocol client, the social-graph backend,
//! and the runtime-asset host.

use anyhow::Result;
use consent_core::consent::{ConsentEntity, ConsentRecord, ConsentState};
use consent_core::event::InboundMessageEvent;
use consent_core::friendship::FriendSummary;
use consent_core::settings::{BridgeSettings, MessagingEnv};
use consent_core::UnreadCounterUpdate;
use futures::stream::BoxStream;
use std::sync::Arc;

/// The connected wallet.
#[async_trait::async_trait]
pub trait WalletSigner: Send + Sync {
    async fn address(&self) -> Result<String>;
    /// 130 hex characters; the trailing recovery byte is not reliable.
    async fn sign_message(&self, text: &str) -> Result<String>;
}

/// Signer handed to the messaging client: produces a verified 65-byte
/// recoverable signature for the connecting identity.
#[async_trait::async_trait]
pub trait ProtocolSigner: Send + Sync {
    fn identity(&self) -> String;
    async fn sign(&self, text: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub environment: MessagingEnv,
    pub runtime_asset_location: String,
    pub content_codecs: Vec<String>,
}

impl From<&BridgeSettings> for ClientOptions {
    fn from(settings: &BridgeSettings) -> Self {
        Self {
            environment: settings.environment,
            runtime_asset_location: settings.runtime_asset_location.clone(),
            content_codecs: settings.content_codecs.clone(),
        }
    }
}

#[async_trait::async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create(
        &self,
        signer: Arc<dyn ProtocolSigner>,
        options: ClientOptions,
    ) -> Result<Arc<dyn MessagingClient>>;
}

/// Which conversations a live stream should include.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFilter {
    pub consent_states: Vec<ConsentState>,
}

impl StreamFilter {
    pub fn allowed_only() -> Self {
        Self {
            consent_states: vec![ConsentState::Allowed],
        }
    }
}

/// Closes the producer side of a live stream. Must tolerate repeat calls.
pub trait StreamHandle: Send + Sync {
    fn close(&self);
}

/// A lazy, non-restartable sequence of inbound events plus its close handle.
pub struct MessageStream {
    pub events: BoxStream<'static, Result<InboundMessageEvent>>,
    pub handle: Box<dyn StreamHandle>,
}

#[async_trait::async_trait]
pub trait MessagingClient: Send + Sync {
    fn inbox_id(&self) -> String;
    async fn open_all_messages_stream(&self, filter: StreamFilter) -> Result<MessageStream>;
    async fn set_consent_states(&self, records: Vec<ConsentRecord>) -> Result<()>;
    async fn get_consent_state(&self, entity: ConsentEntity, entity_id: &str)
        -> Result<ConsentState>;
}

#[async_trait::async_trait]
pub trait SocialGraph: Send + Sync {
    async fn list_accepted_friends(&self, user: &str) -> Result<Vec<FriendSummary>>;
    async fn upsert_unread_counter(&self, update: UnreadCounterUpdate) -> Result<()>;
}

/// Existence check for the runtime asset the messaging client loads.
#[async_trait::async_trait]
pub trait AssetProbe: Send + Sync {
    async fn exists(&self, location: &str) -> Result<bool>;
}
