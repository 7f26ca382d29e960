#![allow(dead_code)]

use anyhow::{anyhow, Result};
use consent_core::consent::{ConsentEntity, ConsentRecord, ConsentState};
use consent_core::event::{ContentTypeId, InboundMessageEvent, MessageContent};
use consent_core::friendship::FriendSummary;
use consent_core::signature::{address_of, personal_message_hash};
use consent_core::UnreadCounterUpdate;
use consent_service::capabilities::{
    AssetProbe, ClientFactory, ClientOptions, MessageStream, MessagingClient, ProtocolSigner,
    SocialGraph, StreamFilter, StreamHandle, WalletSigner,
};
use futures::channel::mpsc;
use futures::StreamExt;
use k256::ecdsa::SigningKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub const OWN_INBOX: &str = "0xOwnInbox";

// ── Wallet ───────────────────────────────────────────────────────────────────

pub struct MockWallet {
    key: SigningKey,
    pub connected: bool,
}

impl MockWallet {
    pub fn new() -> Self {
        Self {
            key: SigningKey::random(&mut rand::rngs::OsRng),
            connected: true,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new()
        }
    }

    pub fn address_hex(&self) -> String {
        address_of(self.key.verifying_key()).to_prefixed()
    }
}

#[async_trait::async_trait]
impl WalletSigner for MockWallet {
    async fn address(&self) -> Result<String> {
        if !self.connected {
            return Err(anyhow!("no account"));
        }
        Ok(self.address_hex().to_uppercase().replacen("0X", "0x", 1))
    }

    async fn sign_message(&self, text: &str) -> Result<String> {
        let prehash = personal_message_hash(text.as_bytes());
        let (sig, _) = self.key.sign_prehash_recoverable(&prehash)?;
        let mut bytes = sig.to_bytes().to_vec();
        // wallets in the wild report a junk recovery byte
        bytes.push(0);
        Ok(hex::encode(bytes))
    }
}

// ── Messaging client ─────────────────────────────────────────────────────────

pub struct MockHandle {
    closed: Arc<AtomicUsize>,
}

impl StreamHandle for MockHandle {
    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MockClient {
    pub inbox: String,
    pub consent: Mutex<HashMap<(ConsentEntity, String), ConsentState>>,
    pub consent_calls: Mutex<Vec<Vec<ConsentRecord>>>,
    pub fail_consent: Mutex<bool>,
    pub streams_opened: AtomicUsize,
    pub streams_closed: Arc<AtomicUsize>,
    pub fail_open: bool,
    pub open_gate: Option<Arc<Notify>>,
    sender: Mutex<Option<mpsc::UnboundedSender<Result<InboundMessageEvent>>>>,
    stream_ready: Notify,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            inbox: OWN_INBOX.to_string(),
            ..Self::default()
        }
    }

    pub fn refusing_streams() -> Self {
        Self {
            fail_open: true,
            ..Self::new()
        }
    }

    pub fn with_open_gate(gate: Arc<Notify>) -> Self {
        Self {
            open_gate: Some(gate),
            ..Self::new()
        }
    }

    /// Push an event into the open stream, waiting for it to open.
    pub async fn emit(&self, event: InboundMessageEvent) {
        self.emit_result(Ok(event)).await;
    }

    pub async fn emit_result(&self, item: Result<InboundMessageEvent>) {
        loop {
            let notified = self.stream_ready.notified();
            if let Some(tx) = self.sender.lock().as_ref() {
                tx.unbounded_send(item).expect("stream receiver alive");
                return;
            }
            tokio::time::timeout(Duration::from_secs(5), notified)
                .await
                .expect("stream never opened");
        }
    }

    pub fn end_stream(&self) {
        self.sender.lock().take();
    }

    pub fn closed_count(&self) -> usize {
        self.streams_closed.load(Ordering::SeqCst)
    }

    pub fn consent_of(&self, entity: ConsentEntity, id: &str) -> Option<ConsentState> {
        self.consent.lock().get(&(entity, id.to_string())).copied()
    }
}

#[async_trait::async_trait]
impl MessagingClient for MockClient {
    fn inbox_id(&self) -> String {
        self.inbox.clone()
    }

    async fn open_all_messages_stream(&self, filter: StreamFilter) -> Result<MessageStream> {
        assert_eq!(filter, StreamFilter::allowed_only());
        if let Some(gate) = &self.open_gate {
            gate.notified().await;
        }
        if self.fail_open {
            return Err(anyhow!("stream refused"));
        }
        self.streams_opened.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded();
        *self.sender.lock() = Some(tx);
        self.stream_ready.notify_waiters();
        Ok(MessageStream {
            events: rx.boxed(),
            handle: Box::new(MockHandle {
                closed: self.streams_closed.clone(),
            }),
        })
    }

    async fn set_consent_states(&self, records: Vec<ConsentRecord>) -> Result<()> {
        if *self.fail_consent.lock() {
            return Err(anyhow!("consent backend down"));
        }
        let mut consent = self.consent.lock();
        for r in &records {
            consent.insert((r.entity, r.entity_id.clone()), r.state);
        }
        self.consent_calls.lock().push(records);
        Ok(())
    }

    async fn get_consent_state(&self, entity: ConsentEntity, entity_id: &str) -> Result<ConsentState> {
        Ok(self
            .consent_of(entity, entity_id)
            .unwrap_or(ConsentState::Unknown))
    }
}

// ── Client factory ───────────────────────────────────────────────────────────

pub struct MockFactory {
    pub client: Arc<MockClient>,
    pub created: AtomicUsize,
    pub gate: Option<Arc<Notify>>,
    pub failure: Option<String>,
    pub signatures: Mutex<Vec<Vec<u8>>>,
    pub options_seen: Mutex<Vec<ClientOptions>>,
}

impl MockFactory {
    pub fn new(client: Arc<MockClient>) -> Self {
        Self {
            client,
            created: AtomicUsize::new(0),
            gate: None,
            failure: None,
            signatures: Mutex::new(Vec::new()),
            options_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn gated(client: Arc<MockClient>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(client)
        }
    }

    pub fn failing(client: Arc<MockClient>, message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(client)
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ClientFactory for MockFactory {
    async fn create(
        &self,
        signer: Arc<dyn ProtocolSigner>,
        options: ClientOptions,
    ) -> Result<Arc<dyn MessagingClient>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.options_seen.lock().push(options);
        tokio::task::yield_now().await;
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let signature = signer.sign("XMTP : Create Identity").await?;
        self.signatures.lock().push(signature);
        if let Some(message) = &self.failure {
            return Err(anyhow!(message.clone()));
        }
        Ok(self.client.clone())
    }
}

// ── Runtime asset ────────────────────────────────────────────────────────────

pub struct MockProbe {
    pub present: bool,
}

#[async_trait::async_trait]
impl AssetProbe for MockProbe {
    async fn exists(&self, _location: &str) -> Result<bool> {
        Ok(self.present)
    }
}

// ── Social graph ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockGraph {
    pub friends: Mutex<Vec<FriendSummary>>,
    pub upserts: Mutex<Vec<UnreadCounterUpdate>>,
    pub failing_message_ids: Mutex<Vec<String>>,
    pub attempts: AtomicUsize,
    /// Holds the next friend-list load until notified; consumed by that load.
    pub friends_gate: Mutex<Option<Arc<Notify>>>,
    pub friend_loads: AtomicUsize,
}

impl MockGraph {
    pub fn with_friends(addresses: &[&str]) -> Self {
        let graph = Self::default();
        *graph.friends.lock() = addresses
            .iter()
            .map(|a| FriendSummary {
                user_address: a.to_string(),
            })
            .collect();
        graph
    }

    pub fn upserts(&self) -> Vec<UnreadCounterUpdate> {
        self.upserts.lock().clone()
    }

    /// Wait until `n` friend-list loads have started.
    pub async fn wait_for_friend_loads(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.friend_loads.load(Ordering::SeqCst) < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for friend list load");
    }

    /// Wait until `n` upserts have been attempted (successful or not).
    pub async fn wait_for_attempts(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.attempts.load(Ordering::SeqCst) < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for counter upserts");
    }
}

#[async_trait::async_trait]
impl SocialGraph for MockGraph {
    async fn list_accepted_friends(&self, _user: &str) -> Result<Vec<FriendSummary>> {
        self.friend_loads.fetch_add(1, Ordering::SeqCst);
        let gate = self.friends_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self.friends.lock().clone())
    }

    async fn upsert_unread_counter(&self, update: UnreadCounterUpdate) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing_message_ids.lock().contains(&update.message_id) {
            return Err(anyhow!("counter mutation rejected"));
        }
        self.upserts.lock().push(update);
        Ok(())
    }
}

// ── Events ───────────────────────────────────────────────────────────────────

pub fn text_event(id: &str, sender: &str, body: &str) -> InboundMessageEvent {
    InboundMessageEvent {
        id: id.to_string(),
        sender_inbox_id: sender.to_string(),
        content: MessageContent::Text(body.to_string()),
        content_type: ContentTypeId::text(),
        sent_at: None,
        sent_at_ns: Some(7_200_000_000_000),
    }
}

pub fn reaction_event(id: &str, sender: &str) -> InboundMessageEvent {
    InboundMessageEvent {
        content_type: ContentTypeId::reaction(),
        content: MessageContent::Structured(serde_json::json!({"emoji": "👍"})),
        ..text_event(id, sender, "")
    }
}
