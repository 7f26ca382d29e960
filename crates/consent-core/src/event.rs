//! Inbound message events and their projection into unread-counter updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{canonicalize, CanonicalId};

pub const DEFAULT_PREVIEW_CHARS: usize = 50;
pub const DEFAULT_PREVIEW_PLACEHOLDER: &str = "New message";
const NANOS_PER_MILLI: i128 = 1_000_000;
const REACTION_TYPE_ID: &str = "reaction";

/// `authority/type:major.minor` content-type tag carried by every message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeId {
    pub authority_id: String,
    pub type_id: String,
    pub version_major: u32,
    pub version_minor: u32,
}

impl ContentTypeId {
    pub fn new(authority_id: &str, type_id: &str) -> Self {
        Self {
            authority_id: authority_id.to_string(),
            type_id: type_id.to_string(),
            version_major: 1,
            version_minor: 0,
        }
    }

    pub fn text() -> Self {
        Self::new("xmtp.org", "text")
    }

    pub fn reaction() -> Self {
        Self::new("xmtp.org", REACTION_TYPE_ID)
    }

    pub fn is_reaction(&self) -> bool {
        self.type_id.eq_ignore_ascii_case(REACTION_TYPE_ID)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MessageContent {
    Text(String),
    /// Anything the codecs decoded into a non-text shape.
    Structured(serde_json::Value),
    /// Content no registered codec could decode.
    Undecoded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessageEvent {
    pub id: String,
    pub sender_inbox_id: String,
    pub content: MessageContent,
    pub content_type: ContentTypeId,
    /// Structured send time, when the client decoded one.
    pub sent_at: Option<DateTime<Utc>>,
    /// Raw protocol timestamp in nanoseconds.
    pub sent_at_ns: Option<i128>,
}

/// One way of reading a millisecond timestamp off an event.
pub type TimestampStrategy = fn(&InboundMessageEvent) -> Option<i64>;

pub fn timestamp_from_sent_at(event: &InboundMessageEvent) -> Option<i64> {
    event.sent_at.map(|t| t.timestamp_millis())
}

pub fn timestamp_from_nanos(event: &InboundMessageEvent) -> Option<i64> {
    event
        .sent_at_ns
        .and_then(|ns| i64::try_from(ns / NANOS_PER_MILLI).ok())
}

/// Tried in order; the first hit wins.
pub const TIMESTAMP_STRATEGIES: &[TimestampStrategy] =
    &[timestamp_from_sent_at, timestamp_from_nanos];

/// Millisecond timestamp for `event`, falling back to `now_ms`.
pub fn extract_timestamp(event: &InboundMessageEvent, now_ms: i64) -> i64 {
    TIMESTAMP_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(event))
        .unwrap_or(now_ms)
}

/// Short preview text: the first `max_chars` characters of text content,
/// `placeholder` for everything else.
pub fn preview(content: &MessageContent, max_chars: usize, placeholder: &str) -> String {
    match content {
        MessageContent::Text(text) => text.chars().take(max_chars).collect(),
        _ => placeholder.to_string(),
    }
}

/// Arguments for the social graph's unread-counter upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCounterUpdate {
    pub user_address: String,
    pub peer_inbox_id: CanonicalId,
    pub message_preview: String,
    pub message_id: String,
    pub message_timestamp: i64,
}

/// Why an event did not produce a counter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SelfEcho,
    Reaction,
    ActiveConversation,
}

pub struct ProjectionContext<'a> {
    pub local_user: &'a str,
    pub own_inbox_id: &'a str,
    pub active_conversation: Option<&'a str>,
    pub now_ms: i64,
    pub preview_max_chars: usize,
    pub preview_placeholder: &'a str,
}

/// Apply the filter chain to one event. The checks run in a fixed order
/// and stop at the first match.
pub fn project(
    event: &InboundMessageEvent,
    ctx: &ProjectionContext<'_>,
) -> Result<UnreadCounterUpdate, SkipReason> {
    let sender = canonicalize(&event.sender_inbox_id);

    if sender == canonicalize(ctx.own_inbox_id) {
        return Err(SkipReason::SelfEcho);
    }
    if event.content_type.is_reaction() {
        return Err(SkipReason::Reaction);
    }
    if let Some(active) = ctx.active_conversation {
        if canonicalize(active) == sender {
            return Err(SkipReason::ActiveConversation);
        }
    }

    Ok(UnreadCounterUpdate {
        user_address: ctx.local_user.to_string(),
        peer_inbox_id: sender,
        message_preview: preview(&event.content, ctx.preview_max_chars, ctx.preview_placeholder),
        message_id: event.id.clone(),
        message_timestamp: extract_timestamp(event, ctx.now_ms),
    })
}
