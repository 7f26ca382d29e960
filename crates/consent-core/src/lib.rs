//! consent-core: pure building blocks of the messaging consent bridge
//!
//! Nothing in this crate awaits; the async orchestration
//! lives in `consent-service`.
//!
//! # Module layout
//! - `identity`: canonical form of addresses and inbox ids
//! - `signature`: wallet signature → recoverable (r, s, v) bridging
//! - `consent`: consent states, entity resolution, batch records
//! - `event`: inbound message events, filter chain, counter updates
//! - `friendship`: friend edges, transitions, request gate
//! - `cooldown`: decline cooldown window arithmetic
//! - `settings`: bridge configuration
//! - `error`: user-facing error taxonomy

pub mod consent;
pub mod cooldown;
pub mod error;
pub mod event;
pub mod friendship;
pub mod identity;
pub mod settings;
pub mod signature;

pub use consent::{ConsentEntity, ConsentRecord, ConsentState};
pub use cooldown::{CooldownStatus, CooldownWindow};
pub use error::EngineError;
pub use event::{InboundMessageEvent, UnreadCounterUpdate};
pub use identity::{canonicalize, CanonicalId};
pub use settings::BridgeSettings;

/// Wall-clock milliseconds since the epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
