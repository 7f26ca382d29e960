//! consent-service: keeps a decentralised messaging client's consent and
//! unread state in step with a centralised social graph.
//!
//! # Module layout
//! - `capabilities`: traits for the wallet, messaging client, social graph, asset host
//! - `session`: per-identity client lifecycle with single-flight initialisation
//! - `consent_sync`: friend list → protocol consent
//! - `dispatcher`: live inbound stream → unread counters
//! - `cooldown_watch`: 1 s re-evaluation of a decline cooldown
//! - `preflight`: runtime-asset existence probe
//! - `bridge`: coordinator tying the above to connect/disconnect
//! - `telemetry`: tracing subscriber setup

pub mod bridge;
pub mod capabilities;
pub mod consent_sync;
pub mod cooldown_watch;
pub mod dispatcher;
pub mod preflight;
pub mod session;
pub mod telemetry;

pub use bridge::{FriendshipOutcome, MessagingBridge};
pub use consent_sync::ConsentSynchronizer;
pub use dispatcher::{DispatcherHandle, DispatcherState, InboundDispatcher};
pub use session::{Session, SessionManager, SessionState};
