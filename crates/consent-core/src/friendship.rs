//! Friendship edges as the social graph reports them, and the consent each
//! transition implies.

use serde::{Deserialize, Serialize};

use crate::consent::ConsentState;
use crate::cooldown::CooldownWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    Pending,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendEdge {
    pub requester: String,
    pub addressee: String,
    pub status: FriendStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<CooldownWindow>,
}

/// Row of the backend's accepted-friends query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendSummary {
    pub user_address: String,
}

/// A single-edge change the host reports after a backend mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FriendshipEvent {
    Accepted { peer: String },
    Declined { peer: String, cooldown: CooldownWindow },
    Blocked { peer: String },
    Unblocked { peer: String },
}

impl FriendshipEvent {
    pub fn peer(&self) -> &str {
        match self {
            FriendshipEvent::Accepted { peer }
            | FriendshipEvent::Declined { peer, .. }
            | FriendshipEvent::Blocked { peer }
            | FriendshipEvent::Unblocked { peer } => peer,
        }
    }

    pub fn consent(&self) -> ConsentState {
        match self {
            FriendshipEvent::Accepted { .. } => ConsentState::Allowed,
            FriendshipEvent::Declined { .. } | FriendshipEvent::Blocked { .. } => {
                ConsentState::Denied
            }
            FriendshipEvent::Unblocked { .. } => ConsentState::Unknown,
        }
    }

    pub fn cooldown(&self) -> Option<CooldownWindow> {
        match self {
            FriendshipEvent::Declined { cooldown, .. } => Some(*cooldown),
            _ => None,
        }
    }
}

/// Whether a new request along `edge` may be sent at `now_ms`.
pub fn can_send_request(edge: Option<&FriendEdge>, now_ms: i64) -> bool {
    match edge {
        None => true,
        Some(edge) => match edge.status {
            FriendStatus::Pending | FriendStatus::Accepted => false,
            FriendStatus::Declined => edge
                .cooldown
                .map(|window| window.is_expired(now_ms))
                .unwrap_or(true),
        },
    }
}
