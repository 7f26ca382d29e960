//! Friend-request cooldown after a decline.
//!
//! Times are absolute epoch milliseconds as handed over by the social-graph
//! backend, so nothing here depends on a timezone.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_SECOND: i64 = 1_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CooldownError {
    #[error("cooldown expiry {expires_at} is not after decline time {declined_at}")]
    InvertedWindow { declined_at: i64, expires_at: i64 },
}

/// A decline and the instant a new request becomes possible again.
/// Always `cooldown_expires_at > declined_at`, including when deserialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawCooldownWindow")]
pub struct CooldownWindow {
    declined_at: i64,
    cooldown_expires_at: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCooldownWindow {
    declined_at: i64,
    cooldown_expires_at: i64,
}

impl TryFrom<RawCooldownWindow> for CooldownWindow {
    type Error = CooldownError;

    fn try_from(raw: RawCooldownWindow) -> Result<Self, Self::Error> {
        Self::new(raw.declined_at, raw.cooldown_expires_at)
    }
}

impl CooldownWindow {
    pub fn new(declined_at: i64, cooldown_expires_at: i64) -> Result<Self, CooldownError> {
        if cooldown_expires_at <= declined_at {
            return Err(CooldownError::InvertedWindow {
                declined_at,
                expires_at: cooldown_expires_at,
            });
        }
        Ok(Self {
            declined_at,
            cooldown_expires_at,
        })
    }

    pub fn declined_at(&self) -> i64 {
        self.declined_at
    }

    pub fn cooldown_expires_at(&self) -> i64 {
        self.cooldown_expires_at
    }

    pub fn evaluate(&self, now_ms: i64) -> CooldownStatus {
        CooldownStatus::from_remaining(self.cooldown_expires_at - now_ms)
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.evaluate(now_ms).expired
    }
}

/// One evaluation of a [`CooldownWindow`] against a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownStatus {
    /// Signed; negative once the window has passed.
    pub remaining_ms: i64,
    pub expired: bool,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl CooldownStatus {
    pub fn from_remaining(remaining_ms: i64) -> Self {
        let expired = remaining_ms <= 0;
        // display fields stay at zero once expired
        let shown = remaining_ms.max(0);
        Self {
            remaining_ms,
            expired,
            hours: shown / MS_PER_HOUR,
            minutes: (shown % MS_PER_HOUR) / MS_PER_MINUTE,
            seconds: (shown % MS_PER_MINUTE) / MS_PER_SECOND,
        }
    }

    /// `22h 58m 59s` style label, or `None` when expired.
    pub fn label(&self) -> Option<String> {
        if self.expired {
            return None;
        }
        Some(format!("{}h {}m {}s", self.hours, self.minutes, self.seconds))
    }
}
