use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures the bridge surfaces to its host.
///
/// Session errors are stored on the session as its last error. The
/// sync and dispatch variants are logged and absorbed by their callers.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineError {
    #[error("wallet not connected")]
    WalletNotConnected,

    #[error("messaging runtime asset missing at {0}")]
    RuntimeAssetMissing(String),

    #[error("wallet signer not supported: {0}")]
    UnsupportedSigner(String),

    #[error("messaging storage locked by another process")]
    StorageLocked,

    #[error("message stream failed to open: {0}")]
    StreamOpenFailed(String),

    #[error("consent update failed: {0}")]
    ConsentUpdateFailed(String),

    #[error("unread counter update failed: {0}")]
    CounterUpdateFailed(String),

    #[error("{0}")]
    Unknown(String),
}

/// Lowercased fragments the messaging client emits when its local
/// encrypted store is held elsewhere.
const STORAGE_LOCKED_MARKERS: &[&str] = &[
    "database is locked",
    "access handle",
    "createsyncaccesshandle",
    "nomodificationallowederror",
    "storage is locked",
];

/// Lowercased fragments the messaging client emits when it rejects the
/// signature it was handed.
const UNSUPPORTED_SIGNER_MARKERS: &[&str] = &[
    "unknown signer",
    "signature validation failed",
    "invalid signature",
    "signature error",
    "unsupported signer",
    "smart contract wallet",
];

impl EngineError {
    /// Map an opaque client-construction failure onto the taxonomy.
    pub fn classify(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        let lowered = message.to_ascii_lowercase();
        if STORAGE_LOCKED_MARKERS.iter().any(|m| lowered.contains(m)) {
            return EngineError::StorageLocked;
        }
        if UNSUPPORTED_SIGNER_MARKERS.iter().any(|m| lowered.contains(m)) {
            return EngineError::UnsupportedSigner(message);
        }
        EngineError::Unknown(message)
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            EngineError::WalletNotConnected => "Connect your wallet to start messaging.",
            EngineError::RuntimeAssetMissing(_) => {
                "Messaging could not load its runtime files. Please reload and try again."
            }
            EngineError::UnsupportedSigner(_) => {
                "This wallet's signatures are not supported for messaging. Try a different wallet."
            }
            EngineError::StorageLocked => {
                "Messaging is already open in another tab or window. Close it and retry."
            }
            EngineError::StreamOpenFailed(_) => {
                "Live message updates are unavailable right now."
            }
            EngineError::ConsentUpdateFailed(_) => {
                "Could not update who can message you. Changes will be retried on next sync."
            }
            EngineError::CounterUpdateFailed(_) => "Unread counts may be out of date.",
            EngineError::Unknown(_) => "Messaging is temporarily unavailable. Please try again.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn classifies_storage_lock() {
        let err = anyhow!("NoModificationAllowedError: Access Handles cannot be created");
        assert_eq!(EngineError::classify(&err), EngineError::StorageLocked);
    }

    #[test]
    fn classifies_signer_rejection_through_context() {
        let err = anyhow!("Signature validation failed").context("create client");
        assert!(matches!(
            EngineError::classify(&err),
            EngineError::UnsupportedSigner(_)
        ));
    }

    #[test]
    fn unknown_keeps_message() {
        let err = anyhow!("network unreachable");
        assert_eq!(
            EngineError::classify(&err),
            EngineError::Unknown("network unreachable".into())
        );
    }

    #[test]
    fn user_messages_are_distinct() {
        let all = [
            EngineError::WalletNotConnected,
            EngineError::RuntimeAssetMissing(String::new()),
            EngineError::UnsupportedSigner(String::new()),
            EngineError::StorageLocked,
            EngineError::StreamOpenFailed(String::new()),
            EngineError::ConsentUpdateFailed(String::new()),
            EngineError::CounterUpdateFailed(String::new()),
            EngineError::Unknown(String::new()),
        ];
        let mut seen = std::collections::HashSet::new();
        for e in &all {
            assert!(seen.insert(e.user_message()), "{e:?}");
        }
    }
}
