use anyhow::{anyhow, Result};
use consent_core::signature::bridge_signature;
use std::sync::Arc;

use crate::capabilities::{ProtocolSigner, WalletSigner};

/// Adapts a wallet's `sign_message` to the recoverable signature the
/// messaging client verifies.
pub struct RecoverableSigner {
    wallet: Arc<dyn WalletSigner>,
    identity: String,
}

impl RecoverableSigner {
    pub fn new(wallet: Arc<dyn WalletSigner>, identity: impl Into<String>) -> Self {
        Self {
            wallet,
            identity: identity.into(),
        }
    }
}

#[async_trait::async_trait]
impl ProtocolSigner for RecoverableSigner {
    fn identity(&self) -> String {
        self.identity.clone()
    }

    async fn sign(&self, text: &str) -> Result<Vec<u8>> {
        let raw = self.wallet.sign_message(text).await?;
        // "unsupported signer" is matched by EngineError::classify
        let signature = bridge_signature(text.as_bytes(), &raw, &self.identity)
            .map_err(|e| anyhow!("unsupported signer: {e}"))?;
        Ok(signature.to_vec())
    }
}
