//! Wallet signature → recoverable (r, s, v) signature.
//!
//! Wallets hand back 65 bytes of hex whose last byte cannot be trusted as
//! a recovery id. The messaging protocol needs a correct `v`, so both
//! candidates are tried and the one that recovers to the connecting
//! account wins.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};
use thiserror::Error;

use crate::identity::{canonicalize, CanonicalId};

pub const SIGNATURE_LEN: usize = 65;
pub const SIGNATURE_HEX_LEN: usize = SIGNATURE_LEN * 2;
const CANDIDATE_V: [u8; 2] = [27, 28];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("expected {SIGNATURE_HEX_LEN} hex characters, got {0}")]
    Length(usize),

    #[error("signature is not hex: {0}")]
    Hex(String),

    #[error("signature r/s component is malformed")]
    Malformed,

    #[error("neither recovery id recovers {expected}")]
    NoMatchingRecoveryId { expected: String },
}

/// Keccak-256 over the EIP-191 `personal_sign` envelope of `message`.
pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Account address (canonical form) owning `key`.
pub fn address_of(key: &VerifyingKey) -> CanonicalId {
    let point = key.to_encoded_point(false);
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    canonicalize(&hex::encode(&digest[12..]))
}

/// Recover the signing address for one (r, s) pair and candidate `v`.
pub fn recover_address(prehash: &[u8; 32], rs: &Signature, v: u8) -> Option<CanonicalId> {
    let recovery_id = RecoveryId::from_byte(v.checked_sub(27)?)?;
    VerifyingKey::recover_from_prehash(prehash, rs, recovery_id)
        .ok()
        .map(|key| address_of(&key))
}

/// Rebuild a 65-byte signature whose `v` recovers to `expected_address`.
pub fn bridge_signature(
    message: &[u8],
    wallet_signature_hex: &str,
    expected_address: &str,
) -> Result<[u8; SIGNATURE_LEN], SignatureError> {
    let raw = wallet_signature_hex.trim();
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    if raw.len() != SIGNATURE_HEX_LEN {
        return Err(SignatureError::Length(raw.len()));
    }
    let bytes = hex::decode(raw).map_err(|e| SignatureError::Hex(e.to_string()))?;
    let rs = Signature::from_slice(&bytes[..64]).map_err(|_| SignatureError::Malformed)?;

    let expected = canonicalize(expected_address);
    let prehash = personal_message_hash(message);

    for v in CANDIDATE_V {
        if recover_address(&prehash, &rs, v).as_ref() == Some(&expected) {
            let mut out = [0u8; SIGNATURE_LEN];
            out[..64].copy_from_slice(&bytes[..64]);
            out[64] = v;
            return Ok(out);
        }
    }

    Err(SignatureError::NoMatchingRecoveryId {
        expected: expected.to_prefixed(),
    })
}
