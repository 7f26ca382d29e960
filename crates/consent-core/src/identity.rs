//! Identity canonicalisation.
//!
//! The same account can reach us as `0xAbC…`, `abc…`, or a compound
//! `"<address-or-other>:<inbox-id>"` string depending on which side
//! (wallet, messaging protocol, social graph) produced it. Every equality
//! check in the bridge goes through [`canonicalize`] first.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of hex digits in an account address (20 bytes).
pub const ADDRESS_HEX_LEN: usize = 40;

/// Lowercase, unprefixed, compound-suffix-stripped identifier.
///
/// An empty value means the input could not be resolved to anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when this id has the shape of a 20-byte hex account address.
    pub fn is_address(&self) -> bool {
        self.0.len() == ADDRESS_HEX_LEN && self.0.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// True when every character could appear in an address or inbox id.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }

    /// Address form expected by the messaging protocol (`0x`-prefixed).
    pub fn to_prefixed(&self) -> String {
        format!("0x{}", self.0)
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalise an identifier. Never fails; unusable input yields an empty id.
pub fn canonicalize(id: &str) -> CanonicalId {
    let lowered = id.to_ascii_lowercase();
    let head = lowered.split(':').next().unwrap_or_default();

    let mut rest = head;
    let stripped = loop {
        let trimmed = rest.trim();
        match trimmed.strip_prefix("0x") {
            Some(tail) => rest = tail,
            None => break trimmed,
        }
    };
    CanonicalId(stripped.to_string())
}

/// Same as [`canonicalize`] but accepts a missing value.
pub fn canonicalize_opt(id: Option<&str>) -> CanonicalId {
    id.map(canonicalize).unwrap_or_default()
}

/// True iff `id` is a 40-hex-digit account address once a leading `0x` is
/// removed. Compound ids are not addresses.
pub fn is_address(id: &str) -> bool {
    let trimmed = id.trim();
    let bare = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    bare.len() == ADDRESS_HEX_LEN && bare.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Canonical equality.
pub fn equal(a: &str, b: &str) -> bool {
    canonicalize(a) == canonicalize(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01";

    #[test]
    fn strips_prefix_and_lowercases() {
        assert_eq!(
            canonicalize(ADDR).as_str(),
            "abcdef0123456789abcdef0123456789abcdef01"
        );
    }

    #[test]
    fn compound_ids_reduce_to_their_head() {
        let compound = format!("{ADDR}:inbox123");
        assert_eq!(canonicalize(&compound), canonicalize(&ADDR[2..]));
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let samples = [
            "",
            "   ",
            ":",
            "0x",
            "0x0xAB",
            " 0X 0xab ",
            ADDR,
            "0xAB:cd:ef",
            "Inbox-ID-With-Caps",
            "not-an-id!!",
            "f0e1d2c3b4a5968778695a4b3c2d1e0ff0e1d2c3b4a5968778695a4b3c2d1e0f",
        ];
        for s in samples {
            let once = canonicalize(s);
            let twice = canonicalize(once.as_str());
            assert_eq!(once, twice, "input {s:?}");
        }
    }

    #[test]
    fn empty_and_missing_input_are_tolerated() {
        assert!(canonicalize("").is_empty());
        assert!(canonicalize_opt(None).is_empty());
        assert!(canonicalize("0x").is_empty());
    }

    #[test]
    fn address_pattern() {
        assert!(is_address(ADDR));
        assert!(is_address(&ADDR[2..]));
        assert!(!is_address("0x1234"));
        assert!(!is_address(
            "f0e1d2c3b4a5968778695a4b3c2d1e0ff0e1d2c3b4a5968778695a4b3c2d1e0f"
        ));
        assert!(!is_address("zzcdef0123456789abcdef0123456789abcdef01"));
    }

    #[test]
    fn compound_id_is_not_an_address() {
        assert!(!is_address(&format!("{ADDR}:inbox123")));
        assert!(!is_address("0x0xAbCdEf0123456789aBcDeF0123456789AbCdEf01"));
        // the canonical head of a compound id still is one
        assert!(canonicalize(&format!("{ADDR}:inbox123")).is_address());
    }

    #[test]
    fn well_formed_rejects_punctuation() {
        assert!(canonicalize("inbox-1_a").is_well_formed());
        assert!(!canonicalize("not-an-id!!").is_well_formed());
        assert!(!canonicalize("").is_well_formed());
    }

    #[test]
    fn equality_ignores_encoding() {
        assert!(equal(ADDR, &ADDR.to_lowercase()[2..]));
        assert!(equal(&format!("{ADDR}:abc"), ADDR));
        assert!(equal("", "0x"));
        assert!(!equal(ADDR, "0x0000000000000000000000000000000000000000"));
    }
}
