//! Digest engine.
//!
//! SHA-256 over the exact payload bytes, rendered as lowercase hex. Both
//! endpoints compute digests here so the two sides always agree on the
//! encoding.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Hex-encoded content digest.
///
/// Digests reported by a remote endpoint are kept verbatim, so comparison is
/// plain string equality with no case folding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Wrap a digest string received from elsewhere without normalising it.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if this looks like a digest produced by [`digest`]:
    /// 64 lowercase hex characters.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == DIGEST_HEX_LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hash a byte slice, returning its SHA-256 digest.
pub fn digest(data: &[u8]) -> Digest {
    Digest(hex::encode(Sha256::digest(data)))
}

/// Incremental SHA-256 hasher for payloads that arrive in pieces.
///
/// # Example
/// ```
/// use hashdrop_core::crypto::{digest, Hasher};
/// let mut h = Hasher::new();
/// h.update(b"hello ");
/// h.update(b"world");
/// assert_eq!(h.finalize(), digest(b"hello world"));
/// ```
pub struct Hasher(Sha256);

impl Hasher {
    pub fn new() -> Self {
        Self(Sha256::new())
    }

    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    pub fn finalize(self) -> Digest {
        Digest(hex::encode(self.0.finalize()))
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_matches_known_vector() {
        assert_eq!(
            digest(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn abc_matches_known_vector() {
        assert_eq!(
            digest(b"abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_is_deterministic() {
        let data = vec![0x5au8; 1024];
        assert_eq!(digest(&data), digest(&data));
    }

    #[test]
    fn single_byte_difference_changes_digest() {
        let a = vec![b'A'; 1024];
        let mut b = a.clone();
        b[512] = b'B';
        assert_ne!(digest(&a), digest(&b));
    }

    #[test]
    fn incremental_hasher_matches_oneshot() {
        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let mut h = Hasher::new();
        for piece in data.chunks(333) {
            h.update(piece);
        }
        assert_eq!(h.finalize(), digest(&data));
    }

    #[test]
    fn computed_digest_is_well_formed() {
        assert!(digest(b"payload").is_well_formed());
    }

    #[test]
    fn uppercase_digest_is_not_well_formed_and_not_equal() {
        let ours = digest(b"payload");
        let shouted = Digest::from_hex(ours.as_str().to_ascii_uppercase());
        assert!(!shouted.is_well_formed());
        assert_ne!(ours, shouted);
    }

    #[test]
    fn digest_serializes_as_plain_string() {
        let d = digest(b"abc");
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{}\"", d.as_str()));
    }
}
