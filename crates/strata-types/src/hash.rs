use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content-addressed identifier for any stored value.
///
/// A `Hash` is the BLAKE3 digest of a value's bytes. Identical content
/// always produces the same `Hash`, making stored chunks deduplicatable and
/// verifiable. The all-zero hash is reserved as a sentinel meaning
/// "no object" (an unset root pointer, the empty chunk).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Number of bytes in a hash digest.
    pub const LEN: usize = 32;

    /// Compute the hash of raw bytes.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create a `Hash` from a pre-computed digest.
    pub fn from_raw(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    /// The zero hash (all zeros). Represents "no object" / "no root yet".
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Returns `true` if this is the zero sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != Self::LEN {
            return Err(TypeError::InvalidLength {
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.short_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for Hash {
    fn from(digest: [u8; 32]) -> Self {
        Self(digest)
    }
}

impl From<Hash> for [u8; 32] {
    fn from(h: Hash) -> Self {
        h.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn of_is_deterministic() {
        let data = b"hello world";
        let h1 = Hash::of(data);
        let h2 = Hash::of(data);
        assert_eq!(h1, h2);
    }

    #[test]
    fn different_data_produces_different_hashes() {
        let h1 = Hash::of(b"hello");
        let h2 = Hash::of(b"world");
        assert_ne!(h1, h2);
    }

    #[test]
    fn zero_is_all_zeros() {
        let zero = Hash::zero();
        assert!(zero.is_zero());
        assert_eq!(zero.as_bytes(), &[0u8; 32]);
        assert_eq!(zero, Hash::default());
    }

    #[test]
    fn nonzero_hash_is_not_zero() {
        assert!(!Hash::of(b"x").is_zero());
    }

    #[test]
    fn hex_roundtrip() {
        let h = Hash::of(b"test");
        let hex = h.to_hex();
        let parsed = Hash::from_hex(&hex).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        let err = Hash::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        let err = Hash::from_hex("zz").unwrap_err();
        assert!(matches!(err, TypeError::InvalidHex(_)));
    }

    #[test]
    fn short_hex_is_8_chars() {
        let h = Hash::of(b"test");
        assert_eq!(h.short_hex().len(), 8);
    }

    #[test]
    fn display_is_full_hex() {
        let h = Hash::of(b"test");
        let display = format!("{h}");
        assert_eq!(display.len(), 64);
        assert_eq!(display, h.to_hex());
    }

    #[test]
    fn serde_roundtrip() {
        let h = Hash::of(b"serde test");
        let bytes = bincode::serialize(&h).unwrap();
        let parsed: Hash = bincode::deserialize(&bytes).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn ordering_is_consistent() {
        let h1 = Hash::from_raw([0; 32]);
        let h2 = Hash::from_raw([1; 32]);
        assert!(h1 < h2);
    }
}
