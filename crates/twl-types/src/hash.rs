use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content-addressed identifier for a packet.
///
/// A `Hash` is a 32-byte BLAKE3 digest. Identical content always produces
/// the same `Hash`. The all-zero value is reserved as the wire encoding of
/// "no reference" and never names a real packet.
#[derive(Clone, Copy, PartialEq, Eq, std::hash::Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Byte width of every hash.
    pub const LEN: usize = 32;

    /// The null hash (all zeros). Represents "no reference" on the wire.
    pub const NULL: Self = Self([0u8; 32]);

    /// Plain BLAKE3 digest of raw bytes, without domain separation.
    pub fn digest(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create a `Hash` from a pre-computed digest.
    pub const fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// Read a hash from the first 32 bytes of `data`.
    pub fn from_slice(data: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; 32] = data.try_into().map_err(|_| TypeError::InvalidLength {
            expected: Self::LEN,
            actual: data.len(),
        })?;
        Ok(Self(arr))
    }

    /// Returns `true` if this is the null hash.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Wire form of an optional reference: `None` becomes the null hash.
    pub fn from_option(hash: Option<Hash>) -> Self {
        hash.unwrap_or(Self::NULL)
    }

    /// API form of a wire reference: the null hash becomes `None`.
    pub fn into_option(self) -> Option<Hash> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
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
        Self::from_slice(&bytes)
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
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<Hash> for [u8; 32] {
    fn from(hash: Hash) -> Self {
        hash.0
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(Hash::digest(b"hello world"), Hash::digest(b"hello world"));
        assert_ne!(Hash::digest(b"hello"), Hash::digest(b"world"));
    }

    #[test]
    fn null_is_all_zeros() {
        assert!(Hash::NULL.is_null());
        assert_eq!(Hash::NULL.as_bytes(), &[0u8; 32]);
        assert!(!Hash::digest(b"x").is_null());
    }

    #[test]
    fn option_conversion() {
        let h = Hash::digest(b"present");
        assert_eq!(Hash::from_option(Some(h)), h);
        assert_eq!(Hash::from_option(None), Hash::NULL);
        assert_eq!(h.into_option(), Some(h));
        assert_eq!(Hash::NULL.into_option(), None);
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        let err = Hash::from_slice(&[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 3
            }
        );
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(matches!(
            Hash::from_hex("not hex"),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn display_is_full_hex() {
        let h = Hash::digest(b"test");
        let shown = format!("{h}");
        assert_eq!(shown.len(), 64);
        assert_eq!(shown, h.to_hex());
        assert_eq!(h.short_hex().len(), 8);
    }

    #[test]
    fn serde_roundtrip() {
        let h = Hash::digest(b"serde test");
        let json = serde_json::to_string(&h).unwrap();
        let parsed: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, parsed);
    }

    proptest! {
        #[test]
        fn hex_roundtrip(bytes in any::<[u8; 32]>()) {
            let h = Hash::from_hash(bytes);
            prop_assert_eq!(Hash::from_hex(&h.to_hex()).unwrap(), h);
        }
    }
}
