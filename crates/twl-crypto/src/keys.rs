//! Ed25519 keys that sign domain-separated hashes.
//!
//! Nothing here signs raw bytes. A message is always a [`Hash`] that is
//! first re-hashed under a [`ContentHasher`] domain, so a signature made for
//! one purpose cannot be replayed as another.

use ed25519_dalek::{Signer, Verifier};
use twl_types::Hash;

use crate::error::SignatureError;
use crate::hasher::ContentHasher;

pub struct SigningKey {
    inner: ed25519_dalek::SigningKey,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct VerifyingKey {
    inner: ed25519_dalek::VerifyingKey,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    inner: ed25519_dalek::Signature,
}

impl SigningKey {
    /// A fresh key from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let inner = ed25519_dalek::SigningKey::generate(&mut rand::thread_rng());
        Self { inner }
    }

    pub fn from_secret(secret: [u8; 32]) -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::from_bytes(&secret),
        }
    }

    pub fn secret(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey {
            inner: self.inner.verifying_key(),
        }
    }

    /// Sign `message` as re-hashed under `domain`.
    pub fn sign_hash(&self, domain: &ContentHasher, message: &Hash) -> Signature {
        let digest = domain.hash(message.as_bytes());
        Signature {
            inner: self.inner.sign(digest.as_bytes()),
        }
    }
}

impl VerifyingKey {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    /// Check a signature produced by [`SigningKey::sign_hash`].
    pub fn verify_hash(
        &self,
        domain: &ContentHasher,
        message: &Hash,
        signature: &Signature,
    ) -> Result<(), SignatureError> {
        let digest = domain.hash(message.as_bytes());
        self.inner
            .verify(digest.as_bytes(), &signature.inner)
            .map_err(|_| SignatureError::Rejected)
    }
}

impl TryFrom<&[u8]> for VerifyingKey {
    type Error = SignatureError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SignatureError::KeyLength(bytes.len()))?;
        let inner =
            ed25519_dalek::VerifyingKey::from_bytes(&bytes).map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self { inner })
    }
}

impl Signature {
    pub fn to_bytes(&self) -> [u8; 64] {
        self.inner.to_bytes()
    }
}

impl TryFrom<&[u8]> for Signature {
    type Error = SignatureError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let inner = ed25519_dalek::Signature::from_slice(bytes)
            .map_err(|_| SignatureError::SignatureLength(bytes.len()))?;
        Ok(Self { inner })
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Identify by public half only.
        write!(f, "SigningKey(public {:?})", self.verifying_key())
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifyingKey({})", hex::encode(&self.to_bytes()[..4]))
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}..)", hex::encode(&self.to_bytes()[..4]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> Hash {
        Hash::digest(b"some body")
    }

    #[test]
    fn signed_hash_verifies() {
        let key = SigningKey::generate();
        let sig = key.sign_hash(&ContentHasher::SATISFY, &body());
        key.verifying_key()
            .verify_hash(&ContentHasher::SATISFY, &body(), &sig)
            .unwrap();
    }

    #[test]
    fn other_message_domain_or_key_is_rejected() {
        let key = SigningKey::generate();
        let public = key.verifying_key();
        let sig = key.sign_hash(&ContentHasher::SATISFY, &body());

        let other = Hash::digest(b"other body");
        assert_eq!(
            public.verify_hash(&ContentHasher::SATISFY, &other, &sig),
            Err(SignatureError::Rejected)
        );
        assert_eq!(
            public.verify_hash(&ContentHasher::PACKET, &body(), &sig),
            Err(SignatureError::Rejected)
        );
        let stranger = SigningKey::generate().verifying_key();
        assert!(stranger
            .verify_hash(&ContentHasher::SATISFY, &body(), &sig)
            .is_err());
    }

    #[test]
    fn secret_restores_the_same_key() {
        let key = SigningKey::generate();
        let restored = SigningKey::from_secret(key.secret());
        assert_eq!(restored.verifying_key(), key.verifying_key());
    }

    #[test]
    fn wire_bytes_parse_back() {
        let key = SigningKey::from_secret([7u8; 32]);
        let public = key.verifying_key();
        let sig = key.sign_hash(&ContentHasher::SATISFY, &body());

        assert_eq!(VerifyingKey::try_from(&public.to_bytes()[..]), Ok(public));
        assert_eq!(Signature::try_from(&sig.to_bytes()[..]), Ok(sig));
    }

    #[test]
    fn wrong_lengths_are_reported() {
        assert_eq!(
            VerifyingKey::try_from(&[1u8, 2, 3][..]),
            Err(SignatureError::KeyLength(3))
        );
        assert_eq!(
            Signature::try_from(&[0u8; 10][..]),
            Err(SignatureError::SignatureLength(10))
        );
    }

    #[test]
    fn debug_never_shows_secret() {
        let key = SigningKey::from_secret([9u8; 32]);
        let debug = format!("{key:?}");
        assert!(debug.starts_with("SigningKey(public"));
        assert!(!debug.contains(&hex::encode([9u8; 4])));
    }
}
