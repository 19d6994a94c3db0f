//! The satisfy/verify capability.
//!
//! A twist's requirements trie maps a requirement key to a requirement
//! packet; its satisfactions trie maps the same key to the satisfaction made
//! over the twist's *body* hash. How a satisfaction is produced and checked
//! is left to a [`Satisfier`] and a [`Verifier`]. The Ed25519 pair here is
//! the reference implementation.

use async_trait::async_trait;
use twl_crypto::{ContentHasher, Signature, SigningKey, VerifyingKey};
use twl_store::{Atoms, Packet};
use twl_types::Hash;

use crate::error::{TwistError, TwistResult};

/// Produces a satisfaction for a body hash.
#[async_trait]
pub trait Satisfier: Send + Sync {
    /// Key of the requirement this satisfier answers.
    fn requirement(&self) -> Hash;

    /// Produce the satisfaction packet for `body`.
    async fn satisfy(&self, body: Hash) -> TwistResult<Packet>;
}

/// Checks a satisfaction against its requirement.
pub trait Verifier: Send + Sync {
    fn verify(
        &self,
        body: Hash,
        key: Hash,
        requirement: &Packet,
        satisfaction: &Packet,
    ) -> TwistResult<()>;
}

/// Satisfies a public-key requirement by signing the body hash.
pub struct Ed25519Satisfier {
    key: SigningKey,
}

impl Ed25519Satisfier {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// The requirement packet this satisfier answers: the public key.
    pub fn requirement_packet(&self) -> Packet {
        Packet::Blob(self.key.verifying_key().to_bytes().to_vec())
    }
}

#[async_trait]
impl Satisfier for Ed25519Satisfier {
    fn requirement(&self) -> Hash {
        self.requirement_packet().hash()
    }

    async fn satisfy(&self, body: Hash) -> TwistResult<Packet> {
        let signature = self.key.sign_hash(&ContentHasher::SATISFY, &body);
        Ok(Packet::Blob(signature.to_bytes().to_vec()))
    }
}

/// Verifies satisfactions produced by [`Ed25519Satisfier`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Verifier;

impl Verifier for Ed25519Verifier {
    fn verify(
        &self,
        body: Hash,
        key: Hash,
        requirement: &Packet,
        satisfaction: &Packet,
    ) -> TwistResult<()> {
        let unsatisfied = |reason: &str| TwistError::Unsatisfied {
            requirement: key,
            reason: reason.to_string(),
        };
        let public = requirement
            .as_blob()
            .ok_or_else(|| unsatisfied("requirement is not a public key blob"))?;
        let public = VerifyingKey::try_from(public).map_err(|e| unsatisfied(&e.to_string()))?;
        let signature = satisfaction
            .as_blob()
            .ok_or_else(|| unsatisfied("satisfaction is not a signature blob"))?;
        let signature = Signature::try_from(signature).map_err(|e| unsatisfied(&e.to_string()))?;
        public
            .verify_hash(&ContentHasher::SATISFY, &body, &signature)
            .map_err(|e| unsatisfied(&e.to_string()))
    }
}

/// Build requirement atoms demanding a signature from each key. The focus is
/// the requirements trie.
pub fn requirements_for(keys: &[VerifyingKey]) -> Atoms {
    let mut atoms = Atoms::new();
    let entries: Vec<(Hash, Hash)> = keys
        .iter()
        .map(|key| {
            let hash = atoms.add(Packet::Blob(key.to_bytes().to_vec()));
            (hash, hash)
        })
        .collect();
    atoms.add(Packet::trie(entries));
    atoms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signature_satisfies_matching_requirement() {
        let satisfier = Ed25519Satisfier::new(SigningKey::generate());
        let body = Hash::digest(b"body");
        let sat = satisfier.satisfy(body).await.unwrap();
        Ed25519Verifier
            .verify(body, satisfier.requirement(), &satisfier.requirement_packet(), &sat)
            .unwrap();
    }

    #[tokio::test]
    async fn signature_over_other_body_is_rejected() {
        let satisfier = Ed25519Satisfier::new(SigningKey::generate());
        let sat = satisfier.satisfy(Hash::digest(b"body")).await.unwrap();
        let err = Ed25519Verifier
            .verify(
                Hash::digest(b"other body"),
                satisfier.requirement(),
                &satisfier.requirement_packet(),
                &sat,
            )
            .unwrap_err();
        assert!(matches!(err, TwistError::Unsatisfied { .. }));
    }

    #[test]
    fn wrong_requirement_shape_is_rejected() {
        let err = Ed25519Verifier
            .verify(
                Hash::digest(b"body"),
                Hash::digest(b"key"),
                &Packet::List(vec![]),
                &Packet::Blob(vec![0; 64]),
            )
            .unwrap_err();
        assert!(matches!(err, TwistError::Unsatisfied { .. }));
    }

    #[test]
    fn requirements_trie_is_focus() {
        let a = SigningKey::generate().verifying_key();
        let b = SigningKey::generate().verifying_key();
        let atoms = requirements_for(&[a, b]);
        assert_eq!(atoms.len(), 3);
        let trie = atoms
            .get(&atoms.focus().unwrap())
            .and_then(Packet::as_trie)
            .unwrap();
        let key_a = Packet::Blob(a.to_bytes().to_vec()).hash();
        assert_eq!(trie.get(&key_a), Some(&key_a));
    }
}
