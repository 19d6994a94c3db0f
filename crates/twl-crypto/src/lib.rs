//! Cryptographic primitives for Twist Line.
//!
//! [`ContentHasher`] gives every packet its content address. The Ed25519
//! keys in [`keys`] back the reference satisfy/verify capability; they only
//! ever sign domain-separated hashes.

pub mod error;
pub mod hasher;
pub mod keys;

pub use error::SignatureError;
pub use hasher::ContentHasher;
pub use keys::{Signature, SigningKey, VerifyingKey};
