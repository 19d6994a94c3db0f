/// Errors from key parsing and signature checks.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature does not match the message and key")]
    Rejected,

    #[error("expected a 32-byte public key, got {0} bytes")]
    KeyLength(usize),

    #[error("expected a 64-byte signature, got {0} bytes")]
    SignatureLength(usize),

    #[error("bytes are not a valid Ed25519 public key")]
    InvalidKey,
}
