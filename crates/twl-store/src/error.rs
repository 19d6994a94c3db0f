use twl_types::Hash;

/// Errors from packet and atom-set operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// A hash does not verify its packet. Always fatal.
    #[error("integrity failure: expected {expected}, computed {computed}")]
    Integrity { expected: Hash, computed: Hash },

    /// Two different packets were offered under the same hash.
    #[error("inconsistent atoms: hash {0} maps to two different packets")]
    Inconsistent(Hash),

    /// The bytes do not form a canonical packet.
    #[error("malformed packet at offset {offset}: {reason}")]
    Malformed { offset: u64, reason: String },

    /// Unknown packet kind byte.
    #[error("unknown packet kind {byte} at offset {offset}")]
    UnknownKind { offset: u64, byte: u8 },

    /// The stream ended in the middle of an atom.
    #[error("truncated atom stream at offset {offset}")]
    Truncated { offset: u64 },

    /// The requested hash is not in the atom set.
    #[error("atom not found: {0}")]
    NotFound(Hash),

    /// The operation needs a non-empty atom set.
    #[error("atom set is empty")]
    Empty,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
