use twl_store::StoreError;
use twl_twist::TwistError;
use twl_types::Hash;

/// Errors from line indexing and queries.
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    /// Two different twists claim the same predecessor.
    #[error("conflicting successor for {prev}: {existing} is already indexed, rejected {candidate}")]
    ConflictingSuccessor {
        /// The twist both successors continue.
        prev: Hash,
        /// The successor already indexed.
        existing: Hash,
        /// The rejected successor.
        candidate: Hash,
    },

    /// An atom already in the line was submitted again while duplicates are
    /// rejected.
    #[error("duplicate atom: {0}")]
    DuplicateAtom(Hash),

    /// A chain walk from `start` exceeded the configured bound.
    #[error("chain walk from {start} exceeded {limit} twists")]
    ChainTooLong {
        /// Where the walk began.
        start: Hash,
        /// The configured `max_chain_len`.
        limit: usize,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("twist error: {0}")]
    Twist(#[from] TwistError),
}

pub type LineResult<T> = Result<T, LineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_all_three_twists() {
        let (prev, existing, candidate) = (
            Hash::digest(b"prev"),
            Hash::digest(b"existing"),
            Hash::digest(b"candidate"),
        );
        let msg = LineError::ConflictingSuccessor {
            prev,
            existing,
            candidate,
        }
        .to_string();
        for h in [prev, existing, candidate] {
            assert!(msg.contains(&h.to_string()));
        }

        let msg = LineError::ChainTooLong { start: prev, limit: 7 }.to_string();
        assert!(msg.ends_with("exceeded 7 twists"));
    }
}
