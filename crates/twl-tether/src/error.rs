use twl_line::LineError;
use twl_twist::TwistError;
use twl_types::Hash;

/// Errors from the tether authority.
#[derive(Debug, thiserror::Error)]
pub enum TetherError {
    /// A different attestation was already published under this key.
    #[error("lead {key} already hoisted to {existing}, rejected {candidate}")]
    AlreadyHoisted {
        /// The rigging key both hoists claim.
        key: Hash,
        /// The value already published under `key`.
        existing: Hash,
        /// The rejected value.
        candidate: Hash,
    },

    /// The submitted rigging is not a hoist trie.
    #[error("malformed rigging: {0}")]
    MalformedRigging(String),

    #[error("lock poisoned: {0}")]
    Poisoned(String),

    #[error("twist error: {0}")]
    Twist(#[from] TwistError),

    #[error("line error: {0}")]
    Line(#[from] LineError),
}

pub type TetherResult<T> = Result<T, TetherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_hoisted_message() {
        let (key, existing, candidate) = (
            Hash::digest(b"key"),
            Hash::digest(b"existing"),
            Hash::digest(b"candidate"),
        );
        let msg = TetherError::AlreadyHoisted {
            key,
            existing,
            candidate,
        }
        .to_string();
        assert_eq!(
            msg,
            format!("lead {key} already hoisted to {existing}, rejected {candidate}")
        );
    }
}
