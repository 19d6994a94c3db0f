use twl_store::{PacketKind, StoreError};
use twl_types::Hash;

/// Errors from twist construction and traversal.
#[derive(Debug, thiserror::Error)]
pub enum TwistError {
    /// A referenced hash is absent from the available atoms. Recoverable by
    /// fetching more atoms and retrying.
    #[error("missing data: {0} is not in the atom set")]
    MissingData(Hash),

    /// A packet is the wrong kind for the field it occupies.
    #[error("shape error: {hash} should be a {expected}, found a {found}")]
    Shape {
        /// The offending packet.
        hash: Hash,
        /// The kind the field requires.
        expected: PacketKind,
        /// The kind actually stored.
        found: PacketKind,
    },

    /// A chain walk revisited a twist.
    #[error("cycle detected at twist {0}")]
    Cycle(Hash),

    /// A satisfaction was made over a body that has since changed.
    #[error("satisfaction for requirement {requirement} was made over a stale body")]
    StaleSatisfaction {
        /// Key of the requirement whose satisfaction is stale.
        requirement: Hash,
    },

    /// A requirement has no matching satisfaction.
    #[error("requirement {0} is not satisfied")]
    MissingSatisfaction(Hash),

    /// A satisfaction failed verification.
    #[error("requirement {requirement} rejected its satisfaction: {reason}")]
    Unsatisfied {
        /// Key of the rejected requirement.
        requirement: Hash,
        /// Why the verifier rejected it.
        reason: String,
    },

    /// The external satisfier failed.
    #[error("satisfier error: {0}")]
    Satisfier(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TwistError {
    pub(crate) fn shape(hash: Hash, expected: PacketKind, found: PacketKind) -> Self {
        Self::Shape {
            hash,
            expected,
            found,
        }
    }
}

/// Result alias for twist operations.
pub type TwistResult<T> = Result<T, TwistError>;
