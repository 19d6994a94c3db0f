//! Tether authority for Twist Line.
//!
//! A chain tethered to an authority delegates the choice of its canonical
//! successor. The chain owner sends the authority a hoist trie built with
//! [`rig_for_hoist`]; the authority folds it into the rigging of a new twist
//! on its own chain and publishes the result. It accepts at most one
//! attestation per shielded lead.
//!
//! [`rig_for_hoist`]: twl_twist::shield::rig_for_hoist

pub mod authority;
pub mod error;

pub use authority::{AuthorityConfig, TetherAuthority};
pub use error::{TetherError, TetherResult};
