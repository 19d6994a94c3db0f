//! Chain topology for Twist Line.
//!
//! A [`Line`] is a derived index over an atom set. Atoms may arrive in any
//! order; each link `prev(twist) → twist` is registered as soon as both the
//! twist packet and its body are present. The index enforces the one rule
//! the whole model rests on: a twist has at most one successor. A second,
//! different successor is reported as
//! [`LineError::ConflictingSuccessor`] and never resolved automatically.

pub mod config;
pub mod error;
pub mod line;

pub use config::LineConfig;
pub use error::{LineError, LineResult};
pub use line::Line;
