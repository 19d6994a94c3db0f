//! Twists: the nodes of a Twist Line chain.
//!
//! A [`Twist`] is a read-only view of one node over an [`Atoms`] set. It is
//! named by the hash of its twist packet, which binds a body (prev, tether,
//! requirements, cargo, rigging, shield) to the satisfactions made over that
//! body. New nodes are assembled with a [`TwistBuilder`], whose
//! [`serialize`](TwistBuilder::serialize) is a pure transform producing the
//! atom set of the completed chain.
//!
//! The [`shield`] module holds the commitment scheme used to hide a chosen
//! successor until it is safe to reveal, and to build the rigging a tether
//! authority publishes when it hoists one.
//!
//! [`Atoms`]: twl_store::Atoms

pub mod builder;
pub mod error;
pub mod satisfy;
pub mod shield;
pub mod twist;

pub use builder::TwistBuilder;
pub use error::{TwistError, TwistResult};
pub use satisfy::{requirements_for, Ed25519Satisfier, Ed25519Verifier, Satisfier, Verifier};
pub use twist::Twist;
