//! Foundation types for Twist Line (TWL).
//!
//! Every other TWL crate depends on `twl-types`. The central type is
//! [`Hash`], the 32-byte BLAKE3 digest that names every packet, twist and
//! body in an atom set.
//!
//! # Null hash
//!
//! On the wire an absent reference is encoded as the all-zero hash. At API
//! boundaries TWL uses `Option<Hash>` instead; [`Hash::from_option`] and
//! [`Hash::into_option`] convert between the two forms.

pub mod error;
pub mod hash;

pub use error::TypeError;
pub use hash::Hash;
