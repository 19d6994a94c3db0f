//! Content-addressed packet storage for Twist Line.
//!
//! Every piece of data in TWL -- cargo blobs, requirement tries, bodies,
//! twists -- is an immutable [`Packet`] identified by the domain-separated
//! BLAKE3 hash of its canonical encoding. An [`Atoms`] set is the
//! insertion-ordered collection of packets that one or more twists refer to.
//!
//! # Wire format
//!
//! A packet is encoded as `kind ‖ varint(len) ‖ payload`. An atom stream is
//! a plain concatenation of `hash ‖ packet` pairs with no outer framing; the
//! last pair is the stream's focus. [`AtomDecoder`] parses such a stream
//! incrementally from arbitrary chunks.
//!
//! # Design Rules
//!
//! 1. Packets are immutable once hashed.
//! 2. Every `(hash, packet)` pair is re-verified when it enters an atom set.
//! 3. Atom sets only grow, except for [`Atoms::replace_last`].
//! 4. A failed operation leaves the atom set unchanged.

pub mod atoms;
pub mod codec;
pub mod error;
pub mod packet;

pub use atoms::Atoms;
pub use codec::AtomDecoder;
pub use error::{StoreError, StoreResult};
pub use packet::{BodyPacket, Packet, PacketKind, TwistPacket, MAX_PACKET_LEN};
