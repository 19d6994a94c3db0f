use std::collections::HashMap;

use tracing::debug;
use twl_types::Hash;

use crate::codec::AtomDecoder;
use crate::error::{StoreError, StoreResult};
use crate::packet::Packet;

/// Insertion-ordered, content-addressed packet set.
///
/// Order is meaningful: the last entry is the *focus*, the object a
/// serialized atom stream is about. Every stored hash verifies its packet,
/// so two sets can be merged as a plain union keyed by hash.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Atoms {
    order: Vec<Hash>,
    packets: HashMap<Hash, Packet>,
}

impl Atoms {
    /// Create an empty atom set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of atoms.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if there are no atoms.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Insert a packet under `hash`.
    ///
    /// Fails with [`StoreError::Integrity`] if `hash` does not verify the
    /// packet. Re-inserting a pair that is already present is a no-op and
    /// does not move it. Returns `true` if the atom was new.
    pub fn insert(&mut self, hash: Hash, packet: Packet) -> StoreResult<bool> {
        let computed = packet.hash();
        if computed != hash {
            return Err(StoreError::Integrity {
                expected: hash,
                computed,
            });
        }
        Ok(self.insert_verified(hash, packet))
    }

    /// Hash a packet and insert it. Returns its hash.
    pub fn add(&mut self, packet: Packet) -> Hash {
        let hash = packet.hash();
        self.insert_verified(hash, packet);
        hash
    }

    fn insert_verified(&mut self, hash: Hash, packet: Packet) -> bool {
        if self.packets.contains_key(&hash) {
            return false;
        }
        self.order.push(hash);
        self.packets.insert(hash, packet);
        true
    }

    /// Look up a packet. Absence is not an error.
    pub fn get(&self, hash: &Hash) -> Option<&Packet> {
        self.packets.get(hash)
    }

    /// Returns `true` if `hash` is present.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.packets.contains_key(hash)
    }

    /// The most recently inserted hash.
    pub fn focus(&self) -> Option<Hash> {
        self.order.last().copied()
    }

    /// Move an existing atom to the end of the order, making it the focus.
    pub fn refocus(&mut self, hash: Hash) -> StoreResult<()> {
        let pos = self
            .order
            .iter()
            .position(|h| *h == hash)
            .ok_or(StoreError::NotFound(hash))?;
        let moved = self.order.remove(pos);
        self.order.push(moved);
        Ok(())
    }

    /// Replace the stale last atom with a fresh one in the same position.
    ///
    /// This is the only operation that removes an atom. It exists for
    /// refreshing the tip of a partial chain.
    pub fn replace_last(&mut self, hash: Hash, packet: Packet) -> StoreResult<Hash> {
        let computed = packet.hash();
        if computed != hash {
            return Err(StoreError::Integrity {
                expected: hash,
                computed,
            });
        }
        let stale = self.order.pop().ok_or(StoreError::Empty)?;
        self.packets.remove(&stale);
        if self.packets.contains_key(&hash) {
            // Already held elsewhere in the order; it becomes the focus.
            self.order.retain(|h| *h != hash);
        }
        self.order.push(hash);
        self.packets.insert(hash, packet);
        debug!(stale = %stale.short_hex(), fresh = %hash.short_hex(), "replaced last atom");
        Ok(stale)
    }

    /// Union with `other`, appending its new atoms in its insertion order.
    ///
    /// Either every atom of `other` is merged or none is.
    pub fn merge(&mut self, other: &Atoms) -> StoreResult<()> {
        for (hash, packet) in other.iter() {
            if let Some(existing) = self.packets.get(hash) {
                if existing != packet {
                    return Err(StoreError::Inconsistent(*hash));
                }
            }
        }
        let before = self.len();
        for (hash, packet) in other.iter() {
            self.insert_verified(*hash, packet.clone());
        }
        debug!(added = self.len() - before, total = self.len(), "merged atoms");
        Ok(())
    }

    /// All hashes in insertion order.
    pub fn hashes(&self) -> &[Hash] {
        &self.order
    }

    /// Iterate `(hash, packet)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Hash, &Packet)> {
        self.order
            .iter()
            .filter_map(move |h| self.packets.get(h).map(|p| (h, p)))
    }

    /// Canonical byte stream: `hash ‖ packet` pairs in insertion order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (hash, packet) in self.iter() {
            out.extend_from_slice(hash.as_bytes());
            packet.encode_into(&mut out);
        }
        out
    }

    /// Parse a complete atom stream.
    pub fn from_bytes(data: &[u8]) -> StoreResult<Self> {
        let mut decoder = AtomDecoder::new();
        decoder.feed(data);
        let mut atoms = Self::new();
        while let Some((hash, packet)) = decoder.next_atom()? {
            // A repeated pair keeps its first position, so a stream that
            // repeats its focus earlier must still end on it.
            if !atoms.insert_verified(hash, packet) {
                atoms.refocus(hash)?;
            }
        }
        decoder.finish()?;
        debug!(atoms = atoms.len(), bytes = data.len(), "decoded atom stream");
        Ok(atoms)
    }
}

impl std::fmt::Debug for Atoms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Atoms")
            .field("atom_count", &self.len())
            .field("focus", &self.focus())
            .finish()
    }
}

impl FromIterator<Packet> for Atoms {
    fn from_iter<I: IntoIterator<Item = Packet>>(iter: I) -> Self {
        let mut atoms = Self::new();
        for packet in iter {
            atoms.add(packet);
        }
        atoms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{BodyPacket, TwistPacket};

    fn blob(data: &[u8]) -> Packet {
        Packet::Blob(data.to_vec())
    }

    #[test]
    fn insert_verifies_hash() {
        let mut atoms = Atoms::new();
        let wrong = blob(b"other").hash();
        let err = atoms.insert(wrong, blob(b"data")).unwrap_err();
        assert!(matches!(err, StoreError::Integrity { .. }));
        assert!(atoms.is_empty());
    }

    #[test]
    fn insert_is_idempotent_and_keeps_position() {
        let mut atoms = Atoms::new();
        let a = blob(b"a");
        let b = blob(b"b");
        assert!(atoms.insert(a.hash(), a.clone()).unwrap());
        assert!(atoms.insert(b.hash(), b.clone()).unwrap());
        assert!(!atoms.insert(a.hash(), a.clone()).unwrap());
        assert_eq!(atoms.len(), 2);
        assert_eq!(atoms.focus(), Some(b.hash()));
    }

    #[test]
    fn get_missing_is_none() {
        let atoms = Atoms::new();
        assert!(atoms.get(&Hash::digest(b"missing")).is_none());
        assert_eq!(atoms.focus(), None);
    }

    #[test]
    fn focus_tracks_last_insert() {
        let mut atoms = Atoms::new();
        let first = atoms.add(blob(b"1"));
        let second = atoms.add(blob(b"2"));
        assert_eq!(atoms.focus(), Some(second));
        atoms.refocus(first).unwrap();
        assert_eq!(atoms.focus(), Some(first));
        assert_eq!(atoms.hashes(), &[second, first]);
    }

    #[test]
    fn refocus_missing_is_not_found() {
        let mut atoms = Atoms::new();
        let h = Hash::digest(b"nope");
        assert_eq!(atoms.refocus(h), Err(StoreError::NotFound(h)));
    }

    #[test]
    fn replace_last_swaps_focus() {
        let mut atoms = Atoms::new();
        let keep = atoms.add(blob(b"keep"));
        let stale = atoms.add(blob(b"stale"));
        let fresh = blob(b"fresh");
        let removed = atoms.replace_last(fresh.hash(), fresh.clone()).unwrap();
        assert_eq!(removed, stale);
        assert!(!atoms.contains(&stale));
        assert_eq!(atoms.hashes(), &[keep, fresh.hash()]);
    }

    #[test]
    fn replace_last_on_empty_fails() {
        let mut atoms = Atoms::new();
        let p = blob(b"x");
        assert_eq!(atoms.replace_last(p.hash(), p), Err(StoreError::Empty));
    }

    #[test]
    fn merge_is_idempotent_union() {
        let a: Atoms = [blob(b"1"), blob(b"2")].into_iter().collect();
        let b: Atoms = [blob(b"2"), blob(b"3")].into_iter().collect();

        let mut merged = a.clone();
        merged.merge(&b).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.focus(), Some(blob(b"3").hash()));

        let snapshot = merged.clone();
        merged.merge(&b).unwrap();
        assert_eq!(merged, snapshot);
    }

    #[test]
    fn bytes_roundtrip_preserves_order_and_focus() {
        let body = BodyPacket {
            cargo: Some(blob(b"cargo").hash()),
            ..Default::default()
        };
        let mut atoms = Atoms::new();
        atoms.add(blob(b"cargo"));
        let body_hash = atoms.add(Packet::Body(body));
        let twist = atoms.add(Packet::Twist(TwistPacket {
            body: body_hash,
            satisfactions: None,
        }));

        let parsed = Atoms::from_bytes(&atoms.to_bytes()).unwrap();
        assert_eq!(parsed, atoms);
        assert_eq!(parsed.focus(), Some(twist));
    }

    #[test]
    fn from_bytes_detects_tampering() {
        let atoms: Atoms = [blob(b"payload")].into_iter().collect();
        let mut bytes = atoms.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            Atoms::from_bytes(&bytes),
            Err(StoreError::Integrity { .. })
        ));
    }

    #[test]
    fn from_bytes_detects_truncation() {
        let atoms: Atoms = [blob(b"payload")].into_iter().collect();
        let bytes = atoms.to_bytes();
        assert!(matches!(
            Atoms::from_bytes(&bytes[..bytes.len() - 2]),
            Err(StoreError::Truncated { .. })
        ));
    }

    #[test]
    fn repeated_focus_in_stream_stays_focus() {
        let a = blob(b"a");
        let b = blob(b"b");
        let mut bytes = Vec::new();
        for p in [&a, &b, &a] {
            bytes.extend_from_slice(p.hash().as_bytes());
            p.encode_into(&mut bytes);
        }
        let atoms = Atoms::from_bytes(&bytes).unwrap();
        assert_eq!(atoms.len(), 2);
        assert_eq!(atoms.focus(), Some(a.hash()));
    }

    #[test]
    fn debug_format() {
        let atoms: Atoms = [blob(b"x")].into_iter().collect();
        let debug = format!("{atoms:?}");
        assert!(debug.contains("atom_count"));
    }
}
