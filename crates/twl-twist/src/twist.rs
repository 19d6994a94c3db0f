use std::collections::{BTreeMap, HashSet};

use twl_store::{Atoms, BodyPacket, Packet, PacketKind, StoreError, TwistPacket};
use twl_types::Hash;

use crate::builder::TwistBuilder;
use crate::error::{TwistError, TwistResult};
use crate::satisfy::Verifier;
use crate::shield;

/// Read-only view of one chain node over an atom set.
///
/// A twist *is* its hash: two views are equal iff their hashes are. Both the
/// twist packet and its body are resolved when the view is built, so a view
/// that exists is always backed by its body.
#[derive(Clone, Copy)]
pub struct Twist<'a> {
    atoms: &'a Atoms,
    hash: Hash,
    packet: &'a TwistPacket,
    body: &'a BodyPacket,
}

impl<'a> Twist<'a> {
    /// Resolve the twist named `hash` in `atoms`.
    ///
    /// Fails with [`TwistError::MissingData`] if the twist or its body is
    /// absent and [`TwistError::Shape`] if either has the wrong kind.
    pub fn new(atoms: &'a Atoms, hash: Hash) -> TwistResult<Self> {
        let packet = atoms.get(&hash).ok_or(TwistError::MissingData(hash))?;
        let packet = packet
            .as_twist()
            .ok_or_else(|| TwistError::shape(hash, PacketKind::Twist, packet.kind()))?;
        let body = atoms
            .get(&packet.body)
            .ok_or(TwistError::MissingData(packet.body))?;
        let body = body
            .as_body()
            .ok_or_else(|| TwistError::shape(packet.body, PacketKind::Body, body.kind()))?;
        Ok(Self {
            atoms,
            hash,
            packet,
            body,
        })
    }

    /// The twist at the focus of `atoms`.
    pub fn focus(atoms: &'a Atoms) -> TwistResult<Self> {
        let hash = atoms.focus().ok_or(StoreError::Empty)?;
        Self::new(atoms, hash)
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn body_hash(&self) -> Hash {
        self.packet.body
    }

    pub fn body(&self) -> &'a BodyPacket {
        self.body
    }

    pub fn atoms(&self) -> &'a Atoms {
        self.atoms
    }

    // ---------------------------------------------------------------
    // Body fields
    // ---------------------------------------------------------------

    pub fn prev_hash(&self) -> Option<Hash> {
        self.body.prev
    }

    /// The previous twist. `None` for the first twist of a chain; a prev
    /// hash that cannot be resolved is [`TwistError::MissingData`].
    pub fn prev(&self) -> TwistResult<Option<Twist<'a>>> {
        self.body
            .prev
            .map(|prev| Twist::new(self.atoms, prev))
            .transpose()
    }

    pub fn tether(&self) -> Option<Hash> {
        self.body.tether
    }

    pub fn is_tethered(&self) -> bool {
        self.body.tether.is_some()
    }

    /// The tether twist, if it is present locally.
    pub fn tether_twist(&self) -> TwistResult<Option<Twist<'a>>> {
        self.body
            .tether
            .map(|tether| Twist::new(self.atoms, tether))
            .transpose()
    }

    pub fn cargo(&self) -> Option<Hash> {
        self.body.cargo
    }

    pub fn cargo_packet(&self) -> TwistResult<Option<&'a Packet>> {
        self.body.cargo.map(|h| self.packet(h)).transpose()
    }

    /// The shield secret bytes.
    pub fn shield(&self) -> TwistResult<Option<&'a [u8]>> {
        let Some(hash) = self.body.shield else {
            return Ok(None);
        };
        let packet = self.packet(hash)?;
        packet
            .as_blob()
            .map(Some)
            .ok_or_else(|| TwistError::shape(hash, PacketKind::Blob, packet.kind()))
    }

    /// Shield commitment to `target` using this twist as the anchor.
    pub fn shield_commit(&self, target: Hash) -> TwistResult<Hash> {
        Ok(shield::commit(target, self.shield()?))
    }

    // ---------------------------------------------------------------
    // Tries
    // ---------------------------------------------------------------

    pub fn reqs(&self) -> TwistResult<Option<&'a BTreeMap<Hash, Hash>>> {
        self.trie(self.body.requirements)
    }

    pub fn req(&self, key: Hash) -> TwistResult<Option<Hash>> {
        Ok(self.reqs()?.and_then(|t| t.get(&key).copied()))
    }

    pub fn sats(&self) -> TwistResult<Option<&'a BTreeMap<Hash, Hash>>> {
        self.trie(self.packet.satisfactions)
    }

    pub fn sat(&self, key: Hash) -> TwistResult<Option<Hash>> {
        Ok(self.sats()?.and_then(|t| t.get(&key).copied()))
    }

    pub fn rigging(&self) -> TwistResult<Option<&'a BTreeMap<Hash, Hash>>> {
        self.trie(self.body.rigging)
    }

    /// Look up an attestation in this twist's rigging.
    pub fn rig(&self, key: Hash) -> TwistResult<Option<Hash>> {
        Ok(self.rigging()?.and_then(|t| t.get(&key).copied()))
    }

    /// Read the successor of `lead` hoisted in `rigged`, using this twist's
    /// shield secret.
    pub fn hoisted_meet(&self, rigged: &Twist<'_>, lead: Hash) -> TwistResult<Option<Hash>> {
        rigged.rig(self.shield_commit(lead)?)
    }

    fn trie(&self, hash: Option<Hash>) -> TwistResult<Option<&'a BTreeMap<Hash, Hash>>> {
        let Some(hash) = hash else {
            return Ok(None);
        };
        let packet = self.packet(hash)?;
        packet
            .as_trie()
            .map(Some)
            .ok_or_else(|| TwistError::shape(hash, PacketKind::Trie, packet.kind()))
    }

    fn packet(&self, hash: Hash) -> TwistResult<&'a Packet> {
        self.atoms.get(&hash).ok_or(TwistError::MissingData(hash))
    }

    /// Verify every requirement against its satisfaction.
    pub fn check_satisfactions(&self, verifier: &dyn Verifier) -> TwistResult<()> {
        let Some(reqs) = self.reqs()? else {
            return Ok(());
        };
        let sats = self.sats()?;
        for (key, requirement) in reqs {
            let satisfaction = sats
                .and_then(|s| s.get(key))
                .ok_or(TwistError::MissingSatisfaction(*key))?;
            verifier.verify(
                self.body_hash(),
                *key,
                self.packet(*requirement)?,
                self.packet(*satisfaction)?,
            )?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Chain walks
    // ---------------------------------------------------------------

    /// The first twist of this chain.
    pub fn first(&self) -> TwistResult<Twist<'a>> {
        let mut seen = HashSet::new();
        let mut current = *self;
        while let Some(prev) = current.prev()? {
            if !seen.insert(current.hash) {
                return Err(TwistError::Cycle(current.hash));
            }
            current = prev;
        }
        Ok(current)
    }

    /// Walk back from this twist (inclusive) and return the most recent
    /// twist matching `pred`.
    pub fn find_last<F>(&self, mut pred: F) -> TwistResult<Option<Twist<'a>>>
    where
        F: FnMut(&Twist<'a>) -> bool,
    {
        let mut seen = HashSet::new();
        let mut current = Some(*self);
        while let Some(twist) = current {
            if !seen.insert(twist.hash) {
                return Err(TwistError::Cycle(twist.hash));
            }
            if pred(&twist) {
                return Ok(Some(twist));
            }
            current = twist.prev()?;
        }
        Ok(None)
    }

    /// Nearest ancestor, excluding this twist, that has a tether.
    pub fn last_fast(&self) -> TwistResult<Option<Twist<'a>>> {
        match self.prev()? {
            Some(prev) => prev.find_last(Twist::is_tethered),
            None => Ok(None),
        }
    }

    // ---------------------------------------------------------------
    // Successors and persistence
    // ---------------------------------------------------------------

    /// Start the next twist of this chain, carrying the requirements forward.
    pub fn create_successor(&self) -> TwistBuilder {
        let mut builder = TwistBuilder::continuing(self.atoms.clone(), self.hash);
        if let Some(requirements) = self.body.requirements {
            builder.carry_requirements(requirements);
        }
        builder
    }

    /// The twist and body packets alone, focused on this twist.
    pub fn own_atoms(&self) -> Atoms {
        let mut atoms = Atoms::new();
        atoms.add(Packet::Body(*self.body));
        atoms.add(Packet::Twist(*self.packet));
        atoms
    }

    /// Persisted form: the whole atom set, focused on this twist.
    pub fn to_atoms(&self) -> TwistResult<Atoms> {
        let mut atoms = self.atoms.clone();
        atoms.refocus(self.hash)?;
        Ok(atoms)
    }

    pub fn to_bytes(&self) -> TwistResult<Vec<u8>> {
        Ok(self.to_atoms()?.to_bytes())
    }
}

impl PartialEq for Twist<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Twist<'_> {}

impl std::fmt::Debug for Twist<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Twist({})", self.hash.short_hex())
    }
}
