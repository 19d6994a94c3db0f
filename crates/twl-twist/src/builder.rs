use std::collections::BTreeMap;

use tracing::debug;
use twl_store::{Atoms, BodyPacket, Packet, PacketKind, StoreError, TwistPacket};
use twl_types::Hash;

use crate::error::{TwistError, TwistResult};
use crate::satisfy::Satisfier;
use crate::twist::Twist;

/// A body field plus the atoms needed to resolve it.
#[derive(Clone, Debug)]
struct Attachment {
    hash: Hash,
    atoms: Atoms,
}

impl Attachment {
    fn bare(hash: Hash) -> Self {
        Self {
            hash,
            atoms: Atoms::new(),
        }
    }
}

/// Assembles the next twist of a chain.
///
/// Every setter is a local mutation; nothing is hashed until
/// [`serialize`](Self::serialize), which is a pure transform of the builder
/// state into the atoms of the completed chain.
#[derive(Clone, Debug, Default)]
pub struct TwistBuilder {
    atoms: Atoms,
    prev: Option<Hash>,
    tether: Option<Attachment>,
    requirements: Option<Attachment>,
    cargo: Option<Attachment>,
    shield: Option<Vec<u8>>,
    rigging: BTreeMap<Hash, Hash>,
    /// Requirement key → (body hash the satisfaction was made over, packet).
    satisfactions: BTreeMap<Hash, (Hash, Packet)>,
}

impl TwistBuilder {
    /// Builder for the first twist of a new chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder for the twist following `prev`, whose chain is held in `atoms`.
    pub fn continuing(atoms: Atoms, prev: Hash) -> Self {
        Self {
            atoms,
            prev: Some(prev),
            ..Self::default()
        }
    }

    pub fn prev(&self) -> Option<Hash> {
        self.prev
    }

    /// The chain so far.
    pub fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    /// The previous twist. `None` for a first twist.
    pub fn prev_twist(&self) -> TwistResult<Option<Twist<'_>>> {
        self.prev
            .map(|prev| Twist::new(&self.atoms, prev))
            .transpose()
    }

    /// Attach cargo. The focus of `cargo` becomes the body's cargo hash.
    pub fn set_cargo(&mut self, cargo: Atoms) -> TwistResult<()> {
        let hash = cargo.focus().ok_or(StoreError::Empty)?;
        self.cargo = Some(Attachment { hash, atoms: cargo });
        Ok(())
    }

    /// Tether to an external twist known only by hash.
    pub fn set_tether(&mut self, tether: Hash) {
        self.tether = Some(Attachment::bare(tether));
    }

    /// Tether to `twist`, carrying its twist and body packets along.
    pub fn set_tether_twist(&mut self, twist: &Twist<'_>) {
        self.tether = Some(Attachment {
            hash: twist.hash(),
            atoms: twist.own_atoms(),
        });
    }

    /// Attach requirements. The focus of `requirements` must be a trie.
    pub fn set_requirements(&mut self, requirements: Atoms) -> TwistResult<()> {
        let hash = requirements.focus().ok_or(StoreError::Empty)?;
        if let Some(packet) = requirements.get(&hash) {
            if packet.kind() != PacketKind::Trie {
                return Err(TwistError::shape(hash, PacketKind::Trie, packet.kind()));
            }
        }
        self.requirements = Some(Attachment {
            hash,
            atoms: requirements,
        });
        Ok(())
    }

    /// Reuse a requirements trie that is already in the chain's atoms.
    pub(crate) fn carry_requirements(&mut self, requirements: Hash) {
        self.requirements = Some(Attachment::bare(requirements));
    }

    /// Set the shield secret.
    pub fn set_shield(&mut self, secret: impl Into<Vec<u8>>) {
        self.shield = Some(secret.into());
    }

    pub fn add_rigging(&mut self, key: Hash, value: Hash) {
        self.rigging.insert(key, value);
    }

    /// Fold a whole trie (typically from [`rig_for_hoist`]) into the rigging.
    ///
    /// [`rig_for_hoist`]: crate::shield::rig_for_hoist
    pub fn add_rigging_trie(&mut self, trie: &BTreeMap<Hash, Hash>) {
        self.rigging
            .extend(trie.iter().map(|(key, value)| (*key, *value)));
    }

    fn rigging_packet(&self) -> Option<Packet> {
        (!self.rigging.is_empty()).then(|| Packet::Trie(self.rigging.clone()))
    }

    fn shield_packet(&self) -> Option<Packet> {
        self.shield.as_ref().map(|secret| Packet::Blob(secret.clone()))
    }

    /// The body as it stands.
    pub fn body(&self) -> BodyPacket {
        BodyPacket {
            prev: self.prev,
            tether: self.tether.as_ref().map(|a| a.hash),
            requirements: self.requirements.as_ref().map(|a| a.hash),
            cargo: self.cargo.as_ref().map(|a| a.hash),
            rigging: self.rigging_packet().map(|p| p.hash()),
            shield: self.shield_packet().map(|p| p.hash()),
        }
    }

    pub fn body_hash(&self) -> Hash {
        Packet::Body(self.body()).hash()
    }

    /// Ask `satisfier` to satisfy its requirement over the current body.
    ///
    /// Changing the body afterwards leaves the satisfaction stale; serializing
    /// then fails until the builder is satisfied again.
    pub async fn satisfy(&mut self, satisfier: &dyn Satisfier) -> TwistResult<()> {
        let body = self.body_hash();
        let requirement = satisfier.requirement();
        let satisfaction = satisfier.satisfy(body).await?;
        debug!(
            requirement = %requirement.short_hex(),
            body = %body.short_hex(),
            "recorded satisfaction"
        );
        self.satisfactions.insert(requirement, (body, satisfaction));
        Ok(())
    }

    /// Satisfactions trie for `body`, or an error naming a stale one.
    fn satisfactions_trie(&self, body: Hash) -> TwistResult<Option<BTreeMap<Hash, Hash>>> {
        if self.satisfactions.is_empty() {
            return Ok(None);
        }
        self.satisfactions
            .iter()
            .map(|(key, (signed, packet))| {
                if *signed == body {
                    Ok((*key, packet.hash()))
                } else {
                    Err(TwistError::StaleSatisfaction { requirement: *key })
                }
            })
            .collect::<TwistResult<BTreeMap<_, _>>>()
            .map(Some)
    }

    fn twist_packet(&self, body: Hash) -> TwistResult<TwistPacket> {
        Ok(TwistPacket {
            body,
            satisfactions: self
                .satisfactions_trie(body)?
                .map(|trie| Packet::Trie(trie).hash()),
        })
    }

    /// Hash of the twist this builder would serialize.
    pub fn hash(&self) -> TwistResult<Hash> {
        Ok(Packet::Twist(self.twist_packet(self.body_hash())?).hash())
    }

    /// Produce the atoms of the chain ending in the new twist, focused on it.
    ///
    /// Leaves the builder untouched; repeated calls are byte-identical.
    pub fn serialize(&self) -> TwistResult<Atoms> {
        let body = self.body();
        let body_hash = Packet::Body(body).hash();
        let sats = self.satisfactions_trie(body_hash)?;

        let mut atoms = self.atoms.clone();
        for attachment in [&self.tether, &self.requirements, &self.cargo]
            .into_iter()
            .flatten()
        {
            atoms.merge(&attachment.atoms)?;
        }
        if let Some(rigging) = self.rigging_packet() {
            atoms.add(rigging);
        }
        if let Some(shield) = self.shield_packet() {
            atoms.add(shield);
        }
        atoms.add(Packet::Body(body));

        let satisfactions = match sats {
            Some(trie) => {
                for (_, packet) in self.satisfactions.values() {
                    atoms.add(packet.clone());
                }
                Some(atoms.add(Packet::Trie(trie)))
            }
            None => None,
        };
        let hash = atoms.add(Packet::Twist(TwistPacket {
            body: body_hash,
            satisfactions,
        }));
        atoms.refocus(hash)?;

        debug!(
            twist = %hash.short_hex(),
            prev = ?self.prev.map(|p| p.short_hex()),
            atoms = atoms.len(),
            "serialized twist"
        );
        Ok(atoms)
    }

    /// Serialize this twist and start the next one on top of it.
    pub fn create_successor(&self) -> TwistResult<TwistBuilder> {
        let atoms = self.serialize()?;
        let hash = atoms.focus().ok_or(StoreError::Empty)?;
        Ok(Self::continuing(atoms, hash))
    }
}
