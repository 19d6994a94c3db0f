//! Shield commitments and hitch-hoist rigging.
//!
//! A shield commitment hides a target hash behind an optional secret:
//! `commit(target, secret) = hash(Blob(secret ‖ target))`. The party that
//! holds the secret (the one continuing the chain) can recompute it; nobody
//! else can.
//!
//! When a tether authority hoists a successor (`meet`) for a `lead` twist it
//! publishes the two-entry trie built by [`rig_for_hoist`]:
//!
//! | key                         | value               |
//! |-----------------------------|---------------------|
//! | `commit(lead)`              | `meet`              |
//! | `double_commit(lead)`       | `commit(meet)`      |
//!
//! The first entry lets the secret holder read the chosen successor
//! directly. The second binds the authority to that successor in a form a
//! third party can check once `meet` is revealed, without learning the
//! secret. The authority needs no key material tied to the chain's owner.

use std::collections::BTreeMap;

use twl_store::Packet;
use twl_types::Hash;

fn commitment_packet(target: Hash, secret: Option<&[u8]>) -> Packet {
    let mut data = secret.map(<[u8]>::to_vec).unwrap_or_default();
    data.extend_from_slice(target.as_bytes());
    Packet::Blob(data)
}

/// One-way commitment to `target` under an optional secret.
pub fn commit(target: Hash, secret: Option<&[u8]>) -> Hash {
    commitment_packet(target, secret).hash()
}

/// `commit(commit(target, secret), secret)`.
pub fn double_commit(target: Hash, secret: Option<&[u8]>) -> Hash {
    commit(commit(target, secret), secret)
}

/// Build the rigging a tether authority publishes to hoist `meet` as the
/// successor of `lead`.
pub fn rig_for_hoist(lead: Hash, meet: Hash, secret: Option<&[u8]>) -> BTreeMap<Hash, Hash> {
    BTreeMap::from([
        (commit(lead, secret), meet),
        (double_commit(lead, secret), commit(meet, secret)),
    ])
}

/// Read the successor hoisted for `lead`. Requires the secret.
pub fn read_hoist(
    rigging: &BTreeMap<Hash, Hash>,
    lead: Hash,
    secret: Option<&[u8]>,
) -> Option<Hash> {
    rigging.get(&commit(lead, secret)).copied()
}

/// Check both hoist entries for `lead → meet` with the secret.
pub fn verify_hoist(
    rigging: &BTreeMap<Hash, Hash>,
    lead: Hash,
    meet: Hash,
    secret: Option<&[u8]>,
) -> bool {
    read_hoist(rigging, lead, secret) == Some(meet)
        && rigging.get(&double_commit(lead, secret)) == Some(&commit(meet, secret))
}

/// Secret-less shape check for a revealed `meet`.
///
/// Confirms the rigging has the two-entry hoist shape and that exactly one
/// entry names `meet`. This does not bind `meet` to any lead: the keys stay
/// opaque without the secret, so any trie of the form `{x → meet, y → z}`
/// passes. Binding a meet to its lead needs [`verify_hoist`] and the secret.
pub fn verify_reveal(rigging: &BTreeMap<Hash, Hash>, meet: Hash) -> bool {
    rigging.len() == 2 && rigging.values().filter(|v| **v == meet).count() == 1
}
