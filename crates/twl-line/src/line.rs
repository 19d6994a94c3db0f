//! The line index and its chain queries.
//!
//! [`Line`] owns a snapshot of every atom it has been given plus three
//! derived indices:
//!
//! - `back`: twist → prev twist, registered once the twist's body is known;
//! - `forward`: prev twist → its single successor (write-once per key);
//! - `parents`: child hash (body, satisfactions) → twists containing it, so
//!   a body arriving after its twist can find the twists waiting on it.
//!
//! # Invariants
//!
//! - `forward` and `back` are mirror images of each other.
//! - No key of `forward` is ever overwritten with a different value.
//! - A failed [`Line::add_atoms`] leaves the line untouched.

use std::collections::HashMap;

use tracing::{debug, warn};
use twl_store::{Atoms, BodyPacket, Packet};
use twl_twist::Twist;
use twl_types::Hash;

use crate::config::LineConfig;
use crate::error::{LineError, LineResult};

#[derive(Clone, Debug, Default)]
pub struct Line {
    config: LineConfig,
    atoms: Atoms,
    back: HashMap<Hash, Hash>,
    forward: HashMap<Hash, Hash>,
    parents: HashMap<Hash, Vec<Hash>>,
    focus: Option<Hash>,
}

impl Line {
    /// Create an empty line.
    pub fn new(config: LineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Index `atoms` under the default config.
    pub fn from_atoms(atoms: &Atoms) -> LineResult<Self> {
        let mut line = Self::default();
        line.add_atoms(atoms)?;
        Ok(line)
    }

    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    /// Number of atoms held.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.atoms.contains(hash)
    }

    /// Every atom the line holds, in arrival order.
    pub fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Add a batch of atoms. Returns how many were new.
    ///
    /// Links implied by the batch are computed and checked for conflicts
    /// against the line and against each other before anything is stored.
    /// If the batch's focus is a resolvable twist it becomes the line focus.
    pub fn add_atoms(&mut self, batch: &Atoms) -> LineResult<usize> {
        let links = self.plan(batch)?;
        let fresh: Vec<Hash> = batch
            .hashes()
            .iter()
            .filter(|h| !self.atoms.contains(h))
            .copied()
            .collect();

        self.atoms.merge(batch)?;
        for hash in &fresh {
            if let Some(Packet::Twist(twist)) = self.atoms.get(hash) {
                for child in [Some(twist.body), twist.satisfactions].into_iter().flatten() {
                    self.parents.entry(child).or_default().push(*hash);
                }
            }
        }
        for (twist, prev) in links {
            debug!(prev = %prev.short_hex(), twist = %twist.short_hex(), "linked twist");
            self.back.insert(twist, prev);
            self.forward.insert(prev, twist);
        }
        if let Some(focus) = batch.focus() {
            if Twist::new(&self.atoms, focus).is_ok() {
                self.focus = Some(focus);
            }
        }

        debug!(added = fresh.len(), total = self.atoms.len(), "indexed atoms");
        Ok(fresh.len())
    }

    /// Add a single packet under `hash`.
    pub fn put(&mut self, hash: Hash, packet: Packet) -> LineResult<bool> {
        let mut batch = Atoms::new();
        batch.insert(hash, packet)?;
        Ok(self.add_atoms(&batch)? == 1)
    }

    /// Links `(twist, prev)` the batch would register, checked for conflicts.
    fn plan(&self, batch: &Atoms) -> LineResult<Vec<(Hash, Hash)>> {
        let lookup = |hash: &Hash| batch.get(hash).or_else(|| self.atoms.get(hash));
        let mut links = Vec::new();

        for (hash, packet) in batch.iter() {
            if self.atoms.contains(hash) {
                if self.config.reject_duplicates {
                    warn!(atom = %hash.short_hex(), "rejected duplicate atom");
                    return Err(LineError::DuplicateAtom(*hash));
                }
                continue;
            }
            match packet {
                Packet::Twist(twist) => {
                    if let Some(Packet::Body(body)) = lookup(&twist.body) {
                        if let Some(prev) = body.prev {
                            links.push((*hash, prev));
                        }
                    }
                }
                Packet::Body(body) => {
                    let Some(prev) = body.prev else {
                        continue;
                    };
                    let waiting = self.parents.get(hash).into_iter().flatten();
                    for twist in waiting {
                        if self.twist_packet_body(twist) == Some(*hash) {
                            links.push((*twist, prev));
                        }
                    }
                }
                _ => {}
            }
        }

        let mut pending: HashMap<Hash, Hash> = HashMap::new();
        for (twist, prev) in &links {
            let existing = self
                .forward
                .get(prev)
                .or_else(|| pending.get(prev))
                .copied();
            match existing {
                Some(existing) if existing != *twist => {
                    warn!(
                        prev = %prev.short_hex(),
                        existing = %existing.short_hex(),
                        candidate = %twist.short_hex(),
                        "rejected conflicting successor"
                    );
                    return Err(LineError::ConflictingSuccessor {
                        prev: *prev,
                        existing,
                        candidate: *twist,
                    });
                }
                Some(_) => {}
                None => {
                    pending.insert(*prev, *twist);
                }
            }
        }
        Ok(links)
    }

    // ---------------------------------------------------------------
    // Point lookups
    // ---------------------------------------------------------------

    fn twist_packet_body(&self, twist: &Hash) -> Option<Hash> {
        self.atoms
            .get(twist)
            .and_then(Packet::as_twist)
            .map(|t| t.body)
    }

    fn body(&self, twist: &Hash) -> Option<&BodyPacket> {
        let body = self.twist_packet_body(twist)?;
        self.atoms.get(&body).and_then(Packet::as_body)
    }

    fn is_twist(&self, hash: &Hash) -> bool {
        self.twist_packet_body(hash).is_some()
    }

    /// The indexed predecessor of `twist`.
    pub fn prev(&self, twist: &Hash) -> Option<Hash> {
        self.back.get(twist).copied()
    }

    /// The indexed successor of `twist`.
    pub fn successor(&self, twist: &Hash) -> Option<Hash> {
        self.forward.get(twist).copied()
    }

    pub fn tether(&self, twist: &Hash) -> Option<Hash> {
        self.body(twist).and_then(|b| b.tether)
    }

    /// Hashes contained in a twist packet: its body and satisfactions.
    pub fn contents(&self, twist: &Hash) -> Vec<Hash> {
        self.atoms
            .get(twist)
            .and_then(Packet::as_twist)
            .map(|t| [Some(t.body), t.satisfactions].into_iter().flatten().collect())
            .unwrap_or_default()
    }

    /// Twists containing `child` as body or satisfactions.
    pub fn parents(&self, child: &Hash) -> &[Hash] {
        self.parents.get(child).map(Vec::as_slice).unwrap_or_default()
    }

    /// A twist view over the line's atoms.
    pub fn twist(&self, hash: Hash) -> LineResult<Twist<'_>> {
        Ok(Twist::new(&self.atoms, hash)?)
    }

    pub fn focus(&self) -> Option<Hash> {
        self.focus
    }

    /// Point the focus at a twist the line can resolve.
    pub fn set_focus(&mut self, hash: Hash) -> LineResult<()> {
        Twist::new(&self.atoms, hash)?;
        self.focus = Some(hash);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Chain queries
    // ---------------------------------------------------------------

    fn step_limit(&self, start: Hash, steps: usize) -> LineResult<()> {
        if steps >= self.config.max_chain_len {
            return Err(LineError::ChainTooLong {
                start,
                limit: self.config.max_chain_len,
            });
        }
        Ok(())
    }

    /// The chain from its first known twist up to `hash`, inclusive.
    /// `None` if `hash` is not a twist in the line.
    pub fn history(&self, hash: Hash) -> LineResult<Option<Vec<Hash>>> {
        if !self.is_twist(&hash) {
            return Ok(None);
        }
        let mut chain = vec![hash];
        let mut current = hash;
        while let Some(prev) = self.prev(&current).filter(|p| self.is_twist(p)) {
            self.step_limit(hash, chain.len())?;
            chain.push(prev);
            current = prev;
        }
        chain.reverse();
        Ok(Some(chain))
    }

    /// The successors of `hash` in order, not including `hash`.
    pub fn successors(&self, hash: Hash) -> LineResult<Vec<Hash>> {
        let mut chain = Vec::new();
        let mut current = hash;
        while let Some(next) = self.successor(&current) {
            self.step_limit(hash, chain.len() + 1)?;
            chain.push(next);
            current = next;
        }
        Ok(chain)
    }

    /// History and successors of `hash` as one chain.
    fn span(&self, hash: Hash) -> LineResult<Option<Vec<Hash>>> {
        let Some(mut chain) = self.history(hash)? else {
            return Ok(None);
        };
        chain.extend(self.successors(hash)?);
        Ok(Some(chain))
    }

    /// The tip of the chain through `hash`; `hash` itself if nothing follows.
    pub fn last(&self, hash: Hash) -> LineResult<Option<Hash>> {
        if !self.is_twist(&hash) {
            return Ok(None);
        }
        Ok(Some(self.successors(hash)?.last().copied().unwrap_or(hash)))
    }

    /// Most recent tethered twist anywhere on the chain through `hash`.
    pub fn last_fast(&self, hash: Hash) -> LineResult<Option<Hash>> {
        let span = self.span(hash)?.unwrap_or_default();
        Ok(span.into_iter().rev().find(|h| self.tether(h).is_some()))
    }

    /// Most recent tethered twist strictly before `hash`.
    pub fn last_fast_before_hash(&self, hash: Hash) -> LineResult<Option<Hash>> {
        let mut history = self.history(hash)?.unwrap_or_default();
        history.pop();
        Ok(history.into_iter().rev().find(|h| self.tether(h).is_some()))
    }

    /// Whether `a` and `b` both lie on the chain through the focus.
    pub fn colinear(&self, a: Hash, b: Hash) -> LineResult<bool> {
        let Some(focus) = self.focus else {
            return Ok(false);
        };
        let span = self.span(focus)?.unwrap_or_default();
        Ok(span.contains(&a) && span.contains(&b))
    }

    /// Most recent rigging entry under `key` on the chain through the focus.
    pub fn find_rig(&self, key: Hash) -> LineResult<Option<Hash>> {
        let Some(focus) = self.focus else {
            return Ok(None);
        };
        for hash in self.span(focus)?.unwrap_or_default().into_iter().rev() {
            if let Some(value) = self.twist(hash)?.rig(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}
