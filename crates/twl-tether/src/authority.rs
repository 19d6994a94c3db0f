//! In-memory tether authority.
//!
//! [`TetherAuthority`] keeps its chain in a [`Line`] behind a `RwLock`.
//! Hoists take the write lock, so two clients racing to hoist different
//! successors for the same lead are serialized and only one can win.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use twl_line::Line;
use twl_store::Atoms;
use twl_twist::TwistBuilder;
use twl_types::Hash;

use crate::error::{TetherError, TetherResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    /// Most entries accepted in one hoist trie.
    pub max_rigging_entries: usize,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            max_rigging_entries: 2,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    /// Builder for the next twist of the authority's chain.
    next: TwistBuilder,
    line: Line,
    /// Every rigging entry published so far.
    hoisted: HashMap<Hash, Hash>,
}

/// Publishes hoist attestations on its own chain.
#[derive(Debug)]
pub struct TetherAuthority {
    config: AuthorityConfig,
    state: RwLock<State>,
}

impl TetherAuthority {
    pub fn new(config: AuthorityConfig) -> Self {
        Self {
            config,
            state: RwLock::new(State::default()),
        }
    }

    pub fn config(&self) -> &AuthorityConfig {
        &self.config
    }

    fn read(&self) -> TetherResult<std::sync::RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| TetherError::Poisoned(e.to_string()))
    }

    /// Publish `rigging` as the hoist attestation for its lead.
    ///
    /// Returns the authority's published atoms, focused on the twist that
    /// carries the attestation. Re-submitting an identical hoist publishes
    /// nothing new. A hoist that disagrees with an earlier one under any key
    /// is rejected with [`TetherError::AlreadyHoisted`].
    pub fn hoist(&self, rigging: &BTreeMap<Hash, Hash>) -> TetherResult<Atoms> {
        if rigging.is_empty() {
            return Err(TetherError::MalformedRigging("empty hoist".into()));
        }
        if rigging.len() > self.config.max_rigging_entries {
            return Err(TetherError::MalformedRigging(format!(
                "{} entries, at most {} allowed",
                rigging.len(),
                self.config.max_rigging_entries
            )));
        }

        let mut state = self
            .state
            .write()
            .map_err(|e| TetherError::Poisoned(e.to_string()))?;

        let mut fresh = false;
        for (key, value) in rigging {
            match state.hoisted.get(key) {
                Some(existing) if existing != value => {
                    warn!(
                        key = %key.short_hex(),
                        existing = %existing.short_hex(),
                        candidate = %value.short_hex(),
                        "rejected second hoist for lead"
                    );
                    return Err(TetherError::AlreadyHoisted {
                        key: *key,
                        existing: *existing,
                        candidate: *value,
                    });
                }
                Some(_) => {}
                None => fresh = true,
            }
        }
        if !fresh {
            debug!("hoist already published");
            return Ok(state.line.atoms().clone());
        }

        let mut builder = state.next.clone();
        builder.add_rigging_trie(rigging);
        let atoms = builder.serialize()?;
        let next = builder.create_successor()?;
        state.line.add_atoms(&atoms)?;
        state.next = next;
        state.hoisted.extend(rigging.iter().map(|(k, v)| (*k, *v)));

        debug!(
            tip = ?state.line.focus().map(|h| h.short_hex()),
            hoists = state.hoisted.len(),
            "published hoist"
        );
        Ok(state.line.atoms().clone())
    }

    /// Every atom the authority has published, focused on its tip.
    pub fn published(&self) -> TetherResult<Atoms> {
        Ok(self.read()?.line.atoms().clone())
    }

    /// The latest twist of the authority's chain.
    pub fn tip(&self) -> TetherResult<Option<Hash>> {
        Ok(self.read()?.line.focus())
    }

    /// The published value under a rigging key.
    pub fn attestation(&self, key: &Hash) -> TetherResult<Option<Hash>> {
        Ok(self.read()?.hoisted.get(key).copied())
    }
}

impl Default for TetherAuthority {
    fn default() -> Self {
        Self::new(AuthorityConfig::default())
    }
}
