//! Synchronized override store.
//!
//! The store records `(target, member, value)` overrides on top of the host's
//! baseline definitions, can revert them all at once, and is the source the
//! sync chunker reads from when transmitting to participants.
//!
//! [`SyncStore`] is the seam the engine talks to. [`MemoryStore`] is the
//! in-process implementation used by the CLI and tests. Its source registry
//! is built lazily the first time it is needed; anything registered later via
//! [`SyncStore::register_source`] forces that build first so built-in sources
//! are never dropped.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::host::member::{FieldValue, Member, MemberAccess, ValueKind};
use crate::host::World;

// =============================================================================
// Target Key
// =============================================================================

/// Identifier under which the store groups overrides.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetKey(String);

impl TargetKey {
    /// Target for a named asset: `A:{name}.asset`.
    #[must_use]
    pub fn asset(name: &str) -> Self {
        Self(format!("A:{name}.asset"))
    }

    /// Target for a damage-data asset: `A:DamageManagerData_{name}.asset`.
    #[must_use]
    pub fn damage_data(name: &str) -> Self {
        Self(format!("A:DamageManagerData_{name}.asset"))
    }

    /// The raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetKey({})", self.0)
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Override Records
// =============================================================================

/// One override held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverrideEntry {
    /// Overriding value.
    pub value: FieldValue,
    /// Disabled entries stay recorded but are neither applied nor sent.
    pub enabled: bool,
}

/// Overrides grouped by target, then by member name.
pub type OverrideMap = BTreeMap<TargetKey, BTreeMap<String, OverrideEntry>>;

/// Targets with at least one enabled member, in key order.
#[must_use]
pub fn active_targets(overrides: &OverrideMap) -> Vec<TargetKey> {
    overrides
        .iter()
        .filter(|(_, members)| members.values().any(|e| e.enabled))
        .map(|(target, _)| target.clone())
        .collect()
}

/// A source the store can accept overrides for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Target key.
    pub target: TargetKey,
    /// Member names with their kinds.
    pub members: Vec<(String, ValueKind)>,
}

impl SourceEntry {
    /// Builds a source from typed members, keeping only syncable ones.
    #[must_use]
    pub fn from_members(target: TargetKey, members: impl IntoIterator<Item = Member>) -> Self {
        let members = members
            .into_iter()
            .filter(|m| m.is_syncable())
            .map(|m| (m.as_str().to_string(), m.kind()))
            .collect();
        Self { target, members }
    }
}

/// Notification the store would broadcast to participants.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreNotification {
    /// A single override changed.
    Set {
        /// Target key.
        target: TargetKey,
        /// Member name.
        member: String,
    },
    /// Every override was reverted.
    RevertAll,
}

// =============================================================================
// SyncStore Trait
// =============================================================================

/// The synchronized, revertible override store.
pub trait SyncStore {
    /// Prepares the store. Fails if its capabilities are unavailable, in
    /// which case the engine runs in direct-mutation mode.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the store cannot be used.
    fn init(&mut self) -> Result<(), StoreError>;

    /// Whether [`init`](Self::init) succeeded.
    fn is_ready(&self) -> bool;

    /// Records an override.
    ///
    /// `enqueue` queues the change for the next broadcast; `notify` sends it
    /// to participants immediately. Bulk setup passes `notify = false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is not ready, the target or member is
    /// unknown, or `kind` does not match the member.
    fn set(
        &mut self,
        kind: ValueKind,
        target: &TargetKey,
        member: &str,
        value: FieldValue,
        enqueue: bool,
        notify: bool,
    ) -> Result<(), StoreError>;

    /// Drops every override, restoring the baseline.
    fn revert_all(&mut self, notify: bool, enqueue: bool);

    /// The enabled override for a member, if any.
    fn get(&self, target: &TargetKey, member: &str) -> Option<FieldValue>;

    /// Currently visible overrides.
    fn overrides(&self) -> &OverrideMap;

    /// Replaces the visible overrides, returning the previous contents.
    fn replace_overrides(&mut self, overrides: OverrideMap) -> OverrideMap;

    /// Whether a source is registered for `target`.
    fn knows_target(&mut self, target: &TargetKey) -> bool;

    /// Registers an additional source. Returns `false` if it already existed.
    fn register_source(&mut self, source: SourceEntry) -> bool;
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-process override store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    available: bool,
    ready: bool,
    pending_builtin: Option<Vec<SourceEntry>>,
    sources: BTreeMap<TargetKey, BTreeMap<String, ValueKind>>,
    overrides: OverrideMap,
    queued: usize,
    notifications: Vec<StoreNotification>,
}

impl MemoryStore {
    /// Creates a store whose built-in sources are `builtin`.
    #[must_use]
    pub fn new(builtin: Vec<SourceEntry>) -> Self {
        Self {
            available: true,
            pending_builtin: Some(builtin),
            ..Self::default()
        }
    }

    /// Creates a store that knows every prefab, construction and projectile
    /// asset in `world`. Damage data is not a built-in source.
    #[must_use]
    pub fn from_world(world: &World) -> Self {
        let mut builtin = Vec::new();
        for (_, unit) in world.units() {
            let members = unit.components.iter().flat_map(MemberAccess::members);
            builtin.push(SourceEntry::from_members(
                TargetKey::asset(&unit.asset_name),
                members,
            ));
            if let Some(cd) = unit.construction.as_deref() {
                if let Some(data) = world.construction(cd) {
                    builtin.push(SourceEntry::from_members(TargetKey::asset(cd), data.members()));
                }
            }
        }
        for (name, projectile) in world.projectiles() {
            builtin.push(SourceEntry::from_members(
                TargetKey::asset(name),
                projectile.members(),
            ));
        }
        Self::new(builtin)
    }

    /// Creates a store whose initialization always fails.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Whether the lazy built-in registry has been built.
    #[must_use]
    pub fn sources_built(&self) -> bool {
        self.pending_builtin.is_none()
    }

    /// Number of changes queued for broadcast.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queued
    }

    /// Notifications sent so far.
    #[must_use]
    pub fn notifications(&self) -> &[StoreNotification] {
        &self.notifications
    }

    /// Enables or disables a recorded override.
    pub fn set_enabled(&mut self, target: &TargetKey, member: &str, enabled: bool) -> bool {
        match self
            .overrides
            .get_mut(target)
            .and_then(|members| members.get_mut(member))
        {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Builds the registry from the pending built-ins. The build replaces
    /// the registry wholesale, so it must run before any registration.
    fn ensure_sources(&mut self) {
        if let Some(builtin) = self.pending_builtin.take() {
            let mut sources = BTreeMap::new();
            for entry in builtin {
                let members: &mut BTreeMap<String, ValueKind> =
                    sources.entry(entry.target).or_default();
                members.extend(entry.members);
            }
            debug!(sources = sources.len(), "override store sources built");
            self.sources = sources;
        }
    }
}

impl SyncStore for MemoryStore {
    fn init(&mut self) -> Result<(), StoreError> {
        if !self.available {
            return Err(StoreError::Unavailable);
        }
        self.ready = true;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn set(
        &mut self,
        kind: ValueKind,
        target: &TargetKey,
        member: &str,
        value: FieldValue,
        enqueue: bool,
        notify: bool,
    ) -> Result<(), StoreError> {
        if !self.ready {
            return Err(StoreError::Unavailable);
        }
        self.ensure_sources();

        let members = self
            .sources
            .get(target)
            .ok_or_else(|| StoreError::UnknownTarget(target.clone()))?;
        let expected = *members.get(member).ok_or_else(|| StoreError::UnknownMember {
            target: target.clone(),
            member: member.to_string(),
        })?;
        if kind != expected || value.kind() != expected {
            return Err(StoreError::KindMismatch {
                target: target.clone(),
                member: member.to_string(),
                expected,
                found: value.kind(),
            });
        }

        self.overrides
            .entry(target.clone())
            .or_default()
            .insert(
                member.to_string(),
                OverrideEntry {
                    value,
                    enabled: true,
                },
            );
        if enqueue {
            self.queued += 1;
        }
        if notify {
            self.notifications.push(StoreNotification::Set {
                target: target.clone(),
                member: member.to_string(),
            });
        }
        Ok(())
    }

    fn revert_all(&mut self, notify: bool, enqueue: bool) {
        let reverted: usize = self.overrides.values().map(BTreeMap::len).sum();
        self.overrides.clear();
        if enqueue {
            self.queued += 1;
        } else {
            self.queued = 0;
        }
        if notify {
            self.notifications.push(StoreNotification::RevertAll);
        }
        debug!(reverted, notify, "override store reverted");
    }

    fn get(&self, target: &TargetKey, member: &str) -> Option<FieldValue> {
        self.overrides
            .get(target)?
            .get(member)
            .filter(|e| e.enabled)
            .map(|e| e.value)
    }

    fn overrides(&self) -> &OverrideMap {
        &self.overrides
    }

    fn replace_overrides(&mut self, overrides: OverrideMap) -> OverrideMap {
        std::mem::replace(&mut self.overrides, overrides)
    }

    fn knows_target(&mut self, target: &TargetKey) -> bool {
        self.ensure_sources();
        self.sources.contains_key(target)
    }

    fn register_source(&mut self, source: SourceEntry) -> bool {
        self.ensure_sources();
        if self.sources.contains_key(&source.target) {
            return false;
        }
        if source.members.is_empty() {
            warn!(target = %source.target, "registering source without members");
        }
        self.sources
            .insert(source.target, source.members.into_iter().collect());
        true
    }
}
