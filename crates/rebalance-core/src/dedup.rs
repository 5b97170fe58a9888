//! Per-pass deduplication of shared assets.
//!
//! Several units can reference the same projectile or damage asset. Within one apply
//! pass each shared asset is modified at most once per group, so a unit
//! listed later never compounds a multiplier applied by an earlier one.

use std::collections::BTreeSet;

/// Which pass touched a shared asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetGroup {
    /// Health of a damage-data asset.
    Health,
    /// Damage fields of a projectile.
    Damage,
    /// Speed and lifetime of a projectile.
    Ballistics,
    /// Visible-event radius of a projectile.
    VisibleEvent,
}

/// Remembers which shared assets were already modified in this pass.
#[derive(Debug, Clone, Default)]
pub struct SharedAssetDeduplicator {
    modified: BTreeSet<(AssetGroup, String)>,
}

impl SharedAssetDeduplicator {
    /// Creates an empty deduplicator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `asset` was already modified for `group`.
    #[must_use]
    pub fn already_modified(&self, group: AssetGroup, asset: &str) -> bool {
        self.modified.contains(&(group, asset.to_string()))
    }

    /// Marks `asset` as modified. Returns `false` if it already was.
    pub fn mark_modified(&mut self, group: AssetGroup, asset: &str) -> bool {
        self.modified.insert((group, asset.to_string()))
    }

    /// Forgets everything. Called at the start of every pass.
    pub fn reset(&mut self) {
        self.modified.clear();
    }

    /// Number of recorded (group, asset) pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modified.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty()
    }
}
