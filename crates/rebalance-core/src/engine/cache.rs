//! Original values recorded by the direct-mutation path.

use std::collections::BTreeMap;

use tracing::debug;

use crate::host::member::{FieldValue, Member};
use crate::host::{FieldPath, World};

/// Baseline values of every field the direct path has touched this session.
///
/// The first direct write to a field records what was there; every later
/// apply computes from that record instead of the already-mutated value.
#[derive(Debug, Clone, Default)]
pub struct FallbackCache {
    originals: BTreeMap<(FieldPath, Member), FieldValue>,
}

impl FallbackCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded original, recording `current` if there is none.
    pub fn original_or_insert(&mut self, path: &FieldPath, member: Member, current: FieldValue) -> FieldValue {
        *self
            .originals
            .entry((path.clone(), member))
            .or_insert(current)
    }

    /// The recorded original, if any.
    #[must_use]
    pub fn original(&self, path: &FieldPath, member: Member) -> Option<FieldValue> {
        self.originals.get(&(path.clone(), member)).copied()
    }

    /// Writes every original back into `world` and forgets them. Returns
    /// how many fields were restored.
    pub fn restore_all(&mut self, world: &mut World) -> usize {
        let mut restored = 0;
        for ((path, member), original) in std::mem::take(&mut self.originals) {
            if world.write(&path, member, original) {
                restored += 1;
            } else {
                debug!(path = %path, member = %member, "original no longer writable");
            }
        }
        restored
    }

    /// Forgets every original without restoring.
    pub fn clear(&mut self) {
        self.originals.clear();
    }

    /// Number of recorded originals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::components::DamageData;

    #[test]
    fn first_value_wins_and_restores() {
        let mut world = World::new();
        world.insert_damage_data("Tank", DamageData { health: 100.0 });
        let path = FieldPath::DamageData("Tank".to_string());

        let mut cache = FallbackCache::new();
        let first = cache.original_or_insert(&path, Member::Health, FieldValue::Float(100.0));
        world.write(&path, Member::Health, FieldValue::Float(150.0));
        let second = cache.original_or_insert(&path, Member::Health, FieldValue::Float(150.0));
        assert_eq!(first, second);

        assert_eq!(cache.restore_all(&mut world), 1);
        assert!(cache.is_empty());
        assert_eq!(world.read(&path, Member::Health), Some(FieldValue::Float(100.0)));
    }
}
