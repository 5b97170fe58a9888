//! Team tier events and the observer registry.
//!
//! Observers are registered for the lifetime of a session and removed
//! explicitly with the [`SubscriptionId`] returned by [`TierEvents::subscribe`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{TeamId, World};

/// A team's technology tier changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierChanged {
    /// Team whose tier changed.
    pub team: TeamId,
    /// Tier before the change.
    pub old_tier: i32,
    /// Tier after the change.
    pub new_tier: i32,
}

/// Receives team tier changes.
pub trait TierObserver {
    /// Called once per published event, in subscription order.
    fn on_tier_changed(&mut self, event: &TierChanged, world: &mut World);
}

/// Handle returned by [`TierEvents::subscribe`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

/// Registry of tier observers.
#[derive(Default)]
pub struct TierEvents {
    next_id: u64,
    observers: BTreeMap<SubscriptionId, Box<dyn TierObserver>>,
}

impl TierEvents {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer.
    pub fn subscribe(&mut self, observer: Box<dyn TierObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.insert(id, observer);
        id
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.remove(&id).is_some()
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Delivers `event` to every observer.
    pub fn publish(&mut self, event: &TierChanged, world: &mut World) {
        for observer in self.observers.values_mut() {
            observer.on_tier_changed(event, world);
        }
    }
}

impl fmt::Debug for TierEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TierEvents")
            .field("observers", &self.observers.len())
            .finish()
    }
}
