//! Tier gating of dispensed units.
//!
//! A unit with a `min_tier` cannot be dispensed while the requesting team is
//! below that tier. The first time a team's tier crosses the threshold
//! upwards, every dispenser of that team handing out the unit has its
//! cooldown zeroed, once per `(team, unit)` per session.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::config::{Category, Overlay};
use crate::host::events::{TierChanged, TierObserver};
use crate::host::{TeamId, World};

/// Thresholds and the set of unlocks already performed.
#[derive(Debug, Clone, Default)]
pub struct TierGate {
    thresholds: BTreeMap<String, i32>,
    reset: BTreeSet<(TeamId, String)>,
}

impl TierGate {
    /// Creates a gate with no thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gate armed with the overlay's `min_tier` values.
    #[must_use]
    pub fn from_overlay(overlay: &Overlay) -> Self {
        let mut gate = Self::new();
        gate.set_thresholds(overlay);
        gate
    }

    /// Replaces the thresholds with the overlay's `min_tier` values. The
    /// reset set is kept.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_thresholds(&mut self, overlay: &Overlay) {
        self.thresholds = overlay
            .shared_entries(Category::MinTier)
            .map(|(unit, tier)| (unit.to_string(), tier.round() as i32))
            .collect();
        debug!(thresholds = self.thresholds.len(), "tier gate armed");
    }

    /// Configured threshold for `unit`.
    #[must_use]
    pub fn threshold(&self, unit: &str) -> Option<i32> {
        self.thresholds.get(unit).copied()
    }

    /// Whether any threshold is configured.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        !self.thresholds.is_empty()
    }

    /// Whether the one-time unlock already ran for `team` and `unit`.
    #[must_use]
    pub fn has_fired(&self, team: TeamId, unit: &str) -> bool {
        self.reset.contains(&(team, unit.to_string()))
    }

    /// Whether `unit` may be dispensed to a team at `team_tier`.
    #[must_use]
    pub fn dispense_allowed(&self, unit: &str, team_tier: i32) -> bool {
        self.threshold(unit).is_none_or(|min| team_tier >= min)
    }

    /// Handles a tier change. Returns how many unlocks fired.
    pub fn on_tier_changed(&mut self, event: &TierChanged, world: &mut World) -> usize {
        if event.new_tier <= event.old_tier {
            return 0;
        }
        let mut fired = 0;
        for (unit, &min) in &self.thresholds {
            if !(event.old_tier < min && min <= event.new_tier) {
                continue;
            }
            if !self.reset.insert((event.team, unit.clone())) {
                continue;
            }
            let dispensers = world.reset_dispenser_timeouts(event.team, unit);
            info!(
                team = %event.team,
                unit = %unit,
                tier = event.new_tier,
                dispensers,
                "tier threshold reached, dispenser cooldown reset"
            );
            fired += 1;
        }
        fired
    }

    /// Drops thresholds and performed unlocks.
    pub fn clear(&mut self) {
        self.thresholds.clear();
        self.reset.clear();
    }
}

/// Subscribes a shared [`TierGate`] to tier events.
#[derive(Debug, Clone)]
pub struct TierGateObserver(pub Rc<RefCell<TierGate>>);

impl TierObserver for TierGateObserver {
    fn on_tier_changed(&mut self, event: &TierChanged, world: &mut World) {
        match self.0.try_borrow_mut() {
            Ok(mut gate) => {
                gate.on_tier_changed(event, world);
            }
            Err(_) => warn!(team = %event.team, "tier gate busy, event dropped"),
        }
    }
}

#[cfg(test)]
mod tier_gate_tests {
    use super::*;
    use crate::host::components::{Component, Dispenser};
    use crate::host::UnitDefinition;

    fn gate() -> TierGate {
        let mut overlay = Overlay::new();
        overlay.insert(Category::MinTier, "Hoverbike", None, 3.0);
        TierGate::from_overlay(&overlay)
    }

    fn world() -> World {
        let mut world = World::new();
        world.add_unit(UnitDefinition::new("Pad", "Pad_Prefab").with_component(
            Component::Dispenser(Dispenser {
                dispensed_unit: "Hoverbike".to_string(),
                dispense_timeout: 60.0,
                local_timeout: 30.0,
            }),
        ));
        world.add_team(TeamId::new(1), 2);
        world.spawn_live("Pad", TeamId::new(1));
        world
    }

    fn change(old_tier: i32, new_tier: i32) -> TierChanged {
        TierChanged {
            team: TeamId::new(1),
            old_tier,
            new_tier,
        }
    }

    #[test]
    fn fires_once_per_team_and_unit() {
        let (mut gate, mut world) = (gate(), world());
        assert_eq!(gate.on_tier_changed(&change(2, 3), &mut world), 1);
        assert!(gate.has_fired(TeamId::new(1), "Hoverbike"));
        assert_eq!(gate.on_tier_changed(&change(2, 4), &mut world), 0);
    }

    #[test]
    fn ignores_downgrades_and_non_crossings() {
        let (mut gate, mut world) = (gate(), world());
        assert_eq!(gate.on_tier_changed(&change(4, 2), &mut world), 0);
        assert_eq!(gate.on_tier_changed(&change(3, 4), &mut world), 0);
        assert_eq!(gate.on_tier_changed(&change(1, 2), &mut world), 0);
        assert!(!gate.has_fired(TeamId::new(1), "Hoverbike"));
    }

    #[test]
    fn dispense_requires_threshold() {
        let gate = gate();
        assert!(!gate.dispense_allowed("Hoverbike", 2));
        assert!(gate.dispense_allowed("Hoverbike", 3));
        assert!(gate.dispense_allowed("Tank", 0));
    }
}
