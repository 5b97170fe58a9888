//! Entity catalog: every usable unit definition, indexed by display name.
//!
//! The catalog is rebuilt at the start of each apply-cycle. Building it
//! resolves, once, which components each entity carries and where they sit,
//! so the engine never searches component lists by type name while applying.

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::host::components::ComponentKind;
use crate::host::{FieldPath, UnitId, World};
use crate::store::TargetKey;

bitflags! {
    /// Capabilities an entity exposes to the engine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Capabilities: u16 {
        /// Has construction data.
        const CONSTRUCTION = 1 << 0;
        /// Has damage data.
        const DAMAGE_DATA = 1 << 1;
        /// Has a turret.
        const TURRET = 1 << 2;
        /// Is a creature.
        const CREATURE = 1 << 3;
        /// Has infantry movement.
        const SOLDIER = 1 << 4;
        /// Has ground vehicle movement.
        const VEHICLE = 1 << 5;
        /// Has aircraft movement.
        const AIR = 1 << 6;
        /// Has a sensor.
        const SENSOR = 1 << 7;
        /// Has an aim-at helper.
        const AIM_AT = 1 << 8;
        /// Can teleport.
        const TELEPORT = 1 << 9;
        /// Dispenses vehicles.
        const DISPENSER = 1 << 10;
        /// Has AI aim tracking.
        const AI_AIMING = 1 << 11;
    }
}

impl Capabilities {
    /// Capability flag for a component kind.
    #[must_use]
    pub const fn of(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Turret => Self::TURRET,
            ComponentKind::Creature => Self::CREATURE,
            ComponentKind::Soldier => Self::SOLDIER,
            ComponentKind::Vehicle => Self::VEHICLE,
            ComponentKind::Air => Self::AIR,
            ComponentKind::Sensor => Self::SENSOR,
            ComponentKind::AimAt => Self::AIM_AT,
            ComponentKind::Teleport => Self::TELEPORT,
            ComponentKind::Dispenser => Self::DISPENSER,
            ComponentKind::AiAiming => Self::AI_AIMING,
        }
    }
}

/// One indexed entity.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Display name.
    pub name: String,
    /// Definition id in the world.
    pub unit: UnitId,
    /// Store target for prefab-level members.
    pub target: TargetKey,
    /// Construction-data asset name, if present in the world.
    pub construction: Option<String>,
    /// Damage-data asset name, if present in the world.
    pub damage_data: Option<String>,
    /// Capability summary.
    pub capabilities: Capabilities,
    components: Vec<(ComponentKind, usize)>,
}

impl CatalogEntry {
    /// Paths of every component of `kind`, in definition order.
    pub fn components(&self, kind: ComponentKind) -> impl Iterator<Item = FieldPath> + '_ {
        let unit = self.unit;
        self.components
            .iter()
            .filter(move |(k, _)| *k == kind)
            .map(move |(_, index)| FieldPath::Component {
                unit,
                index: *index,
            })
    }

    /// Path of the first component of `kind`.
    #[must_use]
    pub fn first(&self, kind: ComponentKind) -> Option<FieldPath> {
        self.components(kind).next()
    }

    /// Whether the entity has every capability in `caps`.
    #[must_use]
    pub fn has(&self, caps: Capabilities) -> bool {
        self.capabilities.contains(caps)
    }
}

/// All usable entities keyed by display name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    /// Scans the world's definitions.
    ///
    /// Definitions with an empty display name, or with neither components
    /// nor construction data, are skipped. When two definitions share a
    /// display name the first one wins.
    #[must_use]
    pub fn build(world: &World) -> Self {
        let mut entries = BTreeMap::new();

        for (id, unit) in world.units() {
            if unit.display_name.is_empty() {
                debug!(asset = %unit.asset_name, "skipping definition without a display name");
                continue;
            }
            let construction = unit
                .construction
                .clone()
                .filter(|name| world.construction(name).is_some());
            if unit.components.is_empty() && construction.is_none() {
                debug!(unit = %unit.display_name, "skipping definition without usable data");
                continue;
            }
            if entries.contains_key(&unit.display_name) {
                debug!(unit = %unit.display_name, "duplicate display name, keeping first");
                continue;
            }

            let damage_data = unit
                .damage_data
                .clone()
                .filter(|name| world.damage_data(name).is_some());

            let mut capabilities = Capabilities::empty();
            if construction.is_some() {
                capabilities |= Capabilities::CONSTRUCTION;
            }
            if damage_data.is_some() {
                capabilities |= Capabilities::DAMAGE_DATA;
            }
            let components: Vec<_> = unit
                .components
                .iter()
                .enumerate()
                .map(|(index, c)| (c.kind(), index))
                .collect();
            for (kind, _) in &components {
                capabilities |= Capabilities::of(*kind);
            }

            entries.insert(
                unit.display_name.clone(),
                CatalogEntry {
                    name: unit.display_name.clone(),
                    unit: id,
                    target: TargetKey::asset(&unit.asset_name),
                    construction,
                    damage_data,
                    capabilities,
                    components,
                },
            );
        }

        debug!(entities = entries.len(), "catalog built");
        Self { entries }
    }

    /// Looks up an entity by display name.
    #[must_use]
    pub fn lookup_by_name(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    /// All entries ordered by display name.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Entries carrying every capability in `caps`, ordered by display name.
    pub fn with_capabilities(&self, caps: Capabilities) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values().filter(move |e| e.has(caps))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
