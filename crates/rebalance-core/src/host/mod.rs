//! Host simulation model.
//!
//! The engine runs against a host that owns entity definitions, shared data
//! assets, teams and live instances. This module provides that model with
//! typed access to every member the engine needs:
//!
//! - [`World`]: definitions, shared assets, teams and live units
//! - [`UnitDefinition`]: one prefab-level entity, identified by display name
//! - [`FieldPath`]: where a member lives (a shared asset or a unit component)
//! - [`Session`]: world + tier events + connected participants
//!
//! # Example
//!
//! ```
//! use rebalance_core::host::{World, UnitDefinition, FieldPath};
//! use rebalance_core::host::components::{Component, Sensor};
//! use rebalance_core::host::member::{Member, FieldValue};
//!
//! let mut world = World::new();
//! let scout = world.add_unit(
//!     UnitDefinition::new("Scout", "Scout_Prefab").with_component(Component::Sensor(Sensor {
//!         targeting_distance: 120.0,
//!         fog_of_war_view_distance: 90.0,
//!     })),
//! );
//!
//! let path = FieldPath::Component { unit: scout, index: 0 };
//! assert_eq!(world.read(&path, Member::TargetingDistance), Some(FieldValue::Float(120.0)));
//! ```

pub mod components;
pub mod events;
pub mod member;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use components::{Component, ConstructionData, DamageData, ProjectileData};
use events::{TierChanged, TierEvents};
use member::{FieldValue, Member, MemberAccess};

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name($inner);

        impl $name {
            /// Creates an identifier from its raw value.
            #[must_use]
            pub const fn new(id: $inner) -> Self {
                Self(id)
            }

            /// Returns the raw value.
            #[must_use]
            pub const fn raw(self) -> $inner {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Index of a unit definition inside a [`World`].
    UnitId(usize)
);
id_newtype!(
    /// Identifier of a team.
    TeamId(u32)
);
id_newtype!(
    /// Identifier of a connected participant.
    ParticipantId(u64)
);
id_newtype!(
    /// Identifier of a live unit instance.
    InstanceId(u64)
);

// =============================================================================
// Unit Definition
// =============================================================================

/// A prefab-level entity definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    /// Unique display name; the key every configuration entry uses.
    pub display_name: String,
    /// Internal asset name; prefab-level overrides target `A:{asset_name}.asset`.
    pub asset_name: String,
    /// Name of the construction-data asset, if buildable.
    #[serde(default)]
    pub construction: Option<String>,
    /// Name of the damage-data asset, if damageable.
    #[serde(default)]
    pub damage_data: Option<String>,
    /// Components on the prefab.
    #[serde(default)]
    pub components: Vec<Component>,
}

impl UnitDefinition {
    /// Creates a definition without components or asset references.
    #[must_use]
    pub fn new(display_name: impl Into<String>, asset_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            asset_name: asset_name.into(),
            construction: None,
            damage_data: None,
            components: Vec::new(),
        }
    }

    /// Adds a component.
    #[must_use]
    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    /// Sets the construction-data reference.
    #[must_use]
    pub fn with_construction(mut self, asset: impl Into<String>) -> Self {
        self.construction = Some(asset.into());
        self
    }

    /// Sets the damage-data reference.
    #[must_use]
    pub fn with_damage_data(mut self, asset: impl Into<String>) -> Self {
        self.damage_data = Some(asset.into());
        self
    }
}

/// A live instance of a unit definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveUnit {
    /// Instance identifier.
    pub id: InstanceId,
    /// Display name of the definition it was spawned from.
    pub unit_name: String,
    /// Owning team.
    pub team: TeamId,
    /// Components, cloned from the definition at spawn time.
    pub components: Vec<Component>,
}

// =============================================================================
// Field Path
// =============================================================================

/// Where a member lives.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldPath {
    /// A construction-data asset.
    Construction(String),
    /// A damage-data asset.
    DamageData(String),
    /// A projectile asset.
    Projectile(String),
    /// Component `index` of unit definition `unit`.
    Component {
        /// Owning definition.
        unit: UnitId,
        /// Index into [`UnitDefinition::components`].
        index: usize,
    },
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construction(name) => write!(f, "construction:{name}"),
            Self::DamageData(name) => write!(f, "damage:{name}"),
            Self::Projectile(name) => write!(f, "projectile:{name}"),
            Self::Component { unit, index } => write!(f, "unit:{unit}/{index}"),
        }
    }
}

// =============================================================================
// World
// =============================================================================

/// Everything the host simulation knows about entities and shared assets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct World {
    units: Vec<UnitDefinition>,
    construction: BTreeMap<String, ConstructionData>,
    damage_data: BTreeMap<String, DamageData>,
    projectiles: BTreeMap<String, ProjectileData>,
    teams: BTreeMap<TeamId, i32>,
    live: Vec<LiveUnit>,
    next_instance: u64,
}

impl World {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Definitions and assets
    // -------------------------------------------------------------------------

    /// Adds a unit definition.
    pub fn add_unit(&mut self, unit: UnitDefinition) -> UnitId {
        self.units.push(unit);
        UnitId::new(self.units.len() - 1)
    }

    /// Returns every unit definition with its id.
    pub fn units(&self) -> impl Iterator<Item = (UnitId, &UnitDefinition)> {
        self.units
            .iter()
            .enumerate()
            .map(|(i, unit)| (UnitId::new(i), unit))
    }

    /// Returns a unit definition.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&UnitDefinition> {
        self.units.get(id.raw())
    }

    /// Adds or replaces a construction-data asset.
    pub fn insert_construction(&mut self, name: impl Into<String>, data: ConstructionData) {
        self.construction.insert(name.into(), data);
    }

    /// Returns a construction-data asset.
    #[must_use]
    pub fn construction(&self, name: &str) -> Option<&ConstructionData> {
        self.construction.get(name)
    }

    /// Adds or replaces a damage-data asset.
    pub fn insert_damage_data(&mut self, name: impl Into<String>, data: DamageData) {
        self.damage_data.insert(name.into(), data);
    }

    /// Returns a damage-data asset.
    #[must_use]
    pub fn damage_data(&self, name: &str) -> Option<&DamageData> {
        self.damage_data.get(name)
    }

    /// Names of every damage-data asset.
    pub fn damage_data_names(&self) -> impl Iterator<Item = &str> {
        self.damage_data.keys().map(String::as_str)
    }

    /// Adds or replaces a projectile asset.
    pub fn insert_projectile(&mut self, name: impl Into<String>, data: ProjectileData) {
        self.projectiles.insert(name.into(), data);
    }

    /// Returns a projectile asset.
    #[must_use]
    pub fn projectile(&self, name: &str) -> Option<&ProjectileData> {
        self.projectiles.get(name)
    }

    /// Returns every projectile asset, ordered by name.
    pub fn projectiles(&self) -> impl Iterator<Item = (&str, &ProjectileData)> {
        self.projectiles.iter().map(|(k, v)| (k.as_str(), v))
    }

    // -------------------------------------------------------------------------
    // Typed member access
    // -------------------------------------------------------------------------

    fn target(&self, path: &FieldPath) -> Option<&dyn MemberAccess> {
        match path {
            FieldPath::Construction(name) => {
                self.construction.get(name).map(|d| d as &dyn MemberAccess)
            }
            FieldPath::DamageData(name) => {
                self.damage_data.get(name).map(|d| d as &dyn MemberAccess)
            }
            FieldPath::Projectile(name) => {
                self.projectiles.get(name).map(|d| d as &dyn MemberAccess)
            }
            FieldPath::Component { unit, index } => self
                .units
                .get(unit.raw())
                .and_then(|u| u.components.get(*index))
                .map(|c| c as &dyn MemberAccess),
        }
    }

    fn target_mut(&mut self, path: &FieldPath) -> Option<&mut dyn MemberAccess> {
        match path {
            FieldPath::Construction(name) => self
                .construction
                .get_mut(name)
                .map(|d| d as &mut dyn MemberAccess),
            FieldPath::DamageData(name) => self
                .damage_data
                .get_mut(name)
                .map(|d| d as &mut dyn MemberAccess),
            FieldPath::Projectile(name) => self
                .projectiles
                .get_mut(name)
                .map(|d| d as &mut dyn MemberAccess),
            FieldPath::Component { unit, index } => self
                .units
                .get_mut(unit.raw())
                .and_then(|u| u.components.get_mut(*index))
                .map(|c| c as &mut dyn MemberAccess),
        }
    }

    /// Reads a member at `path`.
    #[must_use]
    pub fn read(&self, path: &FieldPath, member: Member) -> Option<FieldValue> {
        self.target(path)?.member(member)
    }

    /// Writes a member at `path`. Returns `false` if the path or member does
    /// not exist or the value kind does not match.
    pub fn write(&mut self, path: &FieldPath, member: Member, value: FieldValue) -> bool {
        self.target_mut(path)
            .is_some_and(|target| target.set_member(member, value))
    }

    // -------------------------------------------------------------------------
    // Teams
    // -------------------------------------------------------------------------

    /// Adds a team at `tier`.
    pub fn add_team(&mut self, team: TeamId, tier: i32) {
        self.teams.insert(team, tier);
    }

    /// Returns a team's current tier.
    #[must_use]
    pub fn team_tier(&self, team: TeamId) -> Option<i32> {
        self.teams.get(&team).copied()
    }

    /// Sets a team's tier and returns the previous one.
    pub fn set_team_tier(&mut self, team: TeamId, tier: i32) -> Option<i32> {
        self.teams.get_mut(&team).map(|t| std::mem::replace(t, tier))
    }

    // -------------------------------------------------------------------------
    // Live instances
    // -------------------------------------------------------------------------

    /// Spawns a live instance of the named definition.
    pub fn spawn_live(&mut self, unit_name: &str, team: TeamId) -> Option<InstanceId> {
        let components = self
            .units
            .iter()
            .find(|u| u.display_name == unit_name)?
            .components
            .clone();
        let id = InstanceId::new(self.next_instance);
        self.next_instance += 1;
        self.live.push(LiveUnit {
            id,
            unit_name: unit_name.to_string(),
            team,
            components,
        });
        Some(id)
    }

    /// Returns every live instance.
    #[must_use]
    pub fn live_units(&self) -> &[LiveUnit] {
        &self.live
    }

    /// Returns every live instance mutably.
    pub fn live_units_mut(&mut self) -> &mut [LiveUnit] {
        &mut self.live
    }

    /// Returns a live instance.
    #[must_use]
    pub fn live_unit(&self, id: InstanceId) -> Option<&LiveUnit> {
        self.live.iter().find(|l| l.id == id)
    }

    /// Zeroes the remaining cooldown on every live dispenser owned by `team`
    /// that hands out `unit_name`. Returns how many were reset.
    pub fn reset_dispenser_timeouts(&mut self, team: TeamId, unit_name: &str) -> usize {
        let mut reset = 0;
        for live in self.live.iter_mut().filter(|l| l.team == team) {
            for dispenser in live
                .components
                .iter_mut()
                .filter_map(Component::as_dispenser_mut)
                .filter(|d| d.dispensed_unit.eq_ignore_ascii_case(unit_name))
            {
                dispenser.local_timeout = 0.0;
                reset += 1;
            }
        }
        reset
    }
}

// =============================================================================
// Participants and Session
// =============================================================================

/// A connected participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Participant identifier.
    pub id: ParticipantId,
    /// Display name.
    pub name: String,
    /// Set for the server's own participant, which never needs a sync.
    #[serde(default)]
    pub is_server: bool,
}

impl Participant {
    /// Creates a remote participant.
    #[must_use]
    pub fn remote(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(id),
            name: name.into(),
            is_server: false,
        }
    }

    /// Creates the server's own participant.
    #[must_use]
    pub fn server(id: u64) -> Self {
        Self {
            id: ParticipantId::new(id),
            name: "server".to_string(),
            is_server: true,
        }
    }
}

/// A running session: the world, its tier events and who is connected.
#[derive(Debug, Default)]
pub struct Session {
    /// Simulation state.
    pub world: World,
    /// Tier change observers.
    pub events: TierEvents,
    participants: Vec<Participant>,
}

impl Session {
    /// Creates a session over `world` with nobody connected.
    #[must_use]
    pub fn new(world: World) -> Self {
        Self {
            world,
            events: TierEvents::new(),
            participants: Vec::new(),
        }
    }

    /// Adds a participant.
    pub fn join(&mut self, participant: Participant) {
        self.participants.push(participant);
    }

    /// Removes a participant.
    pub fn leave(&mut self, id: ParticipantId) {
        self.participants.retain(|p| p.id != id);
    }

    /// Connected participants.
    #[must_use]
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Changes a team's tier and notifies observers. Returns the event, or
    /// `None` if the team does not exist.
    pub fn set_team_tier(&mut self, team: TeamId, tier: i32) -> Option<TierChanged> {
        let old_tier = self.world.set_team_tier(team, tier)?;
        let event = TierChanged {
            team,
            old_tier,
            new_tier: tier,
        };
        self.events.publish(&event, &mut self.world);
        Some(event)
    }
}
