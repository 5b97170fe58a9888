//! The configuration overlay: resolved per-category value maps.
//!
//! Each adjustment [`Category`] owns a map from entity name to value. Slotted
//! categories additionally carry primary/secondary maps. Values that would
//! not change anything (multipliers within [`EPSILON`] of 1, negative
//! absolutes) are never recorded.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::host::member::{Member, Slot};

/// Tolerance below which a multiplier counts as identity.
pub const EPSILON: f32 = 1e-3;

/// Whether a multiplier deviates from identity enough to be written.
#[must_use]
pub fn is_effective(multiplier: f32) -> bool {
    (multiplier - 1.0).abs() > EPSILON
}

// =============================================================================
// Category
// =============================================================================

/// How a category's values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    /// Scales a baseline. Identity is 1.0.
    Multiplier,
    /// Replaces a baseline. Identity is "unset".
    Absolute,
}

/// One adjustment category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// `cost_mult`
    Cost,
    /// `build_time_mult`
    BuildTime,
    /// `health_mult`
    Health,
    /// `damage_mult` (slotted)
    Damage,
    /// `range_mult` (slotted)
    Range,
    /// `proj_speed_mult` (slotted)
    ProjectileSpeed,
    /// `proj_lifetime_mult` (slotted)
    ProjectileLifetime,
    /// `reload_time_mult` (slotted)
    ReloadTime,
    /// `accuracy_mult` (slotted)
    Accuracy,
    /// `magazine_mult` (slotted)
    Magazine,
    /// `fire_rate_mult` (slotted)
    FireRate,
    /// `move_speed_mult`
    MoveSpeed,
    /// `turbo_speed_mult`
    TurboSpeed,
    /// `strafe_speed_mult`
    StrafeSpeed,
    /// `fly_speed_mult`
    FlySpeed,
    /// `turn_radius_mult`
    TurnRadius,
    /// `jump_speed_mult`
    JumpSpeed,
    /// `visible_event_radius_mult`
    VisibleEventRadius,
    /// `min_tier`
    MinTier,
    /// `build_radius`
    BuildRadius,
    /// `target_distance`
    TargetDistance,
    /// `fow_distance`
    FogOfWarDistance,
    /// `dispense_timeout` (global)
    DispenseTimeout,
    /// `_teleport.cooldown` (global)
    TeleportCooldown,
    /// `_teleport.duration` (global)
    TeleportDuration,
}

impl Category {
    /// Every category.
    pub const ALL: [Category; 25] = [
        Category::Cost,
        Category::BuildTime,
        Category::Health,
        Category::Damage,
        Category::Range,
        Category::ProjectileSpeed,
        Category::ProjectileLifetime,
        Category::ReloadTime,
        Category::Accuracy,
        Category::Magazine,
        Category::FireRate,
        Category::MoveSpeed,
        Category::TurboSpeed,
        Category::StrafeSpeed,
        Category::FlySpeed,
        Category::TurnRadius,
        Category::JumpSpeed,
        Category::VisibleEventRadius,
        Category::MinTier,
        Category::BuildRadius,
        Category::TargetDistance,
        Category::FogOfWarDistance,
        Category::DispenseTimeout,
        Category::TeleportCooldown,
        Category::TeleportDuration,
    ];

    /// Per-unit configuration key, without slot prefix.
    #[must_use]
    pub const fn config_key(self) -> &'static str {
        match self {
            Self::Cost => "cost_mult",
            Self::BuildTime => "build_time_mult",
            Self::Health => "health_mult",
            Self::Damage => "damage_mult",
            Self::Range => "range_mult",
            Self::ProjectileSpeed => "proj_speed_mult",
            Self::ProjectileLifetime => "proj_lifetime_mult",
            Self::ReloadTime => "reload_time_mult",
            Self::Accuracy => "accuracy_mult",
            Self::Magazine => "magazine_mult",
            Self::FireRate => "fire_rate_mult",
            Self::MoveSpeed => "move_speed_mult",
            Self::TurboSpeed => "turbo_speed_mult",
            Self::StrafeSpeed => "strafe_speed_mult",
            Self::FlySpeed => "fly_speed_mult",
            Self::TurnRadius => "turn_radius_mult",
            Self::JumpSpeed => "jump_speed_mult",
            Self::VisibleEventRadius => "visible_event_radius_mult",
            Self::MinTier => "min_tier",
            Self::BuildRadius => "build_radius",
            Self::TargetDistance => "target_distance",
            Self::FogOfWarDistance => "fow_distance",
            Self::DispenseTimeout => "dispense_timeout",
            Self::TeleportCooldown => "cooldown",
            Self::TeleportDuration => "duration",
        }
    }

    /// Multiplier or absolute.
    #[must_use]
    pub const fn kind(self) -> CategoryKind {
        match self {
            Self::MinTier
            | Self::BuildRadius
            | Self::TargetDistance
            | Self::FogOfWarDistance
            | Self::DispenseTimeout
            | Self::TeleportCooldown
            | Self::TeleportDuration => CategoryKind::Absolute,
            _ => CategoryKind::Multiplier,
        }
    }

    /// Whether `pri_`/`sec_` keys are accepted for this category.
    #[must_use]
    pub const fn is_slotted(self) -> bool {
        matches!(
            self,
            Self::Damage
                | Self::Range
                | Self::ProjectileSpeed
                | Self::ProjectileLifetime
                | Self::ReloadTime
                | Self::Accuracy
                | Self::Magazine
                | Self::FireRate
        )
    }

    /// Whether the value applies to every entity rather than the one it is
    /// listed under.
    #[must_use]
    pub const fn is_global(self) -> bool {
        matches!(
            self,
            Self::DispenseTimeout | Self::TeleportCooldown | Self::TeleportDuration
        )
    }

    /// Whether the value is stored as an integer in the document.
    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            Self::MinTier | Self::BuildRadius | Self::TargetDistance | Self::FogOfWarDistance
        )
    }

    /// Parses a per-unit key such as `pri_damage_mult` into its category and
    /// slot. Pseudo-unit keys (`cooldown`, `duration`) are not accepted.
    #[must_use]
    pub fn parse_key(key: &str) -> Option<(Category, Option<Slot>)> {
        let (slot, rest) = if let Some(rest) = key.strip_prefix("pri_") {
            (Some(Slot::Primary), rest)
        } else if let Some(rest) = key.strip_prefix("sec_") {
            (Some(Slot::Secondary), rest)
        } else {
            (None, key)
        };
        let category = Self::ALL
            .into_iter()
            .filter(|c| !matches!(c, Self::TeleportCooldown | Self::TeleportDuration))
            .find(|c| c.config_key() == rest)?;
        if slot.is_some() && !category.is_slotted() {
            return None;
        }
        Some((category, slot))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

// =============================================================================
// Overlay
// =============================================================================

/// Values of one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryValues {
    /// Shared (slot-independent) values.
    pub shared: BTreeMap<String, f32>,
    /// Primary-slot values.
    pub primary: BTreeMap<String, f32>,
    /// Secondary-slot values.
    pub secondary: BTreeMap<String, f32>,
}

impl CategoryValues {
    fn map(&self, slot: Option<Slot>) -> &BTreeMap<String, f32> {
        match slot {
            None => &self.shared,
            Some(Slot::Primary) => &self.primary,
            Some(Slot::Secondary) => &self.secondary,
        }
    }

    fn map_mut(&mut self, slot: Option<Slot>) -> &mut BTreeMap<String, f32> {
        match slot {
            None => &mut self.shared,
            Some(Slot::Primary) => &mut self.primary,
            Some(Slot::Secondary) => &mut self.secondary,
        }
    }

    fn is_empty(&self) -> bool {
        self.shared.is_empty() && self.primary.is_empty() && self.secondary.is_empty()
    }
}

/// Absolute per-projectile overrides: unit → projectile → member → value.
pub type ProjectileOverrides = BTreeMap<String, BTreeMap<String, BTreeMap<Member, f32>>>;

/// All configured values, ready for resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    categories: BTreeMap<Category, CategoryValues>,
    globals: BTreeMap<Category, f32>,
    tech_tiers: BTreeMap<i32, f32>,
    projectiles: ProjectileOverrides,
}

impl Overlay {
    /// Creates an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a value for `entity`. Identity multipliers and negative
    /// absolutes are dropped. Global categories ignore `entity` and `slot`.
    ///
    /// Returns whether the value was recorded.
    pub fn insert(&mut self, category: Category, entity: &str, slot: Option<Slot>, value: f32) -> bool {
        let keep = match category.kind() {
            CategoryKind::Multiplier => is_effective(value),
            CategoryKind::Absolute => value >= 0.0,
        };
        if !keep || !value.is_finite() {
            return false;
        }
        if category.is_global() {
            self.globals.insert(category, value);
            return true;
        }
        let slot = if category.is_slotted() { slot } else { None };
        self.categories
            .entry(category)
            .or_default()
            .map_mut(slot)
            .insert(entity.to_string(), value);
        true
    }

    /// Exact lookup under one key.
    #[must_use]
    pub fn get(&self, category: Category, entity: &str, slot: Option<Slot>) -> Option<f32> {
        if category.is_global() {
            return self.globals.get(&category).copied();
        }
        self.categories
            .get(&category)?
            .map(slot)
            .get(entity)
            .copied()
    }

    /// Whether any value is configured for `category`.
    #[must_use]
    pub fn has_category(&self, category: Category) -> bool {
        if category.is_global() {
            return self.globals.contains_key(&category);
        }
        self.categories
            .get(&category)
            .is_some_and(|values| !values.is_empty())
    }

    /// Shared-key entries of a non-slotted category.
    pub fn shared_entries(&self, category: Category) -> impl Iterator<Item = (&str, f32)> {
        self.categories
            .get(&category)
            .into_iter()
            .flat_map(|values| values.shared.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    /// Sets the build time for a technology tier.
    pub fn insert_tech_tier(&mut self, tier: i32, seconds: f32) {
        self.tech_tiers.insert(tier, seconds);
    }

    /// Configured build time for a technology tier.
    #[must_use]
    pub fn tech_tier_time(&self, tier: i32) -> Option<f32> {
        self.tech_tiers.get(&tier).copied()
    }

    /// Whether any technology tier time is configured.
    #[must_use]
    pub fn has_tech_tiers(&self) -> bool {
        !self.tech_tiers.is_empty()
    }

    /// Records an absolute override for one member of a projectile, scoped
    /// to the unit that fires it.
    pub fn insert_projectile_override(&mut self, unit: &str, projectile: &str, member: Member, value: f32) {
        self.projectiles
            .entry(unit.to_string())
            .or_default()
            .entry(projectile.to_string())
            .or_default()
            .insert(member, value);
    }

    /// Projectile overrides for `unit`'s projectile.
    #[must_use]
    pub fn projectile_overrides(&self, unit: &str, projectile: &str) -> Option<&BTreeMap<Member, f32>> {
        self.projectiles.get(unit)?.get(projectile)
    }

    /// Every projectile override scoped to `unit`, ordered by projectile name.
    pub fn projectile_overrides_for(&self, unit: &str) -> impl Iterator<Item = (&str, &BTreeMap<Member, f32>)> {
        self.projectiles
            .get(unit)
            .into_iter()
            .flat_map(|p| p.iter().map(|(name, fields)| (name.as_str(), fields)))
    }

    /// Whether any unit has projectile overrides.
    #[must_use]
    pub fn has_any_projectile_overrides(&self) -> bool {
        self.projectiles.values().any(|p| !p.is_empty())
    }

    /// Whether `unit` has any projectile overrides.
    #[must_use]
    pub fn has_projectile_overrides(&self, unit: &str) -> bool {
        self.projectiles.get(unit).is_some_and(|p| !p.is_empty())
    }

    /// Whether no value of any kind is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.values().all(CategoryValues::is_empty)
            && self.globals.is_empty()
            && self.tech_tiers.is_empty()
            && self.projectiles.is_empty()
    }
}
