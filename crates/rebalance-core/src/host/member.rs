//! Typed member names and values.
//!
//! Every field the engine is allowed to read or write is named by a [`Member`]
//! variant. Components implement [`MemberAccess`] with an explicit `match`, so
//! there is no string-based field lookup anywhere in the engine. The string
//! form returned by [`Member::as_str`] is the name the synchronized override
//! store knows the member by.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// Weapon Slot
// =============================================================================

/// Weapon slot on an entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Slot {
    /// Primary attack channel.
    Primary,
    /// Secondary attack channel.
    Secondary,
}

impl Slot {
    /// Both slots, primary first.
    pub const ALL: [Slot; 2] = [Slot::Primary, Slot::Secondary];

    /// Prefix used for slot-specific configuration keys (`pri_`, `sec_`).
    #[must_use]
    pub const fn config_prefix(self) -> &'static str {
        match self {
            Self::Primary => "pri",
            Self::Secondary => "sec",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "Primary"),
            Self::Secondary => write!(f, "Secondary"),
        }
    }
}

// =============================================================================
// Values
// =============================================================================

/// Storage kind of a member, as understood by the override store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// 32-bit float.
    Float,
    /// 32-bit signed integer.
    Int,
    /// Boolean flag. Never accepted by the override store.
    Bool,
}

/// A member value read from or written to the host.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Float value.
    Float(f32),
    /// Integer value.
    Int(i32),
    /// Boolean value.
    Bool(bool),
}

impl FieldValue {
    /// Returns the storage kind of this value.
    #[must_use]
    pub const fn kind(self) -> ValueKind {
        match self {
            Self::Float(_) => ValueKind::Float,
            Self::Int(_) => ValueKind::Int,
            Self::Bool(_) => ValueKind::Bool,
        }
    }

    /// Returns the value as a float, converting integers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f32(self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(v),
            Self::Int(v) => Some(v as f32),
            Self::Bool(_) => None,
        }
    }

    /// Returns the value as an integer if it is one.
    #[must_use]
    pub const fn as_i32(self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v:.3}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

// =============================================================================
// Member
// =============================================================================

/// Every member the engine may touch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Member {
    // Construction data
    /// Resource cost (int).
    ResourceCost,
    /// Build time in seconds.
    BuildUpTime,
    /// Technology tier of a research item (int, read-only for the engine).
    TechnologyTier,
    /// Minimum team tier required to build (int).
    MinimumTeamTier,
    /// Maximum distance from a base structure at which this may be built.
    MaximumBaseStructureDistance,

    // Damage data
    /// Maximum health.
    Health,

    // Projectile data
    /// Direct impact damage.
    ImpactDamage,
    /// Ricochet damage.
    RicochetDamage,
    /// Maximum splash damage.
    SplashDamageMax,
    /// Penetrating damage.
    PenetratingDamage,
    /// Travel speed, or maximum distance for instant-hit projectiles.
    BaseSpeed,
    /// Lifetime, or visual duration for instant-hit projectiles.
    LifeTime,
    /// Radius within which firing is visible to other players.
    VisibleEventRadius,

    // Turret
    /// Reload time of a turret slot.
    ReloadTime(Slot),
    /// Interval between shots of a turret slot.
    FireInterval(Slot),
    /// Magazine size of a turret slot (int).
    MagazineSize(Slot),
    /// Muzzle spread of a turret slot.
    MuzzleSpread(Slot),
    /// Turret aim distance.
    AimDistance,
    /// Maximum aim distance of an aim-at component.
    AimDistanceMax,

    // Creature attacks (direct path only)
    /// Melee damage of a creature attack.
    AttackDamage(Slot),
    /// Maximum projectile aim distance of a creature attack.
    AttackAimDistMax(Slot),
    /// Projectile spread of a creature attack.
    AttackSpread(Slot),
    /// Distance at which the AI initiates melee.
    AiMeleeDistance,

    // Movement
    /// Generic move speed.
    MoveSpeed,
    /// Flying move speed.
    FlyMoveSpeed,
    /// Sideways scale of flying movement.
    FlyMoveScaleSide,
    /// Infantry walk speed.
    WalkSpeed,
    /// Infantry run speed.
    RunSpeed,
    /// Infantry sprint speed.
    SprintSpeed,
    /// Aircraft forward speed.
    ForwardSpeed,
    /// Aircraft strafe speed.
    StrafeSpeed,
    /// Aircraft turbo speed.
    TurboSpeed,
    /// Infantry jump speed.
    JumpSpeed,
    /// Wheeled vehicle turning circle radius.
    TurningCircleRadius,

    // Sensor
    /// Distance at which targets are acquired.
    TargetingDistance,
    /// Fog-of-war reveal distance.
    FogOfWarViewDistance,

    // Teleport
    /// Teleport cooldown.
    TeleportCooldownTime,
    /// Teleport channel duration.
    TeleportTime,

    // Dispenser
    /// Cooldown between dispensed vehicles.
    DispenseTimeout,

    // AI aiming
    /// Pauses AI aim tracking (bool, direct path only).
    AimPaused,
}

impl Member {
    /// Damage fields scaled by a damage multiplier, in scan order.
    pub const DAMAGE_FIELDS: [Member; 4] = [
        Member::ImpactDamage,
        Member::RicochetDamage,
        Member::SplashDamageMax,
        Member::PenetratingDamage,
    ];

    /// The name the override store knows this member by.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResourceCost => "ResourceCost",
            Self::BuildUpTime => "BuildUpTime",
            Self::TechnologyTier => "TechnologyTier",
            Self::MinimumTeamTier => "MinimumTeamTier",
            Self::MaximumBaseStructureDistance => "MaximumBaseStructureDistance",
            Self::Health => "Health",
            Self::ImpactDamage => "m_fImpactDamage",
            Self::RicochetDamage => "m_fRicochetDamage",
            Self::SplashDamageMax => "m_fSplashDamageMax",
            Self::PenetratingDamage => "m_fPenetratingDamage",
            Self::BaseSpeed => "m_fBaseSpeed",
            Self::LifeTime => "m_fLifeTime",
            Self::VisibleEventRadius => "VisibleEventRadius",
            Self::ReloadTime(Slot::Primary) => "PrimaryReloadTime",
            Self::ReloadTime(Slot::Secondary) => "SecondaryReloadTime",
            Self::FireInterval(Slot::Primary) => "PrimaryFireInterval",
            Self::FireInterval(Slot::Secondary) => "SecondaryFireInterval",
            Self::MagazineSize(Slot::Primary) => "PrimaryMagazineSize",
            Self::MagazineSize(Slot::Secondary) => "SecondaryMagazineSize",
            Self::MuzzleSpread(Slot::Primary) => "PrimaryMuzzleSpread",
            Self::MuzzleSpread(Slot::Secondary) => "SecondaryMuzzleSpread",
            Self::AimDistance => "AimDistance",
            Self::AimDistanceMax => "AimDistanceMax",
            Self::AttackDamage(Slot::Primary) => "AttackPrimary.Damage",
            Self::AttackDamage(Slot::Secondary) => "AttackSecondary.Damage",
            Self::AttackAimDistMax(Slot::Primary) => "AttackPrimary.AttackProjectileAimDistMax",
            Self::AttackAimDistMax(Slot::Secondary) => "AttackSecondary.AttackProjectileAimDistMax",
            Self::AttackSpread(Slot::Primary) => "AttackPrimary.AttackProjectileSpread",
            Self::AttackSpread(Slot::Secondary) => "AttackSecondary.AttackProjectileSpread",
            Self::AiMeleeDistance => "AIMeleeDistance",
            Self::MoveSpeed => "MoveSpeed",
            Self::FlyMoveSpeed => "FlyMoveSpeed",
            Self::FlyMoveScaleSide => "FlyMoveScaleSide",
            Self::WalkSpeed => "WalkSpeed",
            Self::RunSpeed => "RunSpeed",
            Self::SprintSpeed => "SprintSpeed",
            Self::ForwardSpeed => "ForwardSpeed",
            Self::StrafeSpeed => "StrafeSpeed",
            Self::TurboSpeed => "TurboSpeed",
            Self::JumpSpeed => "JumpSpeed",
            Self::TurningCircleRadius => "TurningCircleRadius",
            Self::TargetingDistance => "TargetingDistance",
            Self::FogOfWarViewDistance => "FogOfWarViewDistance",
            Self::TeleportCooldownTime => "TeleportCooldownTime",
            Self::TeleportTime => "TeleportTime",
            Self::DispenseTimeout => "DispenseTimeout",
            Self::AimPaused => "AimPaused",
        }
    }

    /// Whether the override store can carry this member.
    ///
    /// Creature attack internals and AI switches are only reachable by
    /// direct mutation.
    #[must_use]
    pub const fn is_syncable(self) -> bool {
        !matches!(
            self,
            Self::AttackDamage(_)
                | Self::AttackAimDistMax(_)
                | Self::AttackSpread(_)
                | Self::AiMeleeDistance
                | Self::AimPaused
                | Self::TechnologyTier
        )
    }

    /// Storage kind of this member.
    #[must_use]
    pub const fn kind(self) -> ValueKind {
        match self {
            Self::ResourceCost
            | Self::TechnologyTier
            | Self::MinimumTeamTier
            | Self::MagazineSize(_) => ValueKind::Int,
            Self::AimPaused => ValueKind::Bool,
            _ => ValueKind::Float,
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a member name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown member name '{0}'")]
pub struct UnknownMember(pub String);

impl FromStr for Member {
    type Err = UnknownMember;

    /// Parses the projectile member names accepted in per-projectile overrides.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let member = match s {
            "m_fImpactDamage" => Self::ImpactDamage,
            "m_fRicochetDamage" => Self::RicochetDamage,
            "m_fSplashDamageMax" => Self::SplashDamageMax,
            "m_fPenetratingDamage" => Self::PenetratingDamage,
            "m_fBaseSpeed" => Self::BaseSpeed,
            "m_fLifeTime" => Self::LifeTime,
            "VisibleEventRadius" => Self::VisibleEventRadius,
            other => return Err(UnknownMember(other.to_string())),
        };
        Ok(member)
    }
}

// =============================================================================
// Member Access
// =============================================================================

/// Typed access to the members a component or asset exposes.
///
/// Implementations match explicitly on the members they own and return
/// `None`/`false` for everything else.
pub trait MemberAccess {
    /// Reads a member, or `None` if this value does not carry it.
    fn member(&self, member: Member) -> Option<FieldValue>;

    /// Writes a member. Returns `false` if the member is absent or the value
    /// kind does not match.
    fn set_member(&mut self, member: Member, value: FieldValue) -> bool;

    /// All members this value currently exposes.
    fn members(&self) -> Vec<Member>;
}

/// Writes `value` into a float slot if the kinds match.
pub(crate) fn write_f32(slot: &mut f32, value: FieldValue) -> bool {
    match value {
        FieldValue::Float(v) => {
            *slot = v;
            true
        }
        _ => false,
    }
}

/// Writes `value` into an integer slot if the kinds match.
pub(crate) fn write_i32(slot: &mut i32, value: FieldValue) -> bool {
    match value {
        FieldValue::Int(v) => {
            *slot = v;
            true
        }
        _ => false,
    }
}
