//! Component and shared-asset types of the host model.
//!
//! Shared assets ([`ConstructionData`], [`DamageData`], [`ProjectileData`]) are
//! owned by the [`World`](super::World) and referenced by name from unit
//! definitions. Components live on a [`UnitDefinition`](super::UnitDefinition)
//! (prefab level) and are cloned onto live instances when they spawn.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::member::{write_f32, write_i32, FieldValue, Member, MemberAccess, Slot};

// =============================================================================
// Shared Assets
// =============================================================================

/// Construction parameters of a buildable unit, structure or research item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionData {
    /// Resource cost.
    pub resource_cost: i32,
    /// Build time in seconds.
    pub build_up_time: f32,
    /// Technology tier this item researches (0 for ordinary units).
    #[serde(default)]
    pub technology_tier: i32,
    /// Minimum team tier required to build.
    #[serde(default)]
    pub minimum_team_tier: i32,
    /// Maximum distance from a base structure.
    #[serde(default)]
    pub maximum_base_structure_distance: f32,
}

impl MemberAccess for ConstructionData {
    fn member(&self, member: Member) -> Option<FieldValue> {
        match member {
            Member::ResourceCost => Some(FieldValue::Int(self.resource_cost)),
            Member::BuildUpTime => Some(FieldValue::Float(self.build_up_time)),
            Member::TechnologyTier => Some(FieldValue::Int(self.technology_tier)),
            Member::MinimumTeamTier => Some(FieldValue::Int(self.minimum_team_tier)),
            Member::MaximumBaseStructureDistance => {
                Some(FieldValue::Float(self.maximum_base_structure_distance))
            }
            _ => None,
        }
    }

    fn set_member(&mut self, member: Member, value: FieldValue) -> bool {
        match member {
            Member::ResourceCost => write_i32(&mut self.resource_cost, value),
            Member::BuildUpTime => write_f32(&mut self.build_up_time, value),
            Member::MinimumTeamTier => write_i32(&mut self.minimum_team_tier, value),
            Member::MaximumBaseStructureDistance => {
                write_f32(&mut self.maximum_base_structure_distance, value)
            }
            _ => false,
        }
    }

    fn members(&self) -> Vec<Member> {
        vec![
            Member::ResourceCost,
            Member::BuildUpTime,
            Member::MinimumTeamTier,
            Member::MaximumBaseStructureDistance,
        ]
    }
}

/// Damage-manager data: the health pool shared by every unit that uses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageData {
    /// Maximum health.
    pub health: f32,
}

impl MemberAccess for DamageData {
    fn member(&self, member: Member) -> Option<FieldValue> {
        (member == Member::Health).then_some(FieldValue::Float(self.health))
    }

    fn set_member(&mut self, member: Member, value: FieldValue) -> bool {
        member == Member::Health && write_f32(&mut self.health, value)
    }

    fn members(&self) -> Vec<Member> {
        vec![Member::Health]
    }
}

/// A projectile definition, frequently shared between several weapons.
///
/// For ordinary projectiles the effective range is `base_speed * life_time`.
/// For instant-hit projectiles `base_speed` is the maximum hit distance and
/// `life_time` only controls how long the visual lasts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileData {
    /// Direct impact damage.
    pub impact_damage: f32,
    /// Ricochet damage.
    pub ricochet_damage: f32,
    /// Maximum splash damage.
    pub splash_damage_max: f32,
    /// Penetrating damage.
    pub penetrating_damage: f32,
    /// Travel speed (or max distance for instant-hit).
    pub base_speed: f32,
    /// Lifetime in seconds (or visual duration for instant-hit).
    pub life_time: f32,
    /// Radius within which firing is visible.
    pub visible_event_radius: f32,
    /// Whether this projectile resolves as a ray.
    pub instant_hit: bool,
}

impl ProjectileData {
    /// Effective range of a travelling projectile.
    #[must_use]
    pub fn range(&self) -> f32 {
        if self.instant_hit {
            self.base_speed
        } else {
            self.base_speed * self.life_time
        }
    }
}

impl MemberAccess for ProjectileData {
    fn member(&self, member: Member) -> Option<FieldValue> {
        let value = match member {
            Member::ImpactDamage => self.impact_damage,
            Member::RicochetDamage => self.ricochet_damage,
            Member::SplashDamageMax => self.splash_damage_max,
            Member::PenetratingDamage => self.penetrating_damage,
            Member::BaseSpeed => self.base_speed,
            Member::LifeTime => self.life_time,
            Member::VisibleEventRadius => self.visible_event_radius,
            _ => return None,
        };
        Some(FieldValue::Float(value))
    }

    fn set_member(&mut self, member: Member, value: FieldValue) -> bool {
        let slot = match member {
            Member::ImpactDamage => &mut self.impact_damage,
            Member::RicochetDamage => &mut self.ricochet_damage,
            Member::SplashDamageMax => &mut self.splash_damage_max,
            Member::PenetratingDamage => &mut self.penetrating_damage,
            Member::BaseSpeed => &mut self.base_speed,
            Member::LifeTime => &mut self.life_time,
            Member::VisibleEventRadius => &mut self.visible_event_radius,
            _ => return false,
        };
        write_f32(slot, value)
    }

    fn members(&self) -> Vec<Member> {
        vec![
            Member::ImpactDamage,
            Member::RicochetDamage,
            Member::SplashDamageMax,
            Member::PenetratingDamage,
            Member::BaseSpeed,
            Member::LifeTime,
            Member::VisibleEventRadius,
        ]
    }
}

// =============================================================================
// Components
// =============================================================================

/// One weapon slot of a turret.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TurretSlot {
    /// Name of the projectile asset this slot fires.
    pub projectile: Option<String>,
    /// Reload time in seconds.
    pub reload_time: f32,
    /// Interval between shots in seconds.
    pub fire_interval: f32,
    /// Rounds per magazine.
    pub magazine_size: i32,
    /// Muzzle spread.
    pub muzzle_spread: f32,
}

/// A vehicle or structure turret with two weapon slots.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Turret {
    /// Primary weapon.
    pub primary: TurretSlot,
    /// Secondary weapon.
    pub secondary: TurretSlot,
    /// Aim distance shared by both slots.
    pub aim_distance: f32,
}

impl Turret {
    /// Returns the slot for `slot`.
    #[must_use]
    pub fn slot(&self, slot: Slot) -> &TurretSlot {
        match slot {
            Slot::Primary => &self.primary,
            Slot::Secondary => &self.secondary,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut TurretSlot {
        match slot {
            Slot::Primary => &mut self.primary,
            Slot::Secondary => &mut self.secondary,
        }
    }
}

impl MemberAccess for Turret {
    fn member(&self, member: Member) -> Option<FieldValue> {
        match member {
            Member::ReloadTime(s) => Some(FieldValue::Float(self.slot(s).reload_time)),
            Member::FireInterval(s) => Some(FieldValue::Float(self.slot(s).fire_interval)),
            Member::MagazineSize(s) => Some(FieldValue::Int(self.slot(s).magazine_size)),
            Member::MuzzleSpread(s) => Some(FieldValue::Float(self.slot(s).muzzle_spread)),
            Member::AimDistance => Some(FieldValue::Float(self.aim_distance)),
            _ => None,
        }
    }

    fn set_member(&mut self, member: Member, value: FieldValue) -> bool {
        match member {
            Member::ReloadTime(s) => write_f32(&mut self.slot_mut(s).reload_time, value),
            Member::FireInterval(s) => write_f32(&mut self.slot_mut(s).fire_interval, value),
            Member::MagazineSize(s) => write_i32(&mut self.slot_mut(s).magazine_size, value),
            Member::MuzzleSpread(s) => write_f32(&mut self.slot_mut(s).muzzle_spread, value),
            Member::AimDistance => write_f32(&mut self.aim_distance, value),
            _ => false,
        }
    }

    fn members(&self) -> Vec<Member> {
        let mut members = vec![Member::AimDistance];
        for slot in Slot::ALL {
            members.extend([
                Member::ReloadTime(slot),
                Member::FireInterval(slot),
                Member::MagazineSize(slot),
                Member::MuzzleSpread(slot),
            ]);
        }
        members
    }
}

/// A creature attack: ranged when it references a projectile, melee otherwise.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatureAttack {
    /// Projectile asset for ranged attacks.
    pub projectile: Option<String>,
    /// Melee damage.
    pub damage: f32,
    /// Maximum projectile aim distance.
    pub aim_dist_max: f32,
    /// Projectile spread.
    pub spread: f32,
}

/// A creature body: attacks plus ground/flying movement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Creature {
    /// Primary attack.
    pub primary: Option<CreatureAttack>,
    /// Secondary attack.
    pub secondary: Option<CreatureAttack>,
    /// Ground move speed.
    pub move_speed: f32,
    /// Flying move speed.
    pub fly_move_speed: f32,
    /// Sideways scale of flying movement.
    pub fly_move_scale_side: f32,
    /// Distance at which the AI initiates melee.
    pub ai_melee_distance: f32,
}

impl Creature {
    /// Returns the attack in `slot`, if any.
    #[must_use]
    pub fn attack(&self, slot: Slot) -> Option<&CreatureAttack> {
        match slot {
            Slot::Primary => self.primary.as_ref(),
            Slot::Secondary => self.secondary.as_ref(),
        }
    }

    fn attack_mut(&mut self, slot: Slot) -> Option<&mut CreatureAttack> {
        match slot {
            Slot::Primary => self.primary.as_mut(),
            Slot::Secondary => self.secondary.as_mut(),
        }
    }
}

impl MemberAccess for Creature {
    fn member(&self, member: Member) -> Option<FieldValue> {
        let value = match member {
            Member::AttackDamage(s) => self.attack(s)?.damage,
            Member::AttackAimDistMax(s) => self.attack(s)?.aim_dist_max,
            Member::AttackSpread(s) => self.attack(s)?.spread,
            Member::MoveSpeed => self.move_speed,
            Member::FlyMoveSpeed => self.fly_move_speed,
            Member::FlyMoveScaleSide => self.fly_move_scale_side,
            Member::AiMeleeDistance => self.ai_melee_distance,
            _ => return None,
        };
        Some(FieldValue::Float(value))
    }

    fn set_member(&mut self, member: Member, value: FieldValue) -> bool {
        let slot = match member {
            Member::AttackDamage(s) => match self.attack_mut(s) {
                Some(attack) => &mut attack.damage,
                None => return false,
            },
            Member::AttackAimDistMax(s) => match self.attack_mut(s) {
                Some(attack) => &mut attack.aim_dist_max,
                None => return false,
            },
            Member::AttackSpread(s) => match self.attack_mut(s) {
                Some(attack) => &mut attack.spread,
                None => return false,
            },
            Member::MoveSpeed => &mut self.move_speed,
            Member::FlyMoveSpeed => &mut self.fly_move_speed,
            Member::FlyMoveScaleSide => &mut self.fly_move_scale_side,
            Member::AiMeleeDistance => &mut self.ai_melee_distance,
            _ => return false,
        };
        write_f32(slot, value)
    }

    fn members(&self) -> Vec<Member> {
        let mut members = vec![
            Member::MoveSpeed,
            Member::FlyMoveSpeed,
            Member::FlyMoveScaleSide,
            Member::AiMeleeDistance,
        ];
        for slot in Slot::ALL {
            if self.attack(slot).is_some() {
                members.extend([
                    Member::AttackDamage(slot),
                    Member::AttackAimDistMax(slot),
                    Member::AttackSpread(slot),
                ]);
            }
        }
        members
    }
}

/// Infantry movement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Soldier {
    /// Walk speed.
    pub walk_speed: f32,
    /// Run speed.
    pub run_speed: f32,
    /// Sprint speed.
    pub sprint_speed: f32,
    /// Jump speed.
    pub jump_speed: f32,
}

impl MemberAccess for Soldier {
    fn member(&self, member: Member) -> Option<FieldValue> {
        let value = match member {
            Member::WalkSpeed => self.walk_speed,
            Member::RunSpeed => self.run_speed,
            Member::SprintSpeed => self.sprint_speed,
            Member::JumpSpeed => self.jump_speed,
            _ => return None,
        };
        Some(FieldValue::Float(value))
    }

    fn set_member(&mut self, member: Member, value: FieldValue) -> bool {
        let slot = match member {
            Member::WalkSpeed => &mut self.walk_speed,
            Member::RunSpeed => &mut self.run_speed,
            Member::SprintSpeed => &mut self.sprint_speed,
            Member::JumpSpeed => &mut self.jump_speed,
            _ => return false,
        };
        write_f32(slot, value)
    }

    fn members(&self) -> Vec<Member> {
        vec![
            Member::WalkSpeed,
            Member::RunSpeed,
            Member::SprintSpeed,
            Member::JumpSpeed,
        ]
    }
}

/// Ground vehicle movement (hover or wheeled).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Vehicle {
    /// Move speed.
    pub move_speed: f32,
    /// Turning circle radius; only wheeled vehicles have one.
    pub turning_circle_radius: Option<f32>,
}

impl MemberAccess for Vehicle {
    fn member(&self, member: Member) -> Option<FieldValue> {
        match member {
            Member::MoveSpeed => Some(FieldValue::Float(self.move_speed)),
            Member::TurningCircleRadius => self.turning_circle_radius.map(FieldValue::Float),
            _ => None,
        }
    }

    fn set_member(&mut self, member: Member, value: FieldValue) -> bool {
        match member {
            Member::MoveSpeed => write_f32(&mut self.move_speed, value),
            Member::TurningCircleRadius => match self.turning_circle_radius.as_mut() {
                Some(radius) => write_f32(radius, value),
                None => false,
            },
            _ => false,
        }
    }

    fn members(&self) -> Vec<Member> {
        let mut members = vec![Member::MoveSpeed];
        if self.turning_circle_radius.is_some() {
            members.push(Member::TurningCircleRadius);
        }
        members
    }
}

/// Aircraft movement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Air {
    /// Forward speed.
    pub forward_speed: f32,
    /// Strafe speed.
    pub strafe_speed: f32,
    /// Turbo speed.
    pub turbo_speed: f32,
}

impl MemberAccess for Air {
    fn member(&self, member: Member) -> Option<FieldValue> {
        let value = match member {
            Member::ForwardSpeed => self.forward_speed,
            Member::StrafeSpeed => self.strafe_speed,
            Member::TurboSpeed => self.turbo_speed,
            _ => return None,
        };
        Some(FieldValue::Float(value))
    }

    fn set_member(&mut self, member: Member, value: FieldValue) -> bool {
        let slot = match member {
            Member::ForwardSpeed => &mut self.forward_speed,
            Member::StrafeSpeed => &mut self.strafe_speed,
            Member::TurboSpeed => &mut self.turbo_speed,
            _ => return false,
        };
        write_f32(slot, value)
    }

    fn members(&self) -> Vec<Member> {
        vec![Member::ForwardSpeed, Member::StrafeSpeed, Member::TurboSpeed]
    }
}

/// Target acquisition and vision.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sensor {
    /// Distance at which targets are acquired.
    pub targeting_distance: f32,
    /// Fog-of-war reveal distance.
    pub fog_of_war_view_distance: f32,
}

impl MemberAccess for Sensor {
    fn member(&self, member: Member) -> Option<FieldValue> {
        match member {
            Member::TargetingDistance => Some(FieldValue::Float(self.targeting_distance)),
            Member::FogOfWarViewDistance => {
                Some(FieldValue::Float(self.fog_of_war_view_distance))
            }
            _ => None,
        }
    }

    fn set_member(&mut self, member: Member, value: FieldValue) -> bool {
        match member {
            Member::TargetingDistance => write_f32(&mut self.targeting_distance, value),
            Member::FogOfWarViewDistance => write_f32(&mut self.fog_of_war_view_distance, value),
            _ => false,
        }
    }

    fn members(&self) -> Vec<Member> {
        vec![Member::TargetingDistance, Member::FogOfWarViewDistance]
    }
}

/// Aim-at helper with its own maximum distance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AimAt {
    /// Maximum aim distance.
    pub aim_distance_max: f32,
}

impl MemberAccess for AimAt {
    fn member(&self, member: Member) -> Option<FieldValue> {
        (member == Member::AimDistanceMax).then_some(FieldValue::Float(self.aim_distance_max))
    }

    fn set_member(&mut self, member: Member, value: FieldValue) -> bool {
        member == Member::AimDistanceMax && write_f32(&mut self.aim_distance_max, value)
    }

    fn members(&self) -> Vec<Member> {
        vec![Member::AimDistanceMax]
    }
}

/// Teleport ability.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Teleport {
    /// Cooldown between teleports.
    pub cooldown_time: f32,
    /// Channel duration.
    pub teleport_time: f32,
}

impl MemberAccess for Teleport {
    fn member(&self, member: Member) -> Option<FieldValue> {
        match member {
            Member::TeleportCooldownTime => Some(FieldValue::Float(self.cooldown_time)),
            Member::TeleportTime => Some(FieldValue::Float(self.teleport_time)),
            _ => None,
        }
    }

    fn set_member(&mut self, member: Member, value: FieldValue) -> bool {
        match member {
            Member::TeleportCooldownTime => write_f32(&mut self.cooldown_time, value),
            Member::TeleportTime => write_f32(&mut self.teleport_time, value),
            _ => false,
        }
    }

    fn members(&self) -> Vec<Member> {
        vec![Member::TeleportCooldownTime, Member::TeleportTime]
    }
}

/// Vehicle dispenser (a pad that hands out a vehicle on a cooldown).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dispenser {
    /// Display name of the unit this dispenser hands out.
    pub dispensed_unit: String,
    /// Cooldown between dispensed vehicles.
    pub dispense_timeout: f32,
    /// Remaining cooldown on a live instance. Not a prefab member.
    pub local_timeout: f32,
}

impl MemberAccess for Dispenser {
    fn member(&self, member: Member) -> Option<FieldValue> {
        (member == Member::DispenseTimeout).then_some(FieldValue::Float(self.dispense_timeout))
    }

    fn set_member(&mut self, member: Member, value: FieldValue) -> bool {
        member == Member::DispenseTimeout && write_f32(&mut self.dispense_timeout, value)
    }

    fn members(&self) -> Vec<Member> {
        vec![Member::DispenseTimeout]
    }
}

/// AI aim tracking.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiAiming {
    /// When set, the AI never tracks targets.
    pub aim_paused: bool,
}

impl MemberAccess for AiAiming {
    fn member(&self, member: Member) -> Option<FieldValue> {
        (member == Member::AimPaused).then_some(FieldValue::Bool(self.aim_paused))
    }

    fn set_member(&mut self, member: Member, value: FieldValue) -> bool {
        match (member, value) {
            (Member::AimPaused, FieldValue::Bool(v)) => {
                self.aim_paused = v;
                true
            }
            _ => false,
        }
    }

    fn members(&self) -> Vec<Member> {
        vec![Member::AimPaused]
    }
}

// =============================================================================
// Component Enum
// =============================================================================

/// Component type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    /// [`Turret`]
    Turret,
    /// [`Creature`]
    Creature,
    /// [`Soldier`]
    Soldier,
    /// [`Vehicle`]
    Vehicle,
    /// [`Air`]
    Air,
    /// [`Sensor`]
    Sensor,
    /// [`AimAt`]
    AimAt,
    /// [`Teleport`]
    Teleport,
    /// [`Dispenser`]
    Dispenser,
    /// [`AiAiming`]
    AiAiming,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Type-safe storage for one component of a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Component {
    /// Turret with two weapon slots.
    Turret(Turret),
    /// Creature body.
    Creature(Creature),
    /// Infantry movement.
    Soldier(Soldier),
    /// Ground vehicle movement.
    Vehicle(Vehicle),
    /// Aircraft movement.
    Air(Air),
    /// Sensor.
    Sensor(Sensor),
    /// Aim-at helper.
    AimAt(AimAt),
    /// Teleport ability.
    Teleport(Teleport),
    /// Vehicle dispenser.
    Dispenser(Dispenser),
    /// AI aim tracking.
    AiAiming(AiAiming),
}

impl Component {
    /// Returns the kind of this component.
    #[must_use]
    pub const fn kind(&self) -> ComponentKind {
        match self {
            Self::Turret(_) => ComponentKind::Turret,
            Self::Creature(_) => ComponentKind::Creature,
            Self::Soldier(_) => ComponentKind::Soldier,
            Self::Vehicle(_) => ComponentKind::Vehicle,
            Self::Air(_) => ComponentKind::Air,
            Self::Sensor(_) => ComponentKind::Sensor,
            Self::AimAt(_) => ComponentKind::AimAt,
            Self::Teleport(_) => ComponentKind::Teleport,
            Self::Dispenser(_) => ComponentKind::Dispenser,
            Self::AiAiming(_) => ComponentKind::AiAiming,
        }
    }

    fn access(&self) -> &dyn MemberAccess {
        match self {
            Self::Turret(c) => c,
            Self::Creature(c) => c,
            Self::Soldier(c) => c,
            Self::Vehicle(c) => c,
            Self::Air(c) => c,
            Self::Sensor(c) => c,
            Self::AimAt(c) => c,
            Self::Teleport(c) => c,
            Self::Dispenser(c) => c,
            Self::AiAiming(c) => c,
        }
    }

    fn access_mut(&mut self) -> &mut dyn MemberAccess {
        match self {
            Self::Turret(c) => c,
            Self::Creature(c) => c,
            Self::Soldier(c) => c,
            Self::Vehicle(c) => c,
            Self::Air(c) => c,
            Self::Sensor(c) => c,
            Self::AimAt(c) => c,
            Self::Teleport(c) => c,
            Self::Dispenser(c) => c,
            Self::AiAiming(c) => c,
        }
    }

    /// Returns the turret, if this is one.
    #[must_use]
    pub fn as_turret(&self) -> Option<&Turret> {
        match self {
            Self::Turret(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the creature, if this is one.
    #[must_use]
    pub fn as_creature(&self) -> Option<&Creature> {
        match self {
            Self::Creature(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the dispenser mutably, if this is one.
    pub fn as_dispenser_mut(&mut self) -> Option<&mut Dispenser> {
        match self {
            Self::Dispenser(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the dispenser, if this is one.
    #[must_use]
    pub fn as_dispenser(&self) -> Option<&Dispenser> {
        match self {
            Self::Dispenser(d) => Some(d),
            _ => None,
        }
    }
}

impl MemberAccess for Component {
    fn member(&self, member: Member) -> Option<FieldValue> {
        self.access().member(member)
    }

    fn set_member(&mut self, member: Member, value: FieldValue) -> bool {
        self.access_mut().set_member(member, value)
    }

    fn members(&self) -> Vec<Member> {
        self.access().members()
    }
}
