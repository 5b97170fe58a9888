//! Projectile asset scaling shared by the damage, weapons and visible-event
//! passes.
//!
//! A travelling projectile's range is `base_speed * life_time`. Scaling range
//! scales lifetime and leaves speed to its own multiplier, so range and speed
//! stay independent. Instant-hit projectiles store their maximum distance in
//! `base_speed`; range scales that field directly and the lifetime multiplier
//! only affects the visual duration.

use tracing::{debug, warn};

use super::{absolute, scale_positive, ApplyContext, ApplyPass, FieldTarget, PassDeclaration};
use crate::catalog::CatalogEntry;
use crate::config::{is_effective, Category};
use crate::dedup::AssetGroup;
use crate::host::components::ComponentKind;
use crate::host::member::{Member, Slot};
use crate::host::FieldPath;
use crate::store::TargetKey;

// =============================================================================
// Helpers
// =============================================================================

/// Store-path target for a projectile member.
pub(super) fn projectile_field(projectile: &str, member: Member) -> FieldTarget {
    FieldTarget::synced(
        FieldPath::Projectile(projectile.to_string()),
        TargetKey::asset(projectile),
        member,
    )
}

/// Projectile assets referenced by `entry`'s weapons in `slot`, in component
/// order, without duplicates.
pub(super) fn slot_projectiles(ctx: &ApplyContext<'_>, entry: &CatalogEntry, slot: Slot) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let turrets = entry
        .components(ComponentKind::Turret)
        .filter_map(|path| ctx.component(&path)?.as_turret()?.slot(slot).projectile.clone());
    let attacks = entry
        .components(ComponentKind::Creature)
        .filter_map(|path| ctx.component(&path)?.as_creature()?.attack(slot)?.projectile.clone());
    for name in turrets.chain(attacks) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Ballistic multipliers for one weapon slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Ballistics {
    pub range: f32,
    pub speed: f32,
    pub lifetime: f32,
}

impl Ballistics {
    pub(super) fn resolve(ctx: &ApplyContext<'_>, unit: &str, slot: Slot) -> Self {
        let resolver = ctx.resolver();
        Self {
            range: resolver.multiplier(Category::Range, unit, Some(slot)),
            speed: resolver.multiplier(Category::ProjectileSpeed, unit, Some(slot)),
            lifetime: resolver.multiplier(Category::ProjectileLifetime, unit, Some(slot)),
        }
    }

    pub(super) fn is_effective(self) -> bool {
        is_effective(self.range) || is_effective(self.speed) || is_effective(self.lifetime)
    }
}

/// Scales speed and lifetime of one projectile, once per pass.
///
/// `visible_event` is the unit's visible-event multiplier; instant-hit
/// projectiles fold it into the range-driven radius so the two never
/// overwrite each other.
pub(super) fn scale_ballistics(
    ctx: &mut ApplyContext<'_>,
    unit: &str,
    projectile: &str,
    scaling: Ballistics,
    visible_event: f32,
) {
    let Some(instant_hit) = ctx.world().projectile(projectile).map(|p| p.instant_hit) else {
        debug!(unit, projectile, "projectile asset not found");
        return;
    };
    if !ctx.dedup().mark_modified(AssetGroup::Ballistics, projectile) {
        debug!(unit, projectile, "projectile ballistics already scaled this pass");
        return;
    }

    let Ballistics {
        range,
        speed,
        lifetime,
    } = scaling;

    if instant_hit {
        let distance = range * speed;
        if is_effective(distance) {
            ctx.apply_field(
                Category::Range,
                &projectile_field(projectile, Member::BaseSpeed),
                |v| scale_positive(v, distance),
            );
        }
        if is_effective(lifetime) {
            ctx.apply_field(
                Category::ProjectileLifetime,
                &projectile_field(projectile, Member::LifeTime),
                |v| scale_positive(v, lifetime),
            );
        }
        if is_effective(range) && ctx.dedup().mark_modified(AssetGroup::VisibleEvent, projectile) {
            let radius = range * visible_event;
            ctx.apply_field(
                Category::Range,
                &projectile_field(projectile, Member::VisibleEventRadius),
                |v| scale_positive(v, radius),
            );
        }
    } else {
        let duration = range * lifetime;
        if is_effective(duration) {
            let category = if is_effective(range) {
                Category::Range
            } else {
                Category::ProjectileLifetime
            };
            ctx.apply_field(category, &projectile_field(projectile, Member::LifeTime), |v| {
                scale_positive(v, duration)
            });
        }
        if is_effective(speed) {
            ctx.apply_field(
                Category::ProjectileSpeed,
                &projectile_field(projectile, Member::BaseSpeed),
                |v| scale_positive(v, speed),
            );
        }
    }
}

/// Projectile assets whose name contains `unit` (case-insensitive).
pub(super) fn projectiles_named_after(ctx: &ApplyContext<'_>, unit: &str) -> Vec<String> {
    let needle = unit.to_lowercase();
    ctx.world()
        .projectiles()
        .filter(|(name, _)| name.to_lowercase().contains(&needle))
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Scales the damage fields of one projectile, once per pass. Only fields
/// with a positive baseline are touched.
pub(super) fn scale_damage(ctx: &mut ApplyContext<'_>, unit: &str, projectile: &str, factor: f32) {
    if ctx.world().projectile(projectile).is_none() {
        debug!(unit, projectile, "projectile asset not found");
        return;
    }
    if !ctx.dedup().mark_modified(AssetGroup::Damage, projectile) {
        debug!(unit, projectile, "projectile damage already scaled this pass");
        return;
    }

    let mut scaled = 0;
    for member in Member::DAMAGE_FIELDS {
        let outcome = ctx.apply_field(Category::Damage, &projectile_field(projectile, member), |v| {
            scale_positive(v, factor)
        });
        if outcome.is_applied() {
            scaled += 1;
        }
    }
    if scaled == 0 {
        warn!(unit, projectile, "no damage fields found to scale");
    }
}

/// Applies every configured per-projectile absolute for `unit`. Each touched
/// projectile is marked so multipliers leave those fields alone.
pub(super) fn apply_projectile_overrides(ctx: &mut ApplyContext<'_>, unit: &str) {
    let overlay = ctx.resolver().overlay();

    for (projectile, overrides) in overlay.projectile_overrides_for(unit) {
        if ctx.world().projectile(projectile).is_none() {
            warn!(unit, projectile, "overridden projectile not found");
            continue;
        }
        for (member, value) in overrides {
            let (category, group) = match member {
                Member::BaseSpeed => (Category::ProjectileSpeed, AssetGroup::Ballistics),
                Member::LifeTime => (Category::ProjectileLifetime, AssetGroup::Ballistics),
                Member::VisibleEventRadius => (Category::VisibleEventRadius, AssetGroup::VisibleEvent),
                _ => (Category::Damage, AssetGroup::Damage),
            };
            let value = *value;
            ctx.apply_field(category, &projectile_field(projectile, *member), |v| absolute(v, value));
            ctx.dedup().mark_modified(group, projectile);
        }
    }
}

// =============================================================================
// Visible Event Pass
// =============================================================================

/// Applies `visible_event_radius_mult` to every projectile a unit fires.
pub struct VisibleEventPass {
    declaration: PassDeclaration,
}

impl VisibleEventPass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declaration: PassDeclaration {
                id: "visible_event_radius",
                categories: vec![Category::VisibleEventRadius],
            },
        }
    }
}

impl Default for VisibleEventPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyPass for VisibleEventPass {
    fn declaration(&self) -> &PassDeclaration {
        &self.declaration
    }

    fn run(&self, ctx: &mut ApplyContext<'_>) {
        let resolver = ctx.resolver();

        for entry in ctx.catalog().entries() {
            let factor = resolver.multiplier(Category::VisibleEventRadius, &entry.name, None);
            if !is_effective(factor) {
                continue;
            }
            for slot in Slot::ALL {
                for projectile in slot_projectiles(ctx, entry, slot) {
                    if !ctx.dedup().mark_modified(AssetGroup::VisibleEvent, &projectile) {
                        continue;
                    }
                    ctx.apply_field(
                        Category::VisibleEventRadius,
                        &projectile_field(&projectile, Member::VisibleEventRadius),
                        |v| scale_positive(v, factor),
                    );
                }
            }
        }
    }
}
