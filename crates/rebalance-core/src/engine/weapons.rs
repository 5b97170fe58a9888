//! Damage and weapons passes.

use tracing::{debug, warn};

use super::projectile::{
    apply_projectile_overrides, projectiles_named_after, scale_ballistics, scale_damage,
    slot_projectiles, Ballistics,
};
use super::{scale, scale_positive, ApplyContext, ApplyPass, FieldTarget, PassDeclaration};
use crate::catalog::CatalogEntry;
use crate::config::{is_effective, BalanceConfig, Category};
use crate::host::components::ComponentKind;
use crate::host::member::{FieldValue, Member, Slot};
use crate::host::FieldPath;

/// Shortest reload time a slot can be scaled to, in seconds.
pub const MIN_RELOAD_TIME: f32 = 0.1;
/// Shortest interval between shots, in seconds.
pub const MIN_FIRE_INTERVAL: f32 = 0.01;
/// Smallest magazine a slot can be scaled to.
pub const MIN_MAGAZINE: i32 = 1;

fn reload_time(value: FieldValue, factor: f32) -> Option<FieldValue> {
    let FieldValue::Float(v) = value else {
        return None;
    };
    Some(FieldValue::Float((v * factor).max(MIN_RELOAD_TIME)))
}

/// A higher fire rate means a shorter interval.
fn fire_interval(value: FieldValue, rate: f32) -> Option<FieldValue> {
    let FieldValue::Float(v) = value else {
        return None;
    };
    if rate <= 0.0 {
        return None;
    }
    Some(FieldValue::Float((v / rate).max(MIN_FIRE_INTERVAL)))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn magazine_size(value: FieldValue, factor: f32) -> Option<FieldValue> {
    let FieldValue::Int(v) = value else {
        return None;
    };
    Some(FieldValue::Int(((v as f32 * factor).round() as i32).max(MIN_MAGAZINE)))
}

fn has_attack(ctx: &ApplyContext<'_>, path: &FieldPath, slot: Slot) -> Option<bool> {
    let attack = ctx.component(path)?.as_creature()?.attack(slot)?;
    Some(attack.projectile.is_none())
}

// =============================================================================
// Damage Pass
// =============================================================================

/// Applies `damage_mult` and per-projectile absolutes.
pub struct DamagePass {
    declaration: PassDeclaration,
}

impl DamagePass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declaration: PassDeclaration {
                id: "damage",
                categories: vec![Category::Damage],
            },
        }
    }
}

impl Default for DamagePass {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyPass for DamagePass {
    fn declaration(&self) -> &PassDeclaration {
        &self.declaration
    }

    fn is_active(&self, config: &BalanceConfig) -> bool {
        config.overlay.has_category(Category::Damage) || config.overlay.has_any_projectile_overrides()
    }

    fn run(&self, ctx: &mut ApplyContext<'_>) {
        let resolver = ctx.resolver();

        for entry in ctx.catalog().entries() {
            // Absolutes first so the multiplier skips those projectiles.
            apply_projectile_overrides(ctx, &entry.name);

            for slot in Slot::ALL {
                let factor = resolver.multiplier(Category::Damage, &entry.name, Some(slot));
                if !is_effective(factor) {
                    continue;
                }
                for projectile in slot_projectiles(ctx, entry, slot) {
                    scale_damage(ctx, &entry.name, &projectile, factor);
                }
                for path in entry.components(ComponentKind::Creature) {
                    if has_attack(ctx, &path, slot) != Some(true) {
                        continue;
                    }
                    ctx.apply_field(
                        Category::Damage,
                        &FieldTarget::direct(path, Member::AttackDamage(slot)),
                        |v| scale_positive(v, factor),
                    );
                }
            }
        }
    }
}

// =============================================================================
// Weapons Pass
// =============================================================================

/// Applies range, projectile speed/lifetime, aim distances and per-slot
/// turret parameters.
pub struct WeaponsPass {
    declaration: PassDeclaration,
}

impl WeaponsPass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declaration: PassDeclaration {
                id: "weapons",
                categories: vec![
                    Category::Range,
                    Category::ProjectileSpeed,
                    Category::ProjectileLifetime,
                    Category::ReloadTime,
                    Category::Accuracy,
                    Category::Magazine,
                    Category::FireRate,
                ],
            },
        }
    }

    fn projectiles(ctx: &mut ApplyContext<'_>, entry: &CatalogEntry) {
        let visible_event = ctx
            .resolver()
            .multiplier(Category::VisibleEventRadius, &entry.name, None);
        let mut referenced = false;
        let mut configured = false;

        for slot in Slot::ALL {
            let scaling = Ballistics::resolve(ctx, &entry.name, slot);
            let projectiles = slot_projectiles(ctx, entry, slot);
            referenced |= !projectiles.is_empty();
            if !scaling.is_effective() {
                continue;
            }
            configured = true;
            for projectile in projectiles {
                scale_ballistics(ctx, &entry.name, &projectile, scaling, visible_event);
            }
        }

        if configured && !referenced {
            let primary = Ballistics::resolve(ctx, &entry.name, Slot::Primary);
            let matches = projectiles_named_after(ctx, &entry.name);
            if matches.is_empty() {
                warn!(unit = %entry.name, "ballistic multipliers set but no projectile found");
            }
            for projectile in matches {
                debug!(unit = %entry.name, projectile = %projectile, "scaling projectile matched by name");
                scale_ballistics(ctx, &entry.name, &projectile, primary, visible_event);
            }
        }
    }

    fn aim_distances(ctx: &mut ApplyContext<'_>, entry: &CatalogEntry) {
        let range = ctx
            .resolver()
            .multiplier(Category::Range, &entry.name, Some(Slot::Primary));
        if !is_effective(range) {
            return;
        }
        let targets = entry
            .components(ComponentKind::Turret)
            .map(|path| (path, Member::AimDistance))
            .chain(
                entry
                    .components(ComponentKind::AimAt)
                    .map(|path| (path, Member::AimDistanceMax)),
            );
        for (path, member) in targets {
            ctx.apply_field(
                Category::Range,
                &FieldTarget::synced(path, entry.target.clone(), member),
                |v| scale_positive(v, range),
            );
        }
    }

    fn creature_attacks(ctx: &mut ApplyContext<'_>, entry: &CatalogEntry) {
        let resolver = ctx.resolver();
        for slot in Slot::ALL {
            let range = resolver.multiplier(Category::Range, &entry.name, Some(slot));
            let accuracy = resolver.multiplier(Category::Accuracy, &entry.name, Some(slot));
            for path in entry.components(ComponentKind::Creature) {
                if has_attack(ctx, &path, slot).is_none() {
                    continue;
                }
                if is_effective(range) {
                    ctx.apply_field(
                        Category::Range,
                        &FieldTarget::direct(path.clone(), Member::AttackAimDistMax(slot)),
                        |v| scale_positive(v, range),
                    );
                }
                if is_effective(accuracy) {
                    ctx.apply_field(
                        Category::Accuracy,
                        &FieldTarget::direct(path, Member::AttackSpread(slot)),
                        |v| scale(v, accuracy),
                    );
                }
            }
        }
    }

    fn turret_slots(ctx: &mut ApplyContext<'_>, entry: &CatalogEntry) {
        let resolver = ctx.resolver();
        for slot in Slot::ALL {
            let reload = resolver.multiplier(Category::ReloadTime, &entry.name, Some(slot));
            let rate = resolver.multiplier(Category::FireRate, &entry.name, Some(slot));
            let magazine = resolver.multiplier(Category::Magazine, &entry.name, Some(slot));
            let accuracy = resolver.multiplier(Category::Accuracy, &entry.name, Some(slot));

            for path in entry.components(ComponentKind::Turret) {
                let field = |member| FieldTarget::synced(path.clone(), entry.target.clone(), member);
                if is_effective(reload) {
                    ctx.apply_field(Category::ReloadTime, &field(Member::ReloadTime(slot)), |v| {
                        reload_time(v, reload)
                    });
                }
                if is_effective(rate) {
                    ctx.apply_field(Category::FireRate, &field(Member::FireInterval(slot)), |v| {
                        fire_interval(v, rate)
                    });
                }
                if is_effective(magazine) {
                    ctx.apply_field(Category::Magazine, &field(Member::MagazineSize(slot)), |v| {
                        magazine_size(v, magazine)
                    });
                }
                if is_effective(accuracy) {
                    ctx.apply_field(Category::Accuracy, &field(Member::MuzzleSpread(slot)), |v| {
                        scale(v, accuracy)
                    });
                }
            }
        }
    }
}

impl Default for WeaponsPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyPass for WeaponsPass {
    fn declaration(&self) -> &PassDeclaration {
        &self.declaration
    }

    fn run(&self, ctx: &mut ApplyContext<'_>) {
        for entry in ctx.catalog().entries() {
            Self::projectiles(ctx, entry);
            Self::aim_distances(ctx, entry);
            Self::creature_attacks(ctx, entry);
            Self::turret_slots(ctx, entry);
        }
    }
}
