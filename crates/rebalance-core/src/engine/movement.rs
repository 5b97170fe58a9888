//! Movement passes: jump speed, move speed, strafe speed and turn radius.
//!
//! Only fields with a positive baseline are scaled. When a strafe multiplier
//! is configured the strafe pass owns the sideways fields and the move pass
//! leaves them alone, so the two never stack through the store.

use super::{scale_positive, ApplyContext, ApplyPass, FieldTarget, PassDeclaration};
use crate::catalog::{Capabilities, CatalogEntry};
use crate::config::{is_effective, Category};
use crate::host::components::ComponentKind;
use crate::host::member::Member;

fn scale_members(
    ctx: &mut ApplyContext<'_>,
    entry: &CatalogEntry,
    category: Category,
    kind: ComponentKind,
    members: &[(Member, f32)],
) {
    for path in entry.components(kind) {
        for &(member, factor) in members {
            if !is_effective(factor) {
                continue;
            }
            ctx.apply_field(
                category,
                &FieldTarget::synced(path.clone(), entry.target.clone(), member),
                |v| scale_positive(v, factor),
            );
        }
    }
}

// =============================================================================
// Jump
// =============================================================================

/// Applies `jump_speed_mult` to infantry.
pub struct JumpPass {
    declaration: PassDeclaration,
}

impl JumpPass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declaration: PassDeclaration {
                id: "jump_speed",
                categories: vec![Category::JumpSpeed],
            },
        }
    }
}

impl Default for JumpPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyPass for JumpPass {
    fn declaration(&self) -> &PassDeclaration {
        &self.declaration
    }

    fn run(&self, ctx: &mut ApplyContext<'_>) {
        let resolver = ctx.resolver();
        for entry in ctx.catalog().entries() {
            let jump = resolver.multiplier(Category::JumpSpeed, &entry.name, None);
            scale_members(
                ctx,
                entry,
                Category::JumpSpeed,
                ComponentKind::Soldier,
                &[(Member::JumpSpeed, jump)],
            );
        }
    }
}

// =============================================================================
// Move Speed
// =============================================================================

/// Applies `move_speed_mult`, `turbo_speed_mult` and `fly_speed_mult`.
pub struct MovePass {
    declaration: PassDeclaration,
}

impl MovePass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declaration: PassDeclaration {
                id: "move_speed",
                categories: vec![Category::MoveSpeed, Category::TurboSpeed, Category::FlySpeed],
            },
        }
    }
}

impl Default for MovePass {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyPass for MovePass {
    fn declaration(&self) -> &PassDeclaration {
        &self.declaration
    }

    fn run(&self, ctx: &mut ApplyContext<'_>) {
        let resolver = ctx.resolver();
        for entry in ctx.catalog().entries() {
            let name = entry.name.as_str();
            let base = resolver.multiplier(Category::MoveSpeed, name, None);
            let turbo = resolver.multiplier(Category::TurboSpeed, name, None);
            let fly = resolver.multiplier(Category::FlySpeed, name, None);
            let strafe_owned = is_effective(resolver.multiplier(Category::StrafeSpeed, name, None));

            let turbo = if is_effective(turbo) { turbo } else { base };
            let fly = if is_effective(fly) { fly } else { base };
            let side = if strafe_owned { 1.0 } else { base };

            let category = Category::MoveSpeed;
            scale_members(
                ctx,
                entry,
                category,
                ComponentKind::Soldier,
                &[
                    (Member::WalkSpeed, base),
                    (Member::RunSpeed, base),
                    (Member::SprintSpeed, base),
                ],
            );
            scale_members(ctx, entry, category, ComponentKind::Vehicle, &[(Member::MoveSpeed, base)]);
            scale_members(
                ctx,
                entry,
                category,
                ComponentKind::Air,
                &[
                    (Member::ForwardSpeed, base),
                    (Member::StrafeSpeed, side),
                    (Member::TurboSpeed, turbo),
                ],
            );
            scale_members(
                ctx,
                entry,
                category,
                ComponentKind::Creature,
                &[
                    (Member::MoveSpeed, base),
                    (Member::FlyMoveSpeed, fly),
                    (Member::FlyMoveScaleSide, side),
                ],
            );
        }
    }
}

// =============================================================================
// Strafe Speed
// =============================================================================

/// Applies `strafe_speed_mult` on top of the move multiplier.
pub struct StrafePass {
    declaration: PassDeclaration,
}

impl StrafePass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declaration: PassDeclaration {
                id: "strafe_speed",
                categories: vec![Category::StrafeSpeed],
            },
        }
    }
}

impl Default for StrafePass {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyPass for StrafePass {
    fn declaration(&self) -> &PassDeclaration {
        &self.declaration
    }

    fn run(&self, ctx: &mut ApplyContext<'_>) {
        let resolver = ctx.resolver();
        for entry in ctx.catalog().entries() {
            let strafe = resolver.multiplier(Category::StrafeSpeed, &entry.name, None);
            if !is_effective(strafe) {
                continue;
            }
            let factor = strafe * resolver.multiplier(Category::MoveSpeed, &entry.name, None);
            let category = Category::StrafeSpeed;
            scale_members(ctx, entry, category, ComponentKind::Air, &[(Member::StrafeSpeed, factor)]);
            scale_members(
                ctx,
                entry,
                category,
                ComponentKind::Creature,
                &[(Member::FlyMoveScaleSide, factor)],
            );
        }
    }
}

// =============================================================================
// Turn Radius
// =============================================================================

/// Applies `turn_radius_mult` to wheeled vehicles. Hover vehicles have no
/// turning circle and are skipped.
pub struct TurnRadiusPass {
    declaration: PassDeclaration,
}

impl TurnRadiusPass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declaration: PassDeclaration {
                id: "turn_radius",
                categories: vec![Category::TurnRadius],
            },
        }
    }
}

impl Default for TurnRadiusPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyPass for TurnRadiusPass {
    fn declaration(&self) -> &PassDeclaration {
        &self.declaration
    }

    fn run(&self, ctx: &mut ApplyContext<'_>) {
        let resolver = ctx.resolver();
        for entry in ctx.catalog().with_capabilities(Capabilities::VEHICLE) {
            let factor = resolver.multiplier(Category::TurnRadius, &entry.name, None);
            if !is_effective(factor) {
                continue;
            }
            for path in entry.components(ComponentKind::Vehicle) {
                if ctx.read(&path, Member::TurningCircleRadius).is_none() {
                    continue;
                }
                ctx.apply_field(
                    Category::TurnRadius,
                    &FieldTarget::synced(path, entry.target.clone(), Member::TurningCircleRadius),
                    |v| scale_positive(v, factor),
                );
            }
        }
    }
}
