//! Passes for global values that apply to every entity carrying a component.

use super::{absolute, ApplyContext, ApplyPass, FieldTarget, PassDeclaration};
use crate::catalog::Capabilities;
use crate::config::Category;
use crate::host::components::ComponentKind;
use crate::host::member::Member;

fn apply_global(ctx: &mut ApplyContext<'_>, category: Category, kind: ComponentKind, member: Member) {
    let Some(value) = ctx.config().overlay.get(category, "", None) else {
        return;
    };
    for entry in ctx.catalog().with_capabilities(Capabilities::of(kind)) {
        for path in entry.components(kind) {
            ctx.apply_field(
                category,
                &FieldTarget::synced(path, entry.target.clone(), member),
                |v| absolute(v, value),
            );
        }
    }
}

/// Applies the `_teleport` cooldown and duration to every teleporter.
pub struct TeleportPass {
    declaration: PassDeclaration,
}

impl TeleportPass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declaration: PassDeclaration {
                id: "teleport",
                categories: vec![Category::TeleportCooldown, Category::TeleportDuration],
            },
        }
    }
}

impl Default for TeleportPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyPass for TeleportPass {
    fn declaration(&self) -> &PassDeclaration {
        &self.declaration
    }

    fn run(&self, ctx: &mut ApplyContext<'_>) {
        apply_global(
            ctx,
            Category::TeleportCooldown,
            ComponentKind::Teleport,
            Member::TeleportCooldownTime,
        );
        apply_global(
            ctx,
            Category::TeleportDuration,
            ComponentKind::Teleport,
            Member::TeleportTime,
        );
    }
}

/// Applies `dispense_timeout` to every vehicle dispenser.
pub struct DispenserPass {
    declaration: PassDeclaration,
}

impl DispenserPass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declaration: PassDeclaration {
                id: "dispense_timeout",
                categories: vec![Category::DispenseTimeout],
            },
        }
    }
}

impl Default for DispenserPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyPass for DispenserPass {
    fn declaration(&self) -> &PassDeclaration {
        &self.declaration
    }

    fn run(&self, ctx: &mut ApplyContext<'_>) {
        apply_global(
            ctx,
            Category::DispenseTimeout,
            ComponentKind::Dispenser,
            Member::DispenseTimeout,
        );
    }
}
