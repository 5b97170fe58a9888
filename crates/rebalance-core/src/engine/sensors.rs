//! Sensor passes and AI aim disabling.

use tracing::{debug, info};

use super::{absolute, ApplyContext, ApplyPass, FieldTarget, PassDeclaration};
use crate::catalog::Capabilities;
use crate::config::{BalanceConfig, Category};
use crate::host::components::ComponentKind;
use crate::host::member::{FieldValue, Member};

fn apply_sensor_absolute(ctx: &mut ApplyContext<'_>, category: Category, member: Member) {
    let resolver = ctx.resolver();
    for entry in ctx.catalog().with_capabilities(Capabilities::SENSOR) {
        let Some(value) = resolver.absolute(category, &entry.name) else {
            continue;
        };
        for path in entry.components(ComponentKind::Sensor) {
            ctx.apply_field(
                category,
                &FieldTarget::synced(path, entry.target.clone(), member),
                |v| absolute(v, value),
            );
        }
    }
}

/// Applies `target_distance`.
pub struct TargetDistancePass {
    declaration: PassDeclaration,
}

impl TargetDistancePass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declaration: PassDeclaration {
                id: "target_distance",
                categories: vec![Category::TargetDistance],
            },
        }
    }
}

impl Default for TargetDistancePass {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyPass for TargetDistancePass {
    fn declaration(&self) -> &PassDeclaration {
        &self.declaration
    }

    fn run(&self, ctx: &mut ApplyContext<'_>) {
        apply_sensor_absolute(ctx, Category::TargetDistance, Member::TargetingDistance);
    }
}

/// Applies `fow_distance`.
pub struct FogOfWarPass {
    declaration: PassDeclaration,
}

impl FogOfWarPass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declaration: PassDeclaration {
                id: "fow_distance",
                categories: vec![Category::FogOfWarDistance],
            },
        }
    }
}

impl Default for FogOfWarPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyPass for FogOfWarPass {
    fn declaration(&self) -> &PassDeclaration {
        &self.declaration
    }

    fn run(&self, ctx: &mut ApplyContext<'_>) {
        apply_sensor_absolute(ctx, Category::FogOfWarDistance, Member::FogOfWarViewDistance);
    }
}

// =============================================================================
// AI Aim
// =============================================================================

/// Switches off AI aiming for the listed units. Always direct.
pub struct AiAimPass {
    declaration: PassDeclaration,
}

impl AiAimPass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declaration: PassDeclaration {
                id: "ai_aim",
                categories: Vec::new(),
            },
        }
    }
}

impl Default for AiAimPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyPass for AiAimPass {
    fn declaration(&self) -> &PassDeclaration {
        &self.declaration
    }

    fn is_active(&self, config: &BalanceConfig) -> bool {
        !config.disable_ai_aim.is_empty()
    }

    fn run(&self, ctx: &mut ApplyContext<'_>) {
        let catalog = ctx.catalog();
        for name in &ctx.config().disable_ai_aim {
            let Some(entry) = catalog.lookup_by_name(name) else {
                debug!(unit = %name, "AI aim target not found");
                continue;
            };
            let edits = [
                (ComponentKind::Creature, Member::AiMeleeDistance, FieldValue::Float(0.0)),
                (ComponentKind::Sensor, Member::TargetingDistance, FieldValue::Float(0.0)),
                (ComponentKind::AiAiming, Member::AimPaused, FieldValue::Bool(true)),
            ];
            let mut written = 0;
            for (kind, member, value) in edits {
                for path in entry.components(kind) {
                    if ctx
                        .apply_labelled(self.declaration.id, &FieldTarget::direct(path, member), |_| Some(value))
                        .is_applied()
                    {
                        written += 1;
                    }
                }
            }
            info!(unit = %name, fields = written, "AI aiming disabled");
        }
    }
}
