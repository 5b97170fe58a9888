//! Construction pass: tech-tier build times, cost, build time, minimum team
//! tier and build radius.
//!
//! Research items (technology tier > 0) with a configured tier time get that
//! time and nothing else; the per-unit construction overrides only apply to
//! regular buildables.

use tracing::debug;

use super::{absolute, ApplyContext, ApplyPass, FieldTarget, PassDeclaration};
use crate::catalog::Capabilities;
use crate::config::{is_effective, BalanceConfig, Category};
use crate::host::member::{FieldValue, Member};
use crate::host::FieldPath;
use crate::store::TargetKey;

/// Smallest cost a unit can be scaled to.
pub const MIN_COST: i32 = 1;
/// Shortest build time a unit can be scaled to, in seconds.
pub const MIN_BUILD_TIME: f32 = 0.5;
/// Shortest build time a tech tier can be set to, in seconds.
pub const MIN_TIER_TIME: f32 = 1.0;

/// Applies construction-data overrides.
pub struct ConstructionPass {
    declaration: PassDeclaration,
}

impl ConstructionPass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declaration: PassDeclaration {
                id: "construction",
                categories: vec![
                    Category::Cost,
                    Category::BuildTime,
                    Category::MinTier,
                    Category::BuildRadius,
                ],
            },
        }
    }
}

impl Default for ConstructionPass {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn scaled_cost(value: FieldValue, factor: f32) -> Option<FieldValue> {
    let FieldValue::Int(cost) = value else {
        return None;
    };
    let scaled = (cost as f32 * factor).round() as i32;
    Some(FieldValue::Int(scaled.max(MIN_COST)))
}

fn scaled_build_time(value: FieldValue, factor: f32) -> Option<FieldValue> {
    let FieldValue::Float(time) = value else {
        return None;
    };
    Some(FieldValue::Float((time * factor).max(MIN_BUILD_TIME)))
}

impl ApplyPass for ConstructionPass {
    fn declaration(&self) -> &PassDeclaration {
        &self.declaration
    }

    fn is_active(&self, config: &BalanceConfig) -> bool {
        config.overlay.has_tech_tiers()
            || self
                .declaration
                .categories
                .iter()
                .any(|c| config.overlay.has_category(*c))
    }

    fn run(&self, ctx: &mut ApplyContext<'_>) {
        let resolver = ctx.resolver();
        let overlay = resolver.overlay();

        for entry in ctx.catalog().with_capabilities(Capabilities::CONSTRUCTION) {
            let Some(asset) = entry.construction.as_deref() else {
                continue;
            };
            let path = FieldPath::Construction(asset.to_string());
            let key = TargetKey::asset(asset);
            let field = |member| FieldTarget::synced(path.clone(), key.clone(), member);

            let tier = ctx
                .read(&path, Member::TechnologyTier)
                .and_then(FieldValue::as_i32)
                .unwrap_or(0);
            if tier > 0 {
                if let Some(seconds) = overlay.tech_tier_time(tier) {
                    let seconds = seconds.max(MIN_TIER_TIME);
                    debug!(unit = %entry.name, tier, seconds, "tech tier build time");
                    ctx.apply_field(Category::BuildTime, &field(Member::BuildUpTime), |_| {
                        Some(FieldValue::Float(seconds))
                    });
                    continue;
                }
            }

            let cost = resolver.multiplier(Category::Cost, &entry.name, None);
            if is_effective(cost) {
                ctx.apply_field(Category::Cost, &field(Member::ResourceCost), |v| {
                    scaled_cost(v, cost)
                });
            }

            let build_time = resolver.multiplier(Category::BuildTime, &entry.name, None);
            if is_effective(build_time) {
                ctx.apply_field(Category::BuildTime, &field(Member::BuildUpTime), |v| {
                    scaled_build_time(v, build_time)
                });
            }

            if let Some(min_tier) = resolver.absolute(Category::MinTier, &entry.name) {
                ctx.apply_field(Category::MinTier, &field(Member::MinimumTeamTier), |v| {
                    absolute(v, min_tier)
                });
            }

            if let Some(radius) = resolver.absolute(Category::BuildRadius, &entry.name) {
                ctx.apply_field(
                    Category::BuildRadius,
                    &field(Member::MaximumBaseStructureDistance),
                    |v| absolute(v, radius),
                );
            }
        }
    }
}
