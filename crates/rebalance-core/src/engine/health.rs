//! Health pass.
//!
//! Health lives on a damage-data asset, not on the prefab. The store path
//! makes client-visible maximum health match the server; when the store does
//! not know the asset the value is written directly, and clients that are
//! already connected keep the old maximum until the next full sync.

use tracing::{debug, warn};

use super::{scale, ApplyContext, ApplyOutcome, ApplyPass, FieldTarget, PassDeclaration};
use crate::config::{is_effective, Category};
use crate::dedup::AssetGroup;
use crate::host::member::Member;
use crate::host::FieldPath;
use crate::store::TargetKey;

/// Applies `health_mult`.
pub struct HealthPass {
    declaration: PassDeclaration,
}

impl HealthPass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declaration: PassDeclaration {
                id: "health",
                categories: vec![Category::Health],
            },
        }
    }
}

impl Default for HealthPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyPass for HealthPass {
    fn declaration(&self) -> &PassDeclaration {
        &self.declaration
    }

    fn run(&self, ctx: &mut ApplyContext<'_>) {
        let resolver = ctx.resolver();

        for entry in ctx.catalog().entries() {
            let factor = resolver.multiplier(Category::Health, &entry.name, None);
            if !is_effective(factor) {
                continue;
            }
            let Some(asset) = entry.damage_data.as_deref() else {
                debug!(unit = %entry.name, "no damage data, health unchanged");
                continue;
            };
            if !ctx.dedup().mark_modified(AssetGroup::Health, asset) {
                debug!(unit = %entry.name, asset, "damage data already scaled this pass");
                continue;
            }

            let target = FieldTarget::synced(
                FieldPath::DamageData(asset.to_string()),
                TargetKey::damage_data(asset),
                Member::Health,
            );
            if ctx.apply_field(Category::Health, &target, |v| scale(v, factor)) == ApplyOutcome::AppliedDirect {
                warn!(unit = %entry.name, asset, "health written directly; connected clients may disagree until resync");
            }
        }
    }
}
