//! Override application engine.
//!
//! A full apply pass runs a fixed sequence of [`ApplyPass`]es, each owning a
//! group of adjustment categories:
//!
//! 1. construction (tech tiers, cost, build time, min tier, build radius)
//! 2. health
//! 3. damage
//! 4. weapons (range, projectile speed/lifetime, aim, reload, magazine, spread)
//! 5. target distance, fog-of-war distance
//! 6. jump speed, visible event radius
//! 7. move speed, strafe speed, turn radius
//! 8. teleport timing, dispenser timeout, AI aim
//!
//! # Dual-path writes
//!
//! Every field goes through [`ApplyContext::apply_field`]. When the field has
//! a store target and the store is ready, the new value is computed from the
//! world's current definition value and submitted to the store. If the store
//! rejects it (or is unavailable) the field is mutated directly, computing
//! from the [`FallbackCache`] original so repeated applies never compound.
//!
//! Per-field failures are never errors; they surface as
//! [`ApplyOutcome::Skipped`] and are counted in the [`ApplyReport`].

mod cache;
mod construction;
mod globals;
mod health;
mod live;
mod movement;
mod projectile;
mod sensors;
mod weapons;

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info};

pub use cache::FallbackCache;
pub use construction::ConstructionPass;
pub use globals::{DispenserPass, TeleportPass};
pub use health::HealthPass;
pub use live::propagate_live;
pub use movement::{JumpPass, MovePass, StrafePass, TurnRadiusPass};
pub use projectile::VisibleEventPass;
pub use sensors::{AiAimPass, FogOfWarPass, TargetDistancePass};
pub use weapons::{DamagePass, WeaponsPass};

use crate::catalog::Catalog;
use crate::config::{BalanceConfig, Category};
use crate::dedup::SharedAssetDeduplicator;
use crate::host::components::Component;
use crate::host::member::{FieldValue, Member};
use crate::host::{FieldPath, World};
use crate::resolver::Resolver;
use crate::store::{SyncStore, TargetKey};

// =============================================================================
// Outcomes
// =============================================================================

/// Why a field was not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The path or member does not exist on this entity.
    MissingMember,
    /// The computed value does not apply (e.g. a zero baseline).
    NotApplicable,
    /// The host refused the write.
    WriteRejected,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMember => write!(f, "missing member"),
            Self::NotApplicable => write!(f, "not applicable"),
            Self::WriteRejected => write!(f, "write rejected"),
        }
    }
}

/// Result of one field write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplyOutcome {
    /// Accepted by the synchronized override store.
    AppliedViaStore,
    /// Written directly into the host.
    AppliedDirect,
    /// Not written.
    Skipped(SkipReason),
}

impl ApplyOutcome {
    /// Whether the field was written by either path.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::AppliedViaStore | Self::AppliedDirect)
    }
}

/// Outcome counts for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    /// Fields accepted by the store.
    pub via_store: usize,
    /// Fields mutated directly.
    pub direct: usize,
    /// Fields skipped.
    pub skipped: usize,
}

/// Per-category summary of one apply pass.
///
/// Outcomes are tallied under the category's configuration key, or under a
/// free-form label for writes that have no category (`ai_aim`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    counts: BTreeMap<&'static str, OutcomeCounts>,
}

impl ApplyReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one outcome.
    pub fn record(&mut self, label: &'static str, outcome: ApplyOutcome) {
        let counts = self.counts.entry(label).or_default();
        match outcome {
            ApplyOutcome::AppliedViaStore => counts.via_store += 1,
            ApplyOutcome::AppliedDirect => counts.direct += 1,
            ApplyOutcome::Skipped(_) => counts.skipped += 1,
        }
    }

    /// Counts for one category.
    #[must_use]
    pub fn counts(&self, category: Category) -> OutcomeCounts {
        self.counts_for(category.config_key())
    }

    /// Counts for one label.
    #[must_use]
    pub fn counts_for(&self, label: &str) -> OutcomeCounts {
        self.counts.get(label).copied().unwrap_or_default()
    }

    /// Every label with at least one outcome.
    pub fn labels(&self) -> impl Iterator<Item = (&'static str, OutcomeCounts)> + '_ {
        self.counts.iter().map(|(l, n)| (*l, *n))
    }

    /// Fields accepted by the store across all categories.
    #[must_use]
    pub fn total_via_store(&self) -> usize {
        self.counts.values().map(|c| c.via_store).sum()
    }

    /// Fields mutated directly across all categories.
    #[must_use]
    pub fn total_direct(&self) -> usize {
        self.counts.values().map(|c| c.direct).sum()
    }

    /// Fields skipped across all categories.
    #[must_use]
    pub fn total_skipped(&self) -> usize {
        self.counts.values().map(|c| c.skipped).sum()
    }

    /// Whether nothing was attempted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} via store, {} direct, {} skipped",
            self.total_via_store(),
            self.total_direct(),
            self.total_skipped()
        )?;
        for (label, counts) in self.labels() {
            write!(
                f,
                "; {label}: {}/{}/{}",
                counts.via_store, counts.direct, counts.skipped
            )?;
        }
        Ok(())
    }
}

// =============================================================================
// Field Target
// =============================================================================

/// One field the engine wants to write.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTarget {
    /// Where the member lives.
    pub path: FieldPath,
    /// Store target, or `None` to force the direct path.
    pub target_key: Option<TargetKey>,
    /// Member to write.
    pub member: Member,
}

impl FieldTarget {
    /// A field reachable through the store.
    #[must_use]
    pub fn synced(path: FieldPath, target_key: TargetKey, member: Member) -> Self {
        Self {
            path,
            target_key: Some(target_key),
            member,
        }
    }

    /// A field only reachable by direct mutation.
    #[must_use]
    pub fn direct(path: FieldPath, member: Member) -> Self {
        Self {
            path,
            target_key: None,
            member,
        }
    }
}

// =============================================================================
// Value Helpers
// =============================================================================

/// Scales a numeric value, rounding integers. Booleans do not scale.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn scale(value: FieldValue, factor: f32) -> Option<FieldValue> {
    match value {
        FieldValue::Float(v) => Some(FieldValue::Float(v * factor)),
        FieldValue::Int(v) => Some(FieldValue::Int((v as f32 * factor).round() as i32)),
        FieldValue::Bool(_) => None,
    }
}

/// Scales a numeric value only when its baseline is positive.
#[must_use]
pub fn scale_positive(value: FieldValue, factor: f32) -> Option<FieldValue> {
    value
        .as_f32()
        .filter(|v| *v > 0.0)
        .and_then(|_| scale(value, factor))
}

/// Replaces a value with an absolute one of the same kind.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn absolute(value: FieldValue, replacement: f32) -> Option<FieldValue> {
    match value {
        FieldValue::Float(_) => Some(FieldValue::Float(replacement)),
        FieldValue::Int(_) => Some(FieldValue::Int(replacement.round() as i32)),
        FieldValue::Bool(_) => None,
    }
}

// =============================================================================
// Apply Context
// =============================================================================

/// State threaded through one apply pass.
pub struct ApplyContext<'a> {
    world: &'a mut World,
    store: Option<&'a mut dyn SyncStore>,
    cache: &'a mut FallbackCache,
    dedup: &'a mut SharedAssetDeduplicator,
    catalog: &'a Catalog,
    config: &'a BalanceConfig,
    report: ApplyReport,
}

impl fmt::Debug for ApplyContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplyContext")
            .field("store", &self.store.is_some())
            .field("cached", &self.cache.len())
            .field("catalog", &self.catalog.len())
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl<'a> ApplyContext<'a> {
    /// Creates a context. Pass `store = None` to run in direct-mutation mode.
    pub fn new(
        world: &'a mut World,
        store: Option<&'a mut dyn SyncStore>,
        cache: &'a mut FallbackCache,
        dedup: &'a mut SharedAssetDeduplicator,
        catalog: &'a Catalog,
        config: &'a BalanceConfig,
    ) -> Self {
        Self {
            world,
            store,
            cache,
            dedup,
            catalog,
            config,
            report: ApplyReport::new(),
        }
    }

    /// The world being modified.
    #[must_use]
    pub fn world(&self) -> &World {
        self.world
    }

    /// Entities known this pass.
    #[must_use]
    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &'a BalanceConfig {
        self.config
    }

    /// Resolver over the active overlay.
    #[must_use]
    pub fn resolver(&self) -> Resolver<'a> {
        Resolver::new(&self.config.overlay)
    }

    /// Per-pass shared-asset deduplicator.
    pub fn dedup(&mut self) -> &mut SharedAssetDeduplicator {
        self.dedup
    }

    /// Outcomes so far.
    #[must_use]
    pub fn report(&self) -> &ApplyReport {
        &self.report
    }

    /// Consumes the context, returning its report.
    #[must_use]
    pub fn into_report(self) -> ApplyReport {
        self.report
    }

    /// The component at `path`, if it is one.
    #[must_use]
    pub fn component(&self, path: &FieldPath) -> Option<&Component> {
        match path {
            FieldPath::Component { unit, index } => self.world.unit(*unit)?.components.get(*index),
            _ => None,
        }
    }

    /// Current value of a member.
    #[must_use]
    pub fn read(&self, path: &FieldPath, member: Member) -> Option<FieldValue> {
        self.world.read(path, member)
    }

    /// Writes one field through the store, falling back to direct mutation.
    ///
    /// `compute` maps a baseline to the new value and returns `None` when
    /// the field should be left alone.
    pub fn apply_field<F>(&mut self, category: Category, target: &FieldTarget, compute: F) -> ApplyOutcome
    where
        F: Fn(FieldValue) -> Option<FieldValue>,
    {
        self.apply_labelled(category.config_key(), target, compute)
    }

    /// Like [`apply_field`](Self::apply_field), tallied under `label`.
    pub fn apply_labelled<F>(&mut self, label: &'static str, target: &FieldTarget, compute: F) -> ApplyOutcome
    where
        F: Fn(FieldValue) -> Option<FieldValue>,
    {
        let outcome = self.try_apply(target, &compute);
        self.report.record(label, outcome);
        if let ApplyOutcome::Skipped(reason) = outcome {
            debug!(
                label,
                path = %target.path,
                member = %target.member,
                reason = %reason,
                "field skipped"
            );
        }
        outcome
    }

    fn try_apply(&mut self, target: &FieldTarget, compute: &dyn Fn(FieldValue) -> Option<FieldValue>) -> ApplyOutcome {
        let Some(current) = self.world.read(&target.path, target.member) else {
            return ApplyOutcome::Skipped(SkipReason::MissingMember);
        };

        let store_key = target
            .target_key
            .as_ref()
            .filter(|_| target.member.is_syncable());
        let store = self.store.as_deref_mut().filter(|s| s.is_ready());
        if let (Some(key), Some(store)) = (store_key, store) {
            let Some(value) = compute(current) else {
                return ApplyOutcome::Skipped(SkipReason::NotApplicable);
            };
            match store.set(target.member.kind(), key, target.member.as_str(), value, true, false) {
                Ok(()) => {
                    debug!(target = %key, member = %target.member, value = %value, "override stored");
                    return ApplyOutcome::AppliedViaStore;
                }
                Err(err) => {
                    debug!(target = %key, member = %target.member, error = %err, "store rejected override, mutating directly");
                }
            }
        }

        let original = self
            .cache
            .original_or_insert(&target.path, target.member, current);
        let Some(value) = compute(original) else {
            return ApplyOutcome::Skipped(SkipReason::NotApplicable);
        };
        if self.world.write(&target.path, target.member, value) {
            debug!(path = %target.path, member = %target.member, value = %value, "field written directly");
            ApplyOutcome::AppliedDirect
        } else {
            ApplyOutcome::Skipped(SkipReason::WriteRejected)
        }
    }
}

// =============================================================================
// Apply Pass
// =============================================================================

/// Declaration of what a pass owns.
#[derive(Debug, Clone)]
pub struct PassDeclaration {
    /// Unique identifier, used in logs.
    pub id: &'static str,
    /// Categories this pass writes.
    pub categories: Vec<Category>,
}

/// One step of a full apply pass.
pub trait ApplyPass {
    /// Returns the pass declaration.
    fn declaration(&self) -> &PassDeclaration;

    /// Whether the configuration gives this pass anything to do.
    fn is_active(&self, config: &BalanceConfig) -> bool {
        self.declaration()
            .categories
            .iter()
            .any(|c| config.overlay.has_category(*c))
    }

    /// Applies the pass.
    fn run(&self, ctx: &mut ApplyContext<'_>);
}

/// Ordered list of passes making up a full apply.
pub struct Engine {
    passes: Vec<Box<dyn ApplyPass>>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<_> = self.passes.iter().map(|p| p.declaration().id).collect();
        f.debug_struct("Engine").field("passes", &ids).finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_default_passes()
    }
}

impl Engine {
    /// Creates an engine without passes.
    #[must_use]
    pub fn empty() -> Self {
        Self { passes: Vec::new() }
    }

    /// Creates an engine with every built-in pass in application order.
    #[must_use]
    pub fn with_default_passes() -> Self {
        let mut engine = Self::empty();
        engine.register(Box::new(ConstructionPass::new()));
        engine.register(Box::new(HealthPass::new()));
        engine.register(Box::new(DamagePass::new()));
        engine.register(Box::new(WeaponsPass::new()));
        engine.register(Box::new(TargetDistancePass::new()));
        engine.register(Box::new(FogOfWarPass::new()));
        engine.register(Box::new(JumpPass::new()));
        engine.register(Box::new(VisibleEventPass::new()));
        engine.register(Box::new(MovePass::new()));
        engine.register(Box::new(StrafePass::new()));
        engine.register(Box::new(TurnRadiusPass::new()));
        engine.register(Box::new(TeleportPass::new()));
        engine.register(Box::new(DispenserPass::new()));
        engine.register(Box::new(AiAimPass::new()));
        engine
    }

    /// Appends a pass.
    pub fn register(&mut self, pass: Box<dyn ApplyPass>) {
        self.passes.push(pass);
    }

    /// Pass identifiers in application order.
    #[must_use]
    pub fn pass_ids(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.declaration().id).collect()
    }

    /// Runs every active pass in order and returns the report.
    ///
    /// The deduplicator is reset first, so a shared asset is scaled once per
    /// call regardless of how many entities reference it.
    pub fn apply_all(&self, mut ctx: ApplyContext<'_>) -> ApplyReport {
        ctx.dedup().reset();
        for pass in &self.passes {
            if !pass.is_active(ctx.config()) {
                continue;
            }
            debug!(pass = pass.declaration().id, "running apply pass");
            pass.run(&mut ctx);
        }
        let report = ctx.into_report();
        info!(%report, "apply pass complete");
        report
    }
}
