//! Session lifecycle: apply on start, hot reload, revert on end.
//!
//! ```text
//! Idle -> Applying -> Active -> Reloading -> Applying -> Active
//!                        \                      (defaults) -> Active
//!                         `-> Reverting -> Idle
//! ```
//!
//! The controller owns every piece of per-session state the engine needs:
//! the fallback cache, the deduplicator, the tier gate and its subscription,
//! the chunker and the broadcast queue. Each reset point is a transition
//! here.
//!
//! Broadcasts are queued on a [`Scheduler`] and carried out by
//! [`LifecycleController::update`], which the host calls from its update
//! loop. Every queued task carries the generation it was created in; a
//! reload or session end bumps the generation, so tasks left over from an
//! earlier cycle run and do nothing.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::chunker::{ChunkReport, SyncChunker, Transport};
use crate::config::{BalanceConfig, Category, ConfigDocument, ConfigSource};
use crate::dedup::SharedAssetDeduplicator;
use crate::engine::{propagate_live, ApplyContext, ApplyReport, Engine, FallbackCache};
use crate::error::{ConfigError, LifecycleError};
use crate::host::events::SubscriptionId;
use crate::host::member::Member;
use crate::host::{ParticipantId, Session, TeamId, World};
use crate::scheduler::Scheduler;
use crate::store::{SourceEntry, SyncStore, TargetKey};
use crate::tier_gate::{TierGate, TierGateObserver};

// =============================================================================
// State
// =============================================================================

/// Where the controller is in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No overrides applied.
    Idle,
    /// A full apply pass is running.
    Applying,
    /// Overrides are applied and broadcasts are live.
    Active,
    /// Overrides were reverted and the configuration is being reloaded.
    Reloading,
    /// Overrides are being removed at session end.
    Reverting,
}

/// A queued broadcast step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTask {
    /// Start a broadcast to every remote participant.
    Broadcast {
        /// Generation the task belongs to.
        generation: u64,
    },
    /// Send to one participant, as part of a paced broadcast.
    SendTo {
        /// Recipient.
        participant: ParticipantId,
        /// Generation the task belongs to.
        generation: u64,
    },
}

// =============================================================================
// Controller
// =============================================================================

/// Drives the engine through a session.
pub struct LifecycleController<C: ConfigSource, S: SyncStore, T: Transport> {
    source: C,
    store: S,
    transport: T,
    engine: Engine,
    config: BalanceConfig,
    state: LifecycleState,
    direct_only: bool,
    catalog: Catalog,
    cache: FallbackCache,
    dedup: SharedAssetDeduplicator,
    gate: Rc<RefCell<TierGate>>,
    subscription: Option<SubscriptionId>,
    chunker: SyncChunker,
    scheduler: Scheduler<SyncTask>,
    generation: u64,
    last_report: Option<ApplyReport>,
}

impl<C: ConfigSource, S: SyncStore, T: Transport> fmt::Debug for LifecycleController<C, S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleController")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("direct_only", &self.direct_only)
            .field("cached", &self.cache.len())
            .field("pending_syncs", &self.scheduler.pending())
            .finish_non_exhaustive()
    }
}

impl<C: ConfigSource, S: SyncStore, T: Transport> LifecycleController<C, S, T> {
    /// Creates an idle controller with the default pass sequence.
    pub fn new(source: C, store: S, transport: T) -> Self {
        Self::with_engine(source, store, transport, Engine::with_default_passes())
    }

    /// Creates an idle controller running `engine`.
    pub fn with_engine(source: C, store: S, transport: T, engine: Engine) -> Self {
        Self {
            source,
            store,
            transport,
            engine,
            config: BalanceConfig::default(),
            state: LifecycleState::Idle,
            direct_only: false,
            catalog: Catalog::default(),
            cache: FallbackCache::new(),
            dedup: SharedAssetDeduplicator::new(),
            gate: Rc::new(RefCell::new(TierGate::new())),
            subscription: None,
            chunker: SyncChunker::new(),
            scheduler: Scheduler::new(),
            generation: 0,
            last_report: None,
        }
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Loads the configuration and applies it.
    ///
    /// A disabled configuration leaves the controller idle. A store that
    /// fails to initialize switches the whole session to direct mutation.
    ///
    /// # Errors
    ///
    /// Fails if the controller is not idle or the configuration cannot be
    /// loaded.
    pub fn on_session_start(&mut self, session: &mut Session) -> Result<(), LifecycleError> {
        self.require(LifecycleState::Idle, "start a session")?;
        let config = self.load_config()?;
        if !config.enabled {
            info!("balance overrides disabled in configuration");
            self.config = config;
            return Ok(());
        }
        self.config = config;
        self.apply_sync_settings();
        self.set_state(LifecycleState::Applying);

        self.direct_only = match self.store.init() {
            Ok(()) => false,
            Err(err) => {
                warn!(error = %err, "override store unavailable, using direct mutation for this session");
                true
            }
        };

        self.run_apply(session);
        self.set_state(LifecycleState::Active);
        self.scheduler.schedule(
            self.config.sync.initial_sync_delay(),
            SyncTask::Broadcast {
                generation: self.generation,
            },
        );
        Ok(())
    }

    /// Reverts everything and reapplies from a freshly loaded configuration,
    /// or stops after the revert when `defaults` is set.
    ///
    /// # Errors
    ///
    /// Fails if no session is active or the reloaded configuration cannot be
    /// parsed. In the latter case the controller stays active with every
    /// override reverted and the tier gate disarmed.
    pub fn rebalance(&mut self, session: &mut Session, defaults: bool) -> Result<(), LifecycleError> {
        self.require(LifecycleState::Active, "rebalance")?;
        self.set_state(LifecycleState::Reloading);
        self.revert(&mut session.world);

        let reloaded = if defaults {
            None
        } else {
            match self.load_config() {
                Ok(config) => Some(config),
                Err(err) => {
                    warn!(error = %err, "configuration reload failed, overrides stay reverted");
                    self.reset_to_defaults(session);
                    self.set_state(LifecycleState::Active);
                    return Err(err.into());
                }
            }
        };

        match reloaded.filter(|c| c.enabled) {
            Some(config) => {
                self.config = config;
                self.set_state(LifecycleState::Applying);
                self.run_apply(session);
            }
            None => {
                self.reset_to_defaults(session);
                info!("defaults restored");
            }
        }
        self.apply_sync_settings();

        let refreshed = propagate_live(&mut session.world, &self.catalog, self.live_store());
        debug!(refreshed, "live units refreshed after reload");
        self.set_state(LifecycleState::Active);
        self.scheduler.schedule(
            self.config.sync.reload_sync_delay(),
            SyncTask::Broadcast {
                generation: self.generation,
            },
        );
        Ok(())
    }

    /// Removes every override and returns to idle. Safe to call when idle.
    pub fn on_session_end(&mut self, session: &mut Session) {
        if self.state == LifecycleState::Idle {
            return;
        }
        self.set_state(LifecycleState::Reverting);
        self.disarm_gate(session);
        self.gate.borrow_mut().clear();
        self.revert(&mut session.world);
        propagate_live(&mut session.world, &self.catalog, self.live_store());
        self.scheduler.clear();
        self.set_state(LifecycleState::Idle);
    }

    /// Advances the broadcast queue by `dt` and carries out every due send.
    ///
    /// A broadcast sends to the first remote participant immediately and
    /// paces the rest. Returns one report per participant sent to.
    pub fn update(&mut self, dt: Duration, session: &Session) -> Vec<(ParticipantId, ChunkReport)> {
        let mut reports = Vec::new();
        for task in self.scheduler.advance(dt) {
            match task {
                SyncTask::Broadcast { generation } => {
                    if !self.is_current(generation) {
                        debug!(generation, "stale broadcast skipped");
                        continue;
                    }
                    let remote: Vec<ParticipantId> = session
                        .participants()
                        .iter()
                        .filter(|p| !p.is_server)
                        .map(|p| p.id)
                        .collect();
                    let Some((&first, rest)) = remote.split_first() else {
                        debug!("no remote participants to sync");
                        continue;
                    };
                    reports.push((first, self.send_to(first)));
                    let pacing = self.config.sync.participant_pacing();
                    for (step, &participant) in (1_u32..).zip(rest) {
                        self.scheduler.schedule(
                            pacing.checked_mul(step).unwrap_or(Duration::MAX),
                            SyncTask::SendTo {
                                participant,
                                generation,
                            },
                        );
                    }
                }
                SyncTask::SendTo {
                    participant,
                    generation,
                } => {
                    if !self.is_current(generation) {
                        debug!(participant = %participant, "stale send skipped");
                        continue;
                    }
                    if !session.participants().iter().any(|p| p.id == participant) {
                        debug!(participant = %participant, "participant left before sync");
                        continue;
                    }
                    reports.push((participant, self.send_to(participant)));
                }
            }
        }
        reports
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Whether `team` may dispense `unit` under the configured tier gates.
    #[must_use]
    pub fn can_dispense(&self, world: &World, team: TeamId, unit: &str) -> bool {
        if self.state != LifecycleState::Active {
            return true;
        }
        let Some(tier) = world.team_tier(team) else {
            return true;
        };
        let allowed = self.gate.borrow().dispense_allowed(unit, tier);
        if !allowed {
            debug!(team = %team, unit = %unit, tier, "dispense refused below minimum tier");
        }
        allowed
    }

    /// Whether the one-time unlock already fired for `team` and `unit`.
    #[must_use]
    pub fn gate_fired(&self, team: TeamId, unit: &str) -> bool {
        self.gate.borrow().has_fired(team, unit)
    }

    /// Whether the tier gate is subscribed to tier events.
    #[must_use]
    pub fn is_gate_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Loads the configuration document, lets `edit` change it and saves it
    /// back. The running configuration is untouched until the next reload.
    ///
    /// # Errors
    ///
    /// Fails if the document cannot be loaded or saved.
    pub fn edit_config<R>(&mut self, edit: impl FnOnce(&mut ConfigDocument) -> R) -> Result<R, ConfigError> {
        let mut document = self.source.load()?;
        let result = edit(&mut document);
        self.source.save(&document)?;
        Ok(result)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The configuration in force.
    #[must_use]
    pub fn config(&self) -> &BalanceConfig {
        &self.config
    }

    /// Report of the most recent apply pass.
    #[must_use]
    pub fn last_report(&self) -> Option<&ApplyReport> {
        self.last_report.as_ref()
    }

    /// Whether the store failed to initialize this session.
    #[must_use]
    pub fn is_direct_only(&self) -> bool {
        self.direct_only
    }

    /// Time since the controller was created, on the update clock.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.scheduler.now()
    }

    /// Queued broadcast steps.
    #[must_use]
    pub fn pending_syncs(&self) -> usize {
        self.scheduler.pending()
    }

    /// Current generation. Bumped by every revert.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Original values held for directly mutated fields.
    #[must_use]
    pub fn cache(&self) -> &FallbackCache {
        &self.cache
    }

    /// The catalog built by the last apply.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The override store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The override store, mutably.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The configuration source.
    pub fn source(&self) -> &C {
        &self.source
    }

    /// The configuration source, mutably.
    pub fn source_mut(&mut self) -> &mut C {
        &mut self.source
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn require(&self, expected: LifecycleState, action: &'static str) -> Result<(), LifecycleError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LifecycleError::InvalidState {
                action,
                state: self.state,
            })
        }
    }

    fn set_state(&mut self, next: LifecycleState) {
        if self.state != next {
            info!(from = ?self.state, to = ?next, "lifecycle transition");
            self.state = next;
        }
    }

    fn load_config(&mut self) -> Result<BalanceConfig, ConfigError> {
        self.source.load()?.parse()
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && self.state == LifecycleState::Active
    }

    fn live_store(&self) -> Option<&dyn SyncStore> {
        (!self.direct_only && self.store.is_ready()).then_some(&self.store as &dyn SyncStore)
    }

    fn apply_sync_settings(&mut self) {
        let limit = self.config.sync.max_message_bytes;
        self.transport.set_max_message_bytes(limit);
        debug!(limit, "transport message limit applied");
    }

    /// Builds the catalog, registers missing damage-data sources, runs every
    /// pass and arms the tier gate.
    fn run_apply(&mut self, session: &mut Session) {
        self.catalog = Catalog::build(&session.world);
        if !self.direct_only && self.config.overlay.has_category(Category::Health) {
            self.register_damage_sources();
        }

        let store = if self.direct_only {
            None
        } else {
            Some(&mut self.store as &mut dyn SyncStore)
        };
        let ctx = ApplyContext::new(
            &mut session.world,
            store,
            &mut self.cache,
            &mut self.dedup,
            &self.catalog,
            &self.config,
        );
        self.last_report = Some(self.engine.apply_all(ctx));
        self.arm_gate(session);
    }

    /// Damage data is not a built-in source. `knows_target` builds the lazy
    /// registry before anything is inserted.
    fn register_damage_sources(&mut self) {
        let mut registered = 0;
        for name in self.catalog.entries().filter_map(|e| e.damage_data.as_deref()) {
            let key = TargetKey::damage_data(name);
            if self.store.knows_target(&key) {
                continue;
            }
            if self
                .store
                .register_source(SourceEntry::from_members(key, [Member::Health]))
            {
                registered += 1;
            }
        }
        debug!(registered, "damage-data sources registered");
    }

    fn arm_gate(&mut self, session: &mut Session) {
        let armed = {
            let mut gate = self.gate.borrow_mut();
            gate.set_thresholds(&self.config.overlay);
            gate.is_armed()
        };
        if armed && self.subscription.is_none() {
            let observer = TierGateObserver(Rc::clone(&self.gate));
            self.subscription = Some(session.events.subscribe(Box::new(observer)));
            debug!("tier gate subscribed");
        } else if !armed {
            self.disarm_gate(session);
        }
    }

    /// Drops the running overlay, keeping the sync settings, so the tier
    /// gate matches a world without overrides.
    fn reset_to_defaults(&mut self, session: &mut Session) {
        self.config = BalanceConfig {
            sync: self.config.sync.clone(),
            ..BalanceConfig::default()
        };
        self.arm_gate(session);
    }

    fn disarm_gate(&mut self, session: &mut Session) {
        if let Some(id) = self.subscription.take() {
            session.events.unsubscribe(id);
            debug!("tier gate unsubscribed");
        }
    }

    /// Reverts store overrides, restores cached originals and invalidates
    /// queued broadcasts.
    fn revert(&mut self, world: &mut World) {
        if !self.direct_only && self.store.is_ready() {
            self.store.revert_all(true, false);
        }
        let restored = self.cache.restore_all(world);
        self.dedup.reset();
        self.generation += 1;
        self.scheduler.clear();
        info!(restored, generation = self.generation, "overrides reverted");
    }

    fn send_to(&mut self, participant: ParticipantId) -> ChunkReport {
        if self.direct_only {
            debug!(participant = %participant, "direct-mutation session, nothing to sync");
            return ChunkReport::default();
        }
        self.chunker
            .send_chunked(&mut self.store, &mut self.transport, participant)
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;
    use crate::chunker::LoopbackTransport;
    use crate::config::MemoryConfigSource;
    use crate::store::MemoryStore;

    type Controller = LifecycleController<MemoryConfigSource, MemoryStore, LoopbackTransport>;

    fn controller(config: &str) -> Controller {
        LifecycleController::new(
            MemoryConfigSource::new(config),
            MemoryStore::new(Vec::new()),
            LoopbackTransport::default(),
        )
    }

    #[test]
    fn disabled_config_stays_idle() {
        let mut controller = controller(r#"{"enabled": false}"#);
        let mut session = Session::default();
        controller.on_session_start(&mut session).unwrap();
        assert_eq!(controller.state(), LifecycleState::Idle);
        assert!(controller.last_report().is_none());
    }

    #[test]
    fn rebalance_requires_active_session() {
        let mut controller = controller("{}");
        let mut session = Session::default();
        let err = controller.rebalance(&mut session, false).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidState {
                state: LifecycleState::Idle,
                ..
            }
        ));
    }

    #[test]
    fn unparseable_config_prevents_applying() {
        let mut controller = controller("{ nope");
        let mut session = Session::default();
        assert!(matches!(
            controller.on_session_start(&mut session),
            Err(LifecycleError::Config(ConfigError::Parse(_)))
        ));
        assert_eq!(controller.state(), LifecycleState::Idle);
    }

    #[test]
    fn unavailable_store_switches_to_direct_mode() {
        let mut controller = LifecycleController::new(
            MemoryConfigSource::new("{}"),
            MemoryStore::unavailable(),
            LoopbackTransport::default(),
        );
        let mut session = Session::default();
        controller.on_session_start(&mut session).unwrap();
        assert!(controller.is_direct_only());
        assert_eq!(controller.state(), LifecycleState::Active);
    }

    #[test]
    fn session_end_invalidates_queued_broadcast() {
        let mut controller = controller("{}");
        let mut session = Session::default();
        controller.on_session_start(&mut session).unwrap();
        assert_eq!(controller.pending_syncs(), 1);
        let generation = controller.generation();

        controller.on_session_end(&mut session);
        assert_eq!(controller.state(), LifecycleState::Idle);
        assert_eq!(controller.pending_syncs(), 0);
        assert_eq!(controller.generation(), generation + 1);
    }

    #[test]
    fn edit_config_persists_through_source() {
        let mut controller = controller("{}");
        let previous = controller
            .edit_config(|doc| doc.set_unit_param("Tank", "cost_mult", 0.5))
            .unwrap();
        assert_eq!(previous, None);
        assert!(controller.source().text().contains("cost_mult"));
    }
}
