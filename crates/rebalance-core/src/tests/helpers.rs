//! Test helper functions for building worlds, sessions and controllers.
//!
//! This module provides factory functions and setup utilities shared by the
//! integration and property tests.

use crate::catalog::Catalog;
use crate::chunker::LoopbackTransport;
use crate::config::{BalanceConfig, MemoryConfigSource};
use crate::dedup::SharedAssetDeduplicator;
use crate::engine::{ApplyContext, ApplyReport, Engine, FallbackCache};
use crate::host::components::{
    AiAiming, Air, Component, ConstructionData, Creature, CreatureAttack, DamageData, Dispenser,
    ProjectileData, Sensor, Soldier, Teleport, Turret, TurretSlot, Vehicle,
};
use crate::host::member::{FieldValue, Member};
use crate::host::{FieldPath, Participant, ParticipantId, Session, TeamId, UnitDefinition, World};
use crate::lifecycle::LifecycleController;
use crate::store::{MemoryStore, SyncStore, TargetKey};

/// Controller type used throughout the tests.
pub type TestController = LifecycleController<MemoryConfigSource, MemoryStore, LoopbackTransport>;

/// Team that starts at tier 2.
pub const BLUE: TeamId = TeamId::new(1);
/// Team that starts at tier 1.
pub const RED: TeamId = TeamId::new(2);

/// The server's own participant.
pub const SERVER: ParticipantId = ParticipantId::new(0);
/// First remote participant.
pub const ALICE: ParticipantId = ParticipantId::new(1);
/// Second remote participant.
pub const BOB: ParticipantId = ParticipantId::new(2);
/// Third remote participant.
pub const CAROL: ParticipantId = ParticipantId::new(3);

// =============================================================================
// World Fixtures
// =============================================================================

fn projectile(impact: f32, speed: f32, life: f32) -> ProjectileData {
    ProjectileData {
        impact_damage: impact,
        base_speed: speed,
        life_time: life,
        visible_event_radius: 300.0,
        ..ProjectileData::default()
    }
}

fn turret_slot(projectile: &str) -> TurretSlot {
    TurretSlot {
        projectile: Some(projectile.to_string()),
        reload_time: 2.0,
        fire_interval: 0.5,
        magazine_size: 10,
        muzzle_spread: 1.0,
    }
}

fn sensor() -> Component {
    Component::Sensor(Sensor {
        targeting_distance: 120.0,
        fog_of_war_view_distance: 100.0,
    })
}

/// Builds the standard test world.
///
/// Units, in definition order:
/// - `Widget`: turret (primary `WidgetShell`, secondary `WidgetRocket`),
///   sensor and vehicle movement; costs 100 and has 500 health
/// - `Gunboat` and `Frigate`: both fire the shared `SharedShell`
/// - `Lancer`: fires the instant-hit `RailSlug`
/// - `Shrimp`: creature with a melee primary and a spitting secondary
/// - `Hoverbike`: dispensable vehicle
/// - `Pad`: dispenses `Hoverbike`
/// - `Commander`: teleporting soldier
/// - `Gunship`: aircraft
/// - `Tier 3 Research`: technology item at tier 3
///
/// Team [`BLUE`] is at tier 2, team [`RED`] at tier 1.
#[must_use]
pub fn fixture_world() -> World {
    let mut world = World::new();

    world.insert_construction(
        "Widget_CD",
        ConstructionData {
            resource_cost: 100,
            build_up_time: 30.0,
            technology_tier: 0,
            minimum_team_tier: 0,
            maximum_base_structure_distance: 250.0,
        },
    );
    world.insert_construction(
        "Hoverbike_CD",
        ConstructionData {
            resource_cost: 40,
            build_up_time: 10.0,
            technology_tier: 0,
            minimum_team_tier: 0,
            maximum_base_structure_distance: 0.0,
        },
    );
    world.insert_construction(
        "Tech3_CD",
        ConstructionData {
            resource_cost: 500,
            build_up_time: 120.0,
            technology_tier: 3,
            minimum_team_tier: 2,
            maximum_base_structure_distance: 0.0,
        },
    );
    world.insert_damage_data("Widget", DamageData { health: 500.0 });
    world.insert_damage_data("Gunboat", DamageData { health: 800.0 });

    world.insert_projectile("WidgetShell", ProjectileData {
        ricochet_damage: 5.0,
        ..projectile(20.0, 200.0, 2.0)
    });
    world.insert_projectile("WidgetRocket", ProjectileData {
        splash_damage_max: 30.0,
        ..projectile(50.0, 100.0, 4.0)
    });
    world.insert_projectile("SharedShell", projectile(30.0, 250.0, 1.6));
    world.insert_projectile("RailSlug", ProjectileData {
        visible_event_radius: 500.0,
        instant_hit: true,
        ..projectile(80.0, 400.0, 0.2)
    });
    world.insert_projectile("ShrimpSpit", projectile(10.0, 50.0, 2.0));

    world.add_unit(
        UnitDefinition::new("Widget", "Widget_Prefab")
            .with_construction("Widget_CD")
            .with_damage_data("Widget")
            .with_component(Component::Turret(Turret {
                primary: turret_slot("WidgetShell"),
                secondary: turret_slot("WidgetRocket"),
                aim_distance: 150.0,
            }))
            .with_component(sensor())
            .with_component(Component::Vehicle(Vehicle {
                move_speed: 10.0,
                turning_circle_radius: Some(6.0),
            })),
    );
    for (name, asset) in [("Gunboat", "Gunboat_Prefab"), ("Frigate", "Frigate_Prefab")] {
        world.add_unit(
            UnitDefinition::new(name, asset)
                .with_damage_data("Gunboat")
                .with_component(Component::Turret(Turret {
                    primary: turret_slot("SharedShell"),
                    aim_distance: 200.0,
                    ..Turret::default()
                })),
        );
    }
    world.add_unit(
        UnitDefinition::new("Lancer", "Lancer_Prefab").with_component(Component::Turret(Turret {
            primary: turret_slot("RailSlug"),
            aim_distance: 400.0,
            ..Turret::default()
        })),
    );
    world.add_unit(
        UnitDefinition::new("Shrimp", "Shrimp_Prefab")
            .with_component(Component::Creature(Creature {
                primary: Some(CreatureAttack {
                    projectile: None,
                    damage: 25.0,
                    aim_dist_max: 0.0,
                    spread: 0.0,
                }),
                secondary: Some(CreatureAttack {
                    projectile: Some("ShrimpSpit".to_string()),
                    damage: 0.0,
                    aim_dist_max: 60.0,
                    spread: 4.0,
                }),
                move_speed: 6.0,
                fly_move_speed: 0.0,
                fly_move_scale_side: 0.0,
                ai_melee_distance: 3.0,
            }))
            .with_component(sensor())
            .with_component(Component::AiAiming(AiAiming { aim_paused: false })),
    );
    world.add_unit(
        UnitDefinition::new("Hoverbike", "Hoverbike_Prefab")
            .with_construction("Hoverbike_CD")
            .with_component(Component::Vehicle(Vehicle {
                move_speed: 25.0,
                turning_circle_radius: Some(4.0),
            })),
    );
    world.add_unit(
        UnitDefinition::new("Pad", "Pad_Prefab").with_component(Component::Dispenser(Dispenser {
            dispensed_unit: "Hoverbike".to_string(),
            dispense_timeout: 60.0,
            local_timeout: 30.0,
        })),
    );
    world.add_unit(
        UnitDefinition::new("Commander", "Commander_Prefab")
            .with_component(Component::Soldier(Soldier {
                walk_speed: 2.0,
                run_speed: 4.0,
                sprint_speed: 6.0,
                jump_speed: 3.0,
            }))
            .with_component(Component::Teleport(Teleport {
                cooldown_time: 30.0,
                teleport_time: 5.0,
            })),
    );
    world.add_unit(
        UnitDefinition::new("Gunship", "Gunship_Prefab").with_component(Component::Air(Air {
            forward_speed: 40.0,
            strafe_speed: 20.0,
            turbo_speed: 60.0,
        })),
    );
    world.add_unit(UnitDefinition::new("Tier 3 Research", "Tech3_Prefab").with_construction("Tech3_CD"));

    world.add_team(BLUE, 2);
    world.add_team(RED, 1);
    world
}

/// Builds a session over [`fixture_world`] with the server and three remote
/// participants connected, and a live `Pad` and `Widget` for [`BLUE`].
#[must_use]
pub fn fixture_session() -> Session {
    let mut session = Session::new(fixture_world());
    session.join(Participant::server(SERVER.raw()));
    session.join(Participant::remote(ALICE.raw(), "alice"));
    session.join(Participant::remote(BOB.raw(), "bob"));
    session.join(Participant::remote(CAROL.raw(), "carol"));
    session.world.spawn_live("Pad", BLUE);
    session.world.spawn_live("Widget", BLUE);
    session
}

// =============================================================================
// Controllers
// =============================================================================

/// Creates an idle controller whose store knows every asset in `world`.
///
/// # Arguments
///
/// * `config` - Balance document text
/// * `world` - World the store's built-in sources are taken from
#[must_use]
pub fn controller(config: &str, world: &World) -> TestController {
    LifecycleController::new(
        MemoryConfigSource::new(config),
        MemoryStore::from_world(world),
        LoopbackTransport::default(),
    )
}

/// Creates an idle controller whose store never becomes available.
#[must_use]
pub fn direct_controller(config: &str) -> TestController {
    LifecycleController::new(
        MemoryConfigSource::new(config),
        MemoryStore::unavailable(),
        LoopbackTransport::default(),
    )
}

/// Creates a controller and starts it against a fresh [`fixture_session`].
///
/// # Panics
///
/// Panics if the session cannot be started.
#[must_use]
pub fn started(config: &str) -> (TestController, Session) {
    let mut session = fixture_session();
    let mut controller = controller(config, &session.world);
    controller
        .on_session_start(&mut session)
        .expect("session should start");
    (controller, session)
}

// =============================================================================
// Direct Engine Harness
// =============================================================================

/// Runs the engine without a lifecycle controller, keeping the fallback
/// cache and store between applies.
#[derive(Debug)]
pub struct ApplyHarness {
    /// World being modified.
    pub world: World,
    /// Override store, `None` for direct mutation.
    pub store: Option<MemoryStore>,
    /// Fallback originals.
    pub cache: FallbackCache,
    dedup: SharedAssetDeduplicator,
    engine: Engine,
}

impl ApplyHarness {
    /// Harness writing through a ready store built from `world`.
    ///
    /// # Panics
    ///
    /// Panics if the store fails to initialize.
    #[must_use]
    pub fn with_store(world: World) -> Self {
        let mut store = MemoryStore::from_world(&world);
        store.init().expect("memory store should initialize");
        Self {
            world,
            store: Some(store),
            cache: FallbackCache::new(),
            dedup: SharedAssetDeduplicator::new(),
            engine: Engine::with_default_passes(),
        }
    }

    /// Harness mutating the world directly.
    #[must_use]
    pub fn direct(world: World) -> Self {
        Self {
            world,
            store: None,
            cache: FallbackCache::new(),
            dedup: SharedAssetDeduplicator::new(),
            engine: Engine::with_default_passes(),
        }
    }

    /// Runs a full apply pass for `config`.
    pub fn apply(&mut self, config: &BalanceConfig) -> ApplyReport {
        let catalog = Catalog::build(&self.world);
        let store = self.store.as_mut().map(|s| s as &mut dyn SyncStore);
        let ctx = ApplyContext::new(
            &mut self.world,
            store,
            &mut self.cache,
            &mut self.dedup,
            &catalog,
            config,
        );
        self.engine.apply_all(ctx)
    }

    /// Effective value: the store override if present, else the world's.
    #[must_use]
    pub fn effective(&self, path: &FieldPath, key: &TargetKey, member: Member) -> Option<FieldValue> {
        self.store
            .as_ref()
            .and_then(|s| s.get(key, member.as_str()))
            .or_else(|| self.world.read(path, member))
    }
}

// =============================================================================
// Values
// =============================================================================

/// Parses a configuration, panicking on malformed test input.
///
/// # Panics
///
/// Panics if `json` is not a valid document.
#[must_use]
pub fn config(json: &str) -> BalanceConfig {
    BalanceConfig::from_json_str(json).expect("test config should parse")
}

/// Path of a projectile asset.
#[must_use]
pub fn projectile_path(name: &str) -> FieldPath {
    FieldPath::Projectile(name.to_string())
}

/// Path of a construction asset.
#[must_use]
pub fn construction_path(name: &str) -> FieldPath {
    FieldPath::Construction(name.to_string())
}

/// Reads a float, panicking if the value is missing or not a float.
///
/// # Panics
///
/// Panics if `value` is not `Some(FieldValue::Float(_))`.
#[must_use]
pub fn float(value: Option<FieldValue>) -> f32 {
    match value {
        Some(FieldValue::Float(v)) => v,
        other => panic!("expected a float, got {other:?}"),
    }
}

/// Approximate float equality.
#[must_use]
pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}
