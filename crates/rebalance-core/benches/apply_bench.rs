use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rebalance_core::catalog::Catalog;
use rebalance_core::dedup::SharedAssetDeduplicator;
use rebalance_core::engine::{ApplyContext, FallbackCache};
use rebalance_core::host::components::{
    Component, ConstructionData, DamageData, ProjectileData, Turret, TurretSlot, Vehicle,
};
use rebalance_core::host::{ParticipantId, UnitDefinition};
use rebalance_core::{
    BalanceConfig, Engine, LoopbackTransport, MemoryStore, SyncChunker, SyncStore, World,
};

/// A world of `units` tanks sharing one projectile per group of four.
fn bench_world(units: usize) -> World {
    let mut world = World::new();
    for i in 0..units {
        let name = format!("Tank{i}");
        let shell = format!("Shell{}", i / 4);
        world.insert_construction(
            format!("{name}_CD"),
            ConstructionData {
                resource_cost: 100,
                build_up_time: 20.0,
                technology_tier: 0,
                minimum_team_tier: 0,
                maximum_base_structure_distance: 0.0,
            },
        );
        world.insert_damage_data(name.clone(), DamageData { health: 400.0 });
        world.insert_projectile(
            shell.clone(),
            ProjectileData {
                impact_damage: 25.0,
                base_speed: 200.0,
                life_time: 1.5,
                visible_event_radius: 250.0,
                ..ProjectileData::default()
            },
        );
        world.add_unit(
            UnitDefinition::new(name.clone(), format!("{name}_Prefab"))
                .with_construction(format!("{name}_CD"))
                .with_damage_data(name)
                .with_component(Component::Turret(Turret {
                    primary: TurretSlot {
                        projectile: Some(shell),
                        reload_time: 2.0,
                        fire_interval: 0.5,
                        magazine_size: 8,
                        muzzle_spread: 1.0,
                    },
                    aim_distance: 150.0,
                    ..Turret::default()
                }))
                .with_component(Component::Vehicle(Vehicle {
                    move_speed: 12.0,
                    turning_circle_radius: Some(5.0),
                })),
        );
    }
    world
}

fn bench_config(units: usize) -> BalanceConfig {
    let entries: Vec<String> = (0..units)
        .map(|i| {
            format!(
                r#""Tank{i}": {{"cost_mult": 0.8, "health_mult": 1.5, "pri_damage_mult": 1.2,
                    "range_mult": 1.1, "reload_time_mult": 0.9, "move_speed_mult": 1.25}}"#
            )
        })
        .collect();
    let json = format!(r#"{{"units": {{{}}}}}"#, entries.join(","));
    BalanceConfig::from_json_str(&json).expect("bench config parses")
}

fn bench_apply_store_path(c: &mut Criterion) {
    let world = bench_world(64);
    let config = bench_config(64);
    let engine = Engine::with_default_passes();

    c.bench_function("apply_store_path_64", |b| {
        b.iter(|| {
            let mut world = world.clone();
            let mut store = MemoryStore::from_world(&world);
            store.init().expect("store available");
            let mut cache = FallbackCache::new();
            let mut dedup = SharedAssetDeduplicator::new();
            let catalog = Catalog::build(&world);
            let ctx = ApplyContext::new(
                &mut world,
                Some(&mut store as &mut dyn SyncStore),
                &mut cache,
                &mut dedup,
                &catalog,
                &config,
            );
            black_box(engine.apply_all(ctx))
        })
    });
}

fn bench_apply_direct_path(c: &mut Criterion) {
    // Reapplying keeps values stable, so the world can be reused
    let mut world = bench_world(64);
    let config = bench_config(64);
    let engine = Engine::with_default_passes();
    let mut cache = FallbackCache::new();
    let mut dedup = SharedAssetDeduplicator::new();

    c.bench_function("apply_direct_path_64", |b| {
        b.iter(|| {
            let catalog = Catalog::build(&world);
            let ctx = ApplyContext::new(&mut world, None, &mut cache, &mut dedup, &catalog, &config);
            black_box(engine.apply_all(ctx))
        })
    });
}

fn bench_chunked_send(c: &mut Criterion) {
    let mut world = bench_world(64);
    let config = bench_config(64);
    let mut store = MemoryStore::from_world(&world);
    store.init().expect("store available");
    let mut cache = FallbackCache::new();
    let mut dedup = SharedAssetDeduplicator::new();
    let catalog = Catalog::build(&world);
    Engine::with_default_passes().apply_all(ApplyContext::new(
        &mut world,
        Some(&mut store as &mut dyn SyncStore),
        &mut cache,
        &mut dedup,
        &catalog,
        &config,
    ));
    let chunker = SyncChunker::new();

    c.bench_function("chunked_send_64", |b| {
        b.iter(|| {
            let mut transport = LoopbackTransport::default();
            black_box(chunker.send_chunked(&mut store, &mut transport, black_box(ParticipantId::new(1))))
        })
    });
}

criterion_group!(benches, bench_apply_store_path, bench_apply_direct_path, bench_chunked_send);
criterion_main!(benches);
