//! Integration tests for the full override pipeline.
//!
//! These tests verify that:
//! - Resolved values reach the store (or the world in direct mode)
//! - Shared projectiles are scaled once per apply-cycle
//! - Re-apply, reload and revert behave idempotently
//! - Broadcasts are split per target and paced per participant
//! - The tier gate fires once per team and unit
//! - Operator commands edit the document and take effect on reload

use std::time::Duration;

use super::helpers::{
    approx, config, construction_path, controller, direct_controller, fixture_session,
    fixture_world, float, projectile_path, started, ApplyHarness, TestController, ALICE, BLUE,
    BOB, CAROL, SERVER,
};
use crate::commands::{AuditLog, OperatorCommand};
use crate::config::Category;
use crate::host::components::Component;
use crate::host::member::{FieldValue, Member, Slot};
use crate::host::{FieldPath, Participant, UnitId};
use crate::lifecycle::LifecycleState;
use crate::store::{active_targets, StoreNotification, SyncStore, TargetKey};

fn widget_cost(controller: &TestController) -> Option<FieldValue> {
    controller
        .store()
        .get(&TargetKey::asset("Widget_CD"), "ResourceCost")
}

// =============================================================================
// Store Path
// =============================================================================

#[test]
fn widget_cost_halves_through_store() {
    let (controller, session) = started(r#"{"units": {"Widget": {"cost_mult": 0.5}}}"#);

    assert_eq!(controller.state(), LifecycleState::Active);
    assert_eq!(widget_cost(&controller), Some(FieldValue::Int(50)));
    // The definition itself is untouched on the store path.
    assert_eq!(
        session.world.construction("Widget_CD").unwrap().resource_cost,
        100
    );
    let report = controller.last_report().unwrap();
    assert_eq!(report.counts(Category::Cost).via_store, 1);
    assert!(controller.cache().is_empty());
}

#[test]
fn cost_and_build_time_clamp_to_floors() {
    let (controller, _session) =
        started(r#"{"units": {"Widget": {"cost_mult": 0.001, "build_time_mult": 0.001}}}"#);

    assert_eq!(widget_cost(&controller), Some(FieldValue::Int(1)));
    assert_eq!(
        controller
            .store()
            .get(&TargetKey::asset("Widget_CD"), "BuildUpTime"),
        Some(FieldValue::Float(0.5))
    );
}

#[test]
fn primary_damage_leaves_secondary_alone() {
    let (controller, _session) = started(r#"{"units": {"Widget": {"pri_damage_mult": 2.0}}}"#);
    let store = controller.store();
    let shell = TargetKey::asset("WidgetShell");

    assert_eq!(store.get(&shell, "m_fImpactDamage"), Some(FieldValue::Float(40.0)));
    assert_eq!(store.get(&shell, "m_fRicochetDamage"), Some(FieldValue::Float(10.0)));
    // Zero baselines are never scaled.
    assert_eq!(store.get(&shell, "m_fSplashDamageMax"), None);
    assert!(store.overrides().get(&TargetKey::asset("WidgetRocket")).is_none());
}

#[test]
fn shared_projectile_is_scaled_once_per_cycle() {
    let (controller, _session) = started(
        r#"{"units": {"Gunboat": {"damage_mult": 1.5}, "Frigate": {"damage_mult": 1.5}}}"#,
    );

    assert_eq!(
        controller
            .store()
            .get(&TargetKey::asset("SharedShell"), "m_fImpactDamage"),
        Some(FieldValue::Float(45.0))
    );
    let counts = controller.last_report().unwrap().counts(Category::Damage);
    assert_eq!(counts.via_store, 1);
}

#[test]
fn per_projectile_absolute_beats_damage_multiplier() {
    let (controller, _session) = started(
        r#"{"units": {"Widget": {
            "damage_mult": 3.0,
            "projectiles": {"WidgetShell": {"m_fImpactDamage": 99}}
        }}}"#,
    );
    let store = controller.store();

    assert_eq!(
        store.get(&TargetKey::asset("WidgetShell"), "m_fImpactDamage"),
        Some(FieldValue::Float(99.0))
    );
    assert_eq!(
        store.get(&TargetKey::asset("WidgetRocket"), "m_fImpactDamage"),
        Some(FieldValue::Float(150.0))
    );
}

#[test]
fn range_scales_lifetime_and_speed_independently() {
    let (controller, session) =
        started(r#"{"units": {"Widget": {"pri_range_mult": 1.5, "pri_proj_speed_mult": 2.0}}}"#);
    let shell = TargetKey::asset("WidgetShell");
    let store = controller.store();

    let speed = float(store.get(&shell, "m_fBaseSpeed"));
    let lifetime = float(store.get(&shell, "m_fLifeTime"));
    assert!(approx(speed, 400.0));
    assert!(approx(lifetime, 3.0));
    let baseline = session.world.projectile("WidgetShell").unwrap().range();
    assert!(approx(speed * lifetime, baseline * 2.0 * 1.5));

    // Turret aim follows the primary range multiplier.
    assert_eq!(
        store.get(&TargetKey::asset("Widget_Prefab"), "AimDistance"),
        Some(FieldValue::Float(225.0))
    );
}

#[test]
fn instant_hit_range_scales_distance_and_visible_radius() {
    let (controller, _session) = started(r#"{"units": {"Lancer": {"range_mult": 2.0}}}"#);
    let slug = TargetKey::asset("RailSlug");
    let store = controller.store();

    assert_eq!(store.get(&slug, "m_fBaseSpeed"), Some(FieldValue::Float(800.0)));
    assert_eq!(store.get(&slug, "VisibleEventRadius"), Some(FieldValue::Float(1000.0)));
    assert_eq!(store.get(&slug, "m_fLifeTime"), None);
}

#[test]
fn health_goes_through_registered_damage_source() {
    let (controller, _session) =
        started(r#"{"units": {"Widget": {"health_mult": 2.0, "cost_mult": 0.5}}}"#);
    let store = controller.store();

    assert_eq!(
        store.get(&TargetKey::damage_data("Widget"), "Health"),
        Some(FieldValue::Float(1000.0))
    );
    // Built-in sources survived the registration.
    assert_eq!(widget_cost(&controller), Some(FieldValue::Int(50)));
    assert!(store.sources_built());
}

#[test]
fn tech_tier_time_replaces_construction_overrides() {
    let (controller, _session) = started(
        r#"{"tech_time": {"tier_3": 45}, "units": {"Tier 3 Research": {"cost_mult": 0.5}}}"#,
    );
    let target = TargetKey::asset("Tech3_CD");

    assert_eq!(
        controller.store().get(&target, "BuildUpTime"),
        Some(FieldValue::Float(45.0))
    );
    assert_eq!(controller.store().get(&target, "ResourceCost"), None);
}

#[test]
fn global_teleport_and_dispenser_values_reach_every_carrier() {
    let (controller, _session) = started(
        r#"{"units": {"_teleport": {"cooldown": 10, "duration": 2}, "Pad": {"dispense_timeout": 15}}}"#,
    );
    let store = controller.store();
    let commander = TargetKey::asset("Commander_Prefab");

    assert_eq!(store.get(&commander, "TeleportCooldownTime"), Some(FieldValue::Float(10.0)));
    assert_eq!(store.get(&commander, "TeleportTime"), Some(FieldValue::Float(2.0)));
    assert_eq!(
        store.get(&TargetKey::asset("Pad_Prefab"), "DispenseTimeout"),
        Some(FieldValue::Float(15.0))
    );
}

#[test]
fn movement_falls_back_to_move_multiplier() {
    let (controller, _session) = started(
        r#"{"units": {"Gunship": {"move_speed_mult": 2.0, "strafe_speed_mult": 0.25}}}"#,
    );
    let store = controller.store();
    let gunship = TargetKey::asset("Gunship_Prefab");

    assert_eq!(store.get(&gunship, "ForwardSpeed"), Some(FieldValue::Float(80.0)));
    assert_eq!(store.get(&gunship, "TurboSpeed"), Some(FieldValue::Float(120.0)));
    // Strafe is owned by the strafe pass: baseline * move * strafe.
    assert_eq!(store.get(&gunship, "StrafeSpeed"), Some(FieldValue::Float(10.0)));
}

// =============================================================================
// Idempotence and Revert
// =============================================================================

#[test]
fn reapply_is_idempotent_on_store_path() {
    let cfg = config(r#"{"units": {"Widget": {"pri_range_mult": 1.5, "health_mult": 1.2}}}"#);
    let mut harness = ApplyHarness::with_store(fixture_world());
    let shell = projectile_path("WidgetShell");
    let key = TargetKey::asset("WidgetShell");

    harness.apply(&cfg);
    let first = harness.effective(&shell, &key, Member::LifeTime);
    harness.apply(&cfg);

    assert_eq!(harness.effective(&shell, &key, Member::LifeTime), first);
    assert_eq!(first, Some(FieldValue::Float(3.0)));
}

#[test]
fn reapply_is_idempotent_on_direct_path() {
    let cfg = config(r#"{"units": {"Widget": {"cost_mult": 0.5, "pri_magazine_mult": 1.25}}}"#);
    let mut harness = ApplyHarness::direct(fixture_world());
    let turret = FieldPath::Component {
        unit: UnitId::new(0),
        index: 0,
    };

    harness.apply(&cfg);
    harness.apply(&cfg);
    harness.apply(&cfg);

    let cd = harness.world.construction("Widget_CD").unwrap();
    assert_eq!(cd.resource_cost, 50);
    assert_eq!(
        harness.world.read(&turret, Member::MagazineSize(Slot::Primary)),
        Some(FieldValue::Int(13))
    );
    assert_eq!(
        harness.cache.original(&construction_path("Widget_CD"), Member::ResourceCost),
        Some(FieldValue::Int(100))
    );
}

#[test]
fn direct_revert_then_reapply_matches_single_apply() {
    let mut session = fixture_session();
    let mut controller = direct_controller(r#"{"units": {"Widget": {"cost_mult": 0.5}}}"#);
    controller.on_session_start(&mut session).unwrap();
    assert!(controller.is_direct_only());
    assert_eq!(session.world.construction("Widget_CD").unwrap().resource_cost, 50);

    controller.rebalance(&mut session, false).unwrap();
    assert_eq!(session.world.construction("Widget_CD").unwrap().resource_cost, 50);

    controller.on_session_end(&mut session);
    assert_eq!(session.world.construction("Widget_CD").unwrap().resource_cost, 100);
    assert!(controller.cache().is_empty());
}

#[test]
fn restore_defaults_clears_store_and_notifies() {
    let (mut controller, mut session) = started(r#"{"units": {"Widget": {"cost_mult": 0.5}}}"#);
    assert!(!controller.store().overrides().is_empty());

    controller.rebalance(&mut session, true).unwrap();

    assert_eq!(controller.state(), LifecycleState::Active);
    assert!(controller.store().overrides().is_empty());
    assert!(controller.config().overlay.is_empty());
    assert_eq!(
        controller.store().notifications().last(),
        Some(&StoreNotification::RevertAll)
    );
}

#[test]
fn failed_reload_stays_active_with_overrides_reverted() {
    let (mut controller, mut session) = started(r#"{"units": {"Widget": {"cost_mult": 0.5}}}"#);
    controller.source_mut().set_text("{ broken");

    assert!(controller.rebalance(&mut session, false).is_err());
    assert_eq!(controller.state(), LifecycleState::Active);
    assert!(controller.store().overrides().is_empty());
}

#[test]
fn failed_reload_disarms_tier_gate() {
    let (mut controller, mut session) = started(r#"{"units": {"Hoverbike": {"min_tier": 3}}}"#);
    assert!(!controller.can_dispense(&session.world, BLUE, "Hoverbike"));
    controller.source_mut().set_text("{ broken");

    assert!(controller.rebalance(&mut session, false).is_err());
    assert_eq!(controller.state(), LifecycleState::Active);
    assert!(!controller.is_gate_subscribed());
    assert_eq!(session.events.observer_count(), 0);
    assert!(controller.can_dispense(&session.world, BLUE, "Hoverbike"));
}

// =============================================================================
// Broadcast
// =============================================================================

#[test]
fn broadcast_is_chunked_per_target_and_paced() {
    let (mut controller, session) = started(
        r#"{"units": {"Widget": {"cost_mult": 0.5, "pri_damage_mult": 2.0, "move_speed_mult": 1.5}}}"#,
    );
    let targets = active_targets(controller.store().overrides()).len();
    assert_eq!(targets, 3);

    assert!(controller.update(Duration::from_secs(1), &session).is_empty());
    let reports = controller.update(Duration::from_secs(1), &session);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, ALICE);
    assert_eq!(reports[0].1.sent, targets);

    let reports = controller.update(Duration::from_millis(500), &session);
    assert_eq!(reports.iter().map(|(p, _)| *p).collect::<Vec<_>>(), vec![BOB]);
    let reports = controller.update(Duration::from_millis(500), &session);
    assert_eq!(reports.iter().map(|(p, _)| *p).collect::<Vec<_>>(), vec![CAROL]);

    let transport = controller.transport();
    assert_eq!(transport.deliveries().len(), targets * 3);
    assert!(transport.deliveries().iter().all(|d| d.targets().count() == 1));
    assert_eq!(transport.deliveries_to(SERVER).count(), 0);
    // The store shows the full set again after every chunked send.
    assert_eq!(active_targets(controller.store().overrides()).len(), targets);
}

#[test]
fn participant_leaving_mid_broadcast_is_skipped() {
    let (mut controller, mut session) = started(r#"{"units": {"Widget": {"cost_mult": 0.5}}}"#);
    controller.update(Duration::from_secs(2), &session);
    session.leave(BOB);

    let reports = controller.update(Duration::from_secs(1), &session);
    assert_eq!(reports.iter().map(|(p, _)| *p).collect::<Vec<_>>(), vec![CAROL]);
}

#[test]
fn reload_replaces_queued_broadcast() {
    let (mut controller, mut session) = started(r#"{"units": {"Widget": {"cost_mult": 0.5}}}"#);
    let generation = controller.generation();

    controller.rebalance(&mut session, false).unwrap();
    assert_eq!(controller.generation(), generation + 1);
    assert_eq!(controller.pending_syncs(), 1);

    let reports = controller.update(Duration::from_millis(500), &session);
    assert_eq!(reports.len(), 1);
    assert_eq!(widget_cost(&controller), Some(FieldValue::Int(50)));
}

#[test]
fn configured_message_limit_reaches_transport() {
    let (mut controller, session) =
        started(r#"{"sync": {"max_message_bytes": 10}, "units": {"Widget": {"cost_mult": 0.5}}}"#);
    assert_eq!(controller.transport().max_message_bytes(), 10);

    let reports = controller.update(Duration::from_secs(3), &session);
    assert!(!reports.is_empty());
    assert!(reports.iter().all(|(_, r)| r.sent == 0 && !r.failed.is_empty()));
    assert!(controller.transport().deliveries().is_empty());
}

#[test]
fn huge_pacing_parks_later_participants() {
    let (mut controller, session) = started(
        r#"{"sync": {"participant_pacing_secs": 1e19}, "units": {"Widget": {"cost_mult": 0.5}}}"#,
    );

    let reports = controller.update(Duration::from_secs(3), &session);
    assert_eq!(reports.iter().map(|(p, _)| *p).collect::<Vec<_>>(), vec![ALICE]);
    assert_eq!(controller.pending_syncs(), 2);
    assert!(controller.update(Duration::from_secs(3600), &session).is_empty());
}

#[test]
fn direct_mode_has_nothing_to_send() {
    let mut session = fixture_session();
    let mut controller = direct_controller(r#"{"units": {"Widget": {"cost_mult": 0.5}}}"#);
    controller.on_session_start(&mut session).unwrap();

    let reports = controller.update(Duration::from_secs(5), &session);
    assert!(reports.iter().all(|(_, r)| r.sent == 0 && r.total == 0));
    assert!(controller.transport().deliveries().is_empty());
    assert!(controller.last_report().unwrap().total_direct() > 0);
}

// =============================================================================
// Tier Gate
// =============================================================================

#[test]
fn tier_gate_fires_once_for_team_and_unit() {
    let (controller, mut session) = started(r#"{"units": {"Hoverbike": {"min_tier": 3}}}"#);
    assert!(controller.is_gate_subscribed());
    assert!(!controller.can_dispense(&session.world, BLUE, "Hoverbike"));

    session.set_team_tier(BLUE, 3);
    assert!(controller.gate_fired(BLUE, "Hoverbike"));
    assert!(controller.can_dispense(&session.world, BLUE, "Hoverbike"));
    let pad = |session: &crate::host::Session| {
        session.world.live_units()[0].components[0]
            .as_dispenser()
            .unwrap()
            .local_timeout
    };
    assert!(approx(pad(&session), 0.0));

    // A later crossing does not reset again.
    for live in session.world.live_units_mut() {
        for component in &mut live.components {
            if let Component::Dispenser(d) = component {
                d.local_timeout = 30.0;
            }
        }
    }
    session.set_team_tier(BLUE, 2);
    session.set_team_tier(BLUE, 4);
    assert!(approx(pad(&session), 30.0));
}

#[test]
fn session_end_unsubscribes_tier_gate() {
    let (mut controller, mut session) = started(r#"{"units": {"Hoverbike": {"min_tier": 3}}}"#);
    assert_eq!(session.events.observer_count(), 1);

    controller.on_session_end(&mut session);
    assert_eq!(session.events.observer_count(), 0);
    assert!(!controller.gate_fired(BLUE, "Hoverbike"));
}

#[test]
fn no_min_tier_means_no_subscription() {
    let (controller, session) = started(r#"{"units": {"Widget": {"cost_mult": 0.5}}}"#);
    assert!(!controller.is_gate_subscribed());
    assert_eq!(session.events.observer_count(), 0);
}

// =============================================================================
// Live Units and AI
// =============================================================================

#[test]
fn live_units_follow_reload() {
    let (mut controller, mut session) = started("{}");
    controller
        .edit_config(|doc| doc.set_unit_param("Widget", "move_speed_mult", 2.0))
        .unwrap();
    controller.rebalance(&mut session, false).unwrap();

    let widget = session
        .world
        .live_units()
        .iter()
        .find(|l| l.unit_name == "Widget")
        .unwrap();
    match &widget.components[2] {
        Component::Vehicle(v) => assert!(approx(v.move_speed, 20.0)),
        other => panic!("expected vehicle, got {other:?}"),
    }
}

#[test]
fn shrimp_aim_disabled_by_flag() {
    let (_controller, session) = started(r#"{"shrimp_disable_aim": true}"#);
    let shrimp = session.world.unit(UnitId::new(4)).unwrap();

    let creature = shrimp.components[0].as_creature().unwrap();
    assert!(approx(creature.ai_melee_distance, 0.0));
    match (&shrimp.components[1], &shrimp.components[2]) {
        (Component::Sensor(s), Component::AiAiming(a)) => {
            assert!(approx(s.targeting_distance, 0.0));
            assert!(a.aim_paused);
        }
        other => panic!("unexpected components {other:?}"),
    }
}

#[test]
fn creature_melee_damage_is_written_directly() {
    let (controller, session) = started(r#"{"units": {"Shrimp": {"damage_mult": 2.0}}}"#);
    let creature = session.world.unit(UnitId::new(4)).unwrap().components[0]
        .as_creature()
        .unwrap();

    assert!(approx(creature.primary.as_ref().unwrap().damage, 50.0));
    assert_eq!(
        controller
            .store()
            .get(&TargetKey::asset("ShrimpSpit"), "m_fImpactDamage"),
        Some(FieldValue::Float(20.0))
    );
}

// =============================================================================
// Operator Commands
// =============================================================================

#[test]
fn set_then_rebalance_applies_and_audits() {
    let mut session = fixture_session();
    let mut controller = controller("{}", &session.world);
    controller.on_session_start(&mut session).unwrap();
    let operator = Participant::remote(ALICE.raw(), "alice");
    let mut audit = AuditLog::new();

    let reply = OperatorCommand::parse("set Widget cost_mult 0.5")
        .unwrap()
        .execute(&mut controller, &mut session, &operator, &mut audit)
        .unwrap();
    assert!(reply.contains("rebalance"));
    assert_eq!(widget_cost(&controller), None);

    OperatorCommand::parse("rebalance")
        .unwrap()
        .execute(&mut controller, &mut session, &operator, &mut audit)
        .unwrap();
    assert_eq!(widget_cost(&controller), Some(FieldValue::Int(50)));

    let lines: Vec<_> = audit.lines().collect();
    assert_eq!(lines, vec!["[t=0.0] alice (1): Widget cost_mult unset -> 0.5"]);
}

#[test]
fn set_audits_the_value_written_to_the_document() {
    let (mut controller, mut session) = started("{}");
    let operator = Participant::remote(ALICE.raw(), "alice");
    let mut audit = AuditLog::new();

    for line in ["set Hoverbike min_tier 2.6", "set Widget cost_mult 0.123456"] {
        OperatorCommand::parse(line)
            .unwrap()
            .execute(&mut controller, &mut session, &operator, &mut audit)
            .unwrap();
    }
    let written: Vec<f64> = audit.entries().iter().map(|e| e.new).collect();
    assert_eq!(written.len(), 2);
    assert!((written[0] - 3.0).abs() < f64::EPSILON);
    assert!((written[1] - 0.1235).abs() < 1e-9);
}

#[test]
fn disabling_through_flag_restores_defaults_on_reload() {
    let (mut controller, mut session) = started(r#"{"units": {"Widget": {"cost_mult": 0.5}}}"#);
    let operator = Participant::remote(ALICE.raw(), "alice");
    let mut audit = AuditLog::new();

    for line in ["flag enabled off", "rebalance"] {
        OperatorCommand::parse(line)
            .unwrap()
            .execute(&mut controller, &mut session, &operator, &mut audit)
            .unwrap();
    }
    assert_eq!(controller.state(), LifecycleState::Active);
    assert!(controller.store().overrides().is_empty());
    let entry = &audit.entries()[0];
    assert_eq!((entry.unit.as_str(), entry.key.as_str()), ("flags", "enabled"));
    assert_eq!(entry.old, None);
    assert!(entry.new.abs() < f64::EPSILON);
}
