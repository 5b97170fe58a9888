//! Brings live instances in line with their definitions after a reload.

use tracing::debug;

use crate::catalog::Catalog;
use crate::host::member::{FieldValue, Member, MemberAccess};
use crate::host::{FieldPath, World};
use crate::store::SyncStore;

/// Copies the effective prefab value of every member into each live unit.
///
/// The effective value is the store's enabled override when the member is
/// syncable and one exists, otherwise the definition's current value.
/// Returns how many live members changed.
pub fn propagate_live(world: &mut World, catalog: &Catalog, store: Option<&dyn SyncStore>) -> usize {
    let mut edits: Vec<(usize, usize, Member, FieldValue)> = Vec::new();

    for (live_index, live) in world.live_units().iter().enumerate() {
        let Some(entry) = catalog.lookup_by_name(&live.unit_name) else {
            continue;
        };
        for (index, component) in live.components.iter().enumerate() {
            let path = FieldPath::Component {
                unit: entry.unit,
                index,
            };
            for member in component.members() {
                let stored = store
                    .filter(|_| member.is_syncable())
                    .and_then(|s| s.get(&entry.target, member.as_str()));
                let Some(value) = stored.or_else(|| world.read(&path, member)) else {
                    continue;
                };
                if component.member(member) != Some(value) {
                    edits.push((live_index, index, member, value));
                }
            }
        }
    }

    let mut changed = 0;
    let live_units = world.live_units_mut();
    for (live_index, index, member, value) in edits {
        let Some(component) = live_units
            .get_mut(live_index)
            .and_then(|l| l.components.get_mut(index))
        else {
            continue;
        };
        if component.set_member(member, value) {
            changed += 1;
        }
    }
    debug!(changed, "live instances refreshed");
    changed
}

#[cfg(test)]
mod live_tests {
    use super::*;
    use crate::host::components::{Component, ComponentKind, Sensor};
    use crate::host::member::ValueKind;
    use crate::host::{TeamId, UnitDefinition};
    use crate::store::{MemoryStore, SourceEntry, TargetKey};

    fn scout_world() -> World {
        let mut world = World::new();
        world.add_unit(UnitDefinition::new("Scout", "Scout_Prefab").with_component(
            Component::Sensor(Sensor {
                targeting_distance: 100.0,
                fog_of_war_view_distance: 80.0,
            }),
        ));
        world
    }

    #[test]
    fn live_units_follow_definition_without_store() {
        let mut world = scout_world();
        let live = world.spawn_live("Scout", TeamId::new(1)).unwrap();
        let catalog = Catalog::build(&world);
        let path = catalog
            .lookup_by_name("Scout")
            .unwrap()
            .first(ComponentKind::Sensor)
            .unwrap();
        world.write(&path, Member::TargetingDistance, FieldValue::Float(150.0));

        assert_eq!(propagate_live(&mut world, &catalog, None), 1);
        let component = &world.live_unit(live).unwrap().components[0];
        assert_eq!(component.member(Member::TargetingDistance), Some(FieldValue::Float(150.0)));
    }

    #[test]
    fn store_override_wins_over_definition() {
        let mut world = scout_world();
        let live = world.spawn_live("Scout", TeamId::new(1)).unwrap();
        let catalog = Catalog::build(&world);
        let key = TargetKey::asset("Scout_Prefab");
        let mut store = MemoryStore::new(vec![SourceEntry::from_members(
            key.clone(),
            [Member::FogOfWarViewDistance],
        )]);
        store.init().unwrap();
        store
            .set(ValueKind::Float, &key, "FogOfWarViewDistance", FieldValue::Float(40.0), true, false)
            .unwrap();

        propagate_live(&mut world, &catalog, Some(&store));
        let component = &world.live_unit(live).unwrap().components[0];
        assert_eq!(component.member(Member::FogOfWarViewDistance), Some(FieldValue::Float(40.0)));
        assert_eq!(component.member(Member::TargetingDistance), Some(FieldValue::Float(100.0)));
    }
}
