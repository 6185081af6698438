//! Tests for pool storage, compaction, handles, subscription, and the
//! spawn-rule pipeline.

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use hailstorm_core::archetype::{ObjectArchetype, PoolArchetype};
use hailstorm_core::components::{
    ColorTint, Destructible, HandleIndex, Position, Spawner, Sprite, Velocity,
};
use hailstorm_core::constants::DEAD_OBJECT_ID;
use hailstorm_core::spawn::{GroupInfo, SpawnInfo};
use hailstorm_core::types::SimTime;

use crate::error::{SimError, SimResult};
use crate::handle::HandleDirectory;
use crate::pool_manager::PoolManager;
use crate::registry::ComponentRegistry;
use crate::space::ObjectManager;
use crate::spawn::rules::{Fan, IncrementCount, SetSpeed, Spiral};
use crate::spawn::SpawnRuleSet;
use crate::system::{PoolGroups, PoolType, System, TickContext};
use crate::systems::creation::{self, queue_spawns, CreationSystem};
use crate::systems::destruction::DestructionSystem;

fn rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(7)
}

/// A bullet-like archetype: Position/Velocity/Destructible plus a ColorTint
/// used as an object-identity tracer in compaction tests.
fn bullet_pool_archetype(name: &str, capacity: usize) -> PoolArchetype {
    PoolArchetype::new(name, capacity)
        .with_array("Position")
        .with_array("Velocity")
        .with_array("ColorTint")
        .with_array("Destructible")
}

fn tagged_object(index: usize) -> ObjectArchetype {
    ObjectArchetype::new("Tagged")
        .with("Position", Position(Vec2::new(index as f32, 0.0)))
        .with(
            "ColorTint",
            ColorTint {
                red: index as f32,
                ..ColorTint::default()
            },
        )
}

// ---- Registry ----

#[test]
fn registry_names_are_sorted_and_idempotent() {
    let mut registry = ComponentRegistry::new();
    registry.register_array::<Velocity>("Velocity");
    registry.register_array::<Position>("Position");
    registry.register_array::<ColorTint>("ColorTint");
    // Re-registration keeps the first factory and does not duplicate names.
    registry.register_array::<Position>("Position");

    assert_eq!(registry.array_names(), &["ColorTint", "Position", "Velocity"]);

    registry.register_tag("Player");
    registry.register_tag("Bullet");
    registry.register_tag("Player");
    assert_eq!(registry.tag_names(), &["Bullet", "Player"]);
}

#[test]
fn allocating_unregistered_names_returns_none() {
    let registry = ComponentRegistry::new();
    assert!(registry.allocate_array("Position", 8).is_none());
    assert!(registry.allocate_shared("Sprite").is_none());
}

// ---- Pool creation ----

#[test]
fn pool_creation_materializes_archetype() {
    let registry = ComponentRegistry::with_engine_components();
    let mut pools = PoolManager::new();

    let archetype = bullet_pool_archetype("Bullets", 8)
        .with_shared(
            "Sprite",
            Sprite {
                texture: "bullet_round".to_string(),
                layer: 3,
            },
        )
        .with_tag("Bullet")
        .with_starting_object(tagged_object(0))
        .with_starting_object(tagged_object(1));

    let pool = pools.create_pool(&archetype, &registry).unwrap();
    assert_eq!(pool.capacity(), 8);
    assert_eq!(pool.size(), 2);
    assert_eq!(pool.queued(), 0);
    assert_eq!(pool.available_slots(), 6);
    assert!(pool.has_tag("Bullet"));
    assert_eq!(pool.shared::<Sprite>("Sprite").unwrap().layer, 3);

    let positions = pool.component_array::<Position>("Position").unwrap();
    assert_eq!(positions[1], Position(Vec2::new(1.0, 0.0)));

    // Duplicate creation is a checked configuration error.
    assert_eq!(
        pools.create_pool(&archetype, &registry).unwrap_err(),
        SimError::DuplicatePool("Bullets".to_string())
    );
}

#[test]
fn pool_creation_fails_on_unregistered_component() {
    let registry = ComponentRegistry::with_engine_components();
    let mut pools = PoolManager::new();
    let archetype = PoolArchetype::new("Odd", 4).with_array("Magnetism");
    assert_eq!(
        pools.create_pool(&archetype, &registry).unwrap_err(),
        SimError::UnregisteredComponentArray("Magnetism".to_string())
    );
}

#[test]
fn missing_component_lookup_fails_fast_with_names() {
    let registry = ComponentRegistry::with_engine_components();
    let mut pools = PoolManager::new();
    pools
        .create_pool(&bullet_pool_archetype("Bullets", 4), &registry)
        .unwrap();

    let pool = pools.get_pool("Bullets").unwrap();
    let err = pool.component_array::<Position>("Lifetime").unwrap_err();
    assert_eq!(
        err,
        SimError::MissingComponentArray {
            pool: "Bullets".to_string(),
            component: "Lifetime".to_string(),
        }
    );
}

// ---- Direct creation ----

#[test]
fn create_object_is_silent_noop_when_full() {
    let registry = ComponentRegistry::with_engine_components();
    let mut pools = PoolManager::new();
    pools
        .create_pool(&bullet_pool_archetype("Bullets", 2), &registry)
        .unwrap();

    let pool = pools.get_pool_mut("Bullets").unwrap();
    assert!(creation::create_object(pool, &tagged_object(0)).unwrap());
    assert!(creation::create_object(pool, &tagged_object(1)).unwrap());
    assert!(!creation::create_object(pool, &tagged_object(2)).unwrap());
    assert_eq!(pool.size(), 2);
}

// ---- Compaction ----

fn destroy_slots(pools: &mut PoolManager, pool: &str, slots: &[usize]) {
    let flags = pools
        .get_pool_mut(pool)
        .unwrap()
        .component_array_mut::<Destructible>("Destructible")
        .unwrap();
    for &slot in slots {
        flags[slot].destroyed = true;
    }
}

#[test]
fn compaction_preserves_survivor_order_across_all_arrays() {
    let registry = ComponentRegistry::with_engine_components();
    let mut pools = PoolManager::new();
    let mut archetype = bullet_pool_archetype("Bullets", 10);
    for index in 0..8 {
        archetype = archetype.with_starting_object(tagged_object(index));
    }
    pools.create_pool(&archetype, &registry).unwrap();

    destroy_slots(&mut pools, "Bullets", &[0, 3, 4, 7]);

    let pool = pools.get_pool_mut("Bullets").unwrap();
    let new_size = pool.destroy_objects(|_, _, _| {}).unwrap();
    assert_eq!(new_size, 4);
    assert_eq!(pool.size(), 4);

    // Survivors 1, 2, 5, 6 pack to the front in their original relative
    // order, and the identity travels together across every array.
    let positions = pool.component_array::<Position>("Position").unwrap();
    let tints = pool.component_array::<ColorTint>("ColorTint").unwrap();
    let flags = pool.component_array::<Destructible>("Destructible").unwrap();
    for (slot, expected) in [1.0f32, 2.0, 5.0, 6.0].iter().enumerate() {
        assert_eq!(positions[slot].0.x, *expected);
        assert_eq!(tints[slot].red, *expected);
        assert!(!flags[slot].destroyed);
    }
}

#[test]
fn compaction_with_no_destroyed_objects_is_identity() {
    let registry = ComponentRegistry::with_engine_components();
    let mut pools = PoolManager::new();
    let mut archetype = bullet_pool_archetype("Bullets", 8);
    for index in 0..5 {
        archetype = archetype.with_starting_object(tagged_object(index));
    }
    pools.create_pool(&archetype, &registry).unwrap();

    let pool = pools.get_pool_mut("Bullets").unwrap();
    let before: Vec<f32> = pool.component_array::<Position>("Position").unwrap().as_slice()
        [..pool.size()]
        .iter()
        .map(|position| position.0.x)
        .collect();

    let new_size = pool.destroy_objects(|_, _, _| {}).unwrap();
    assert_eq!(new_size, 5);

    let after: Vec<f32> = pool.component_array::<Position>("Position").unwrap().as_slice()
        [..pool.size()]
        .iter()
        .map(|position| position.0.x)
        .collect();
    assert_eq!(before, after);
}

#[test]
fn compaction_keeps_queued_block_adjacent() {
    let registry = ComponentRegistry::with_engine_components();
    let mut pools = PoolManager::new();
    let mut archetype = bullet_pool_archetype("Bullets", 10);
    for index in 0..4 {
        archetype = archetype.with_starting_object(tagged_object(index));
    }
    pools.create_pool(&archetype, &registry).unwrap();

    // Queue two pending spawns behind the live range.
    {
        let pool = pools.get_pool_mut("Bullets").unwrap();
        pool.copy_archetype_to_slot(&tagged_object(100), 4).unwrap();
        pool.copy_archetype_to_slot(&tagged_object(101), 5).unwrap();
        pool.grow_queued(2);
    }

    destroy_slots(&mut pools, "Bullets", &[1, 2]);

    let pool = pools.get_pool_mut("Bullets").unwrap();
    let new_size = pool.destroy_objects(|_, _, _| {}).unwrap();
    assert_eq!(new_size, 2);
    assert_eq!(pool.queued(), 2);

    // The pending spawns follow the surviving live range.
    let positions = pool.component_array::<Position>("Position").unwrap();
    assert_eq!(positions[0].0.x, 0.0);
    assert_eq!(positions[1].0.x, 3.0);
    assert_eq!(positions[2].0.x, 100.0);
    assert_eq!(positions[3].0.x, 101.0);
}

// ---- Handles ----

fn handle_pool_archetype(capacity: usize) -> PoolArchetype {
    let mut archetype = bullet_pool_archetype("Bullets", capacity)
        .with_array("HandleIndex")
        .with_shared("HandleDirectory", HandleDirectory::default());
    for index in 0..6 {
        archetype = archetype.with_starting_object(tagged_object(index));
    }
    archetype
}

#[test]
fn handles_survive_compaction_and_dead_handles_are_recycled() {
    let registry = ComponentRegistry::with_engine_components();
    let mut pools = PoolManager::new();
    let mut rules = SpawnRuleSet::new();
    let mut rng = rng();

    let pool = pools
        .create_pool(&handle_pool_archetype(8), &registry)
        .unwrap();

    let mut destruction = DestructionSystem::new();
    destruction.subscribe(pool);

    // Remember each live object's (handle index, id) before destruction.
    let before: Vec<(usize, u64)> = {
        let pool = pools.get_pool("Bullets").unwrap();
        let handle_indices = pool.component_array::<HandleIndex>("HandleIndex").unwrap();
        let directory = pool.shared::<HandleDirectory>("HandleDirectory").unwrap();
        (0..pool.size())
            .map(|slot| {
                let index = handle_indices[slot].index;
                (index, directory.get(index).unwrap().id)
            })
            .collect()
    };

    destroy_slots(&mut pools, "Bullets", &[1, 4]);

    let mut ctx = TickContext {
        pools: &mut pools,
        rules: &mut rules,
        rng: &mut rng,
        time: SimTime::default(),
    };
    destruction.update(&mut ctx).unwrap();

    let pool = pools.get_pool("Bullets").unwrap();
    assert_eq!(pool.size(), 4);

    let handle_indices = pool.component_array::<HandleIndex>("HandleIndex").unwrap();
    let directory = pool.shared::<HandleDirectory>("HandleDirectory").unwrap();

    // Every survivor's directory entry points back at its new slot.
    for slot in 0..pool.size() {
        let handle = directory.get(handle_indices[slot].index).unwrap();
        assert_eq!(handle.pool_index, slot);
        assert_ne!(handle.id, DEAD_OBJECT_ID);
    }

    // The destroyed objects' handles carry the dead sentinel and their
    // directory entries are reusable.
    for &(index, id) in [&before[1], &before[4]] {
        assert_eq!(directory.get(index).unwrap().id, DEAD_OBJECT_ID);
        assert!(!directory.is_alive(index, id));
        assert!(directory.free_indices().contains(&index));
    }

    // The next creation recycles a freed entry.
    let freed: Vec<usize> = directory.free_indices().to_vec();
    let pool = pools.get_pool_mut("Bullets").unwrap();
    assert!(creation::create_object(pool, &tagged_object(9)).unwrap());
    let handle_indices = pool.component_array::<HandleIndex>("HandleIndex").unwrap();
    let new_index = handle_indices[pool.size() - 1].index;
    assert!(freed.contains(&new_index));
}

// ---- Spawn pipeline ----

fn spawn_setup(
    destination_capacity: usize,
    group_info: GroupInfo,
    rule_names: &[&str],
) -> (PoolManager, SpawnRuleSet) {
    let registry = ComponentRegistry::with_engine_components();
    let mut pools = PoolManager::new();

    let bullet = ObjectArchetype::new("Bullet")
        .with("Position", Position(Vec2::ZERO))
        .with("Velocity", Velocity(Vec2::new(0.0, -1.0)));
    let bullets = bullet_pool_archetype("Bullets", destination_capacity).with_spawn_archetype(bullet);
    pools.create_pool(&bullets, &registry).unwrap();

    let spawner_pool = PoolArchetype::new("Emitters", 4)
        .with_array("Position")
        .with_array("Velocity")
        .with_array("Destructible")
        .with_shared(
            "Spawner",
            Spawner {
                spawns: vec![
                    SpawnInfo::new("Bullets", "Bullet", rule_names).with_group_info(group_info),
                ],
            },
        )
        .with_starting_object(
            ObjectArchetype::new("Emitter")
                .with("Position", Position(Vec2::new(320.0, 400.0)))
                .with("Velocity", Velocity(Vec2::ZERO)),
        );
    pools.create_pool(&spawner_pool, &registry).unwrap();

    (pools, SpawnRuleSet::new())
}

fn stage_sources(pools: &mut PoolManager, count: usize) {
    let spawner = pools
        .get_pool_mut("Emitters")
        .unwrap()
        .shared_mut::<Spawner>("Spawner")
        .unwrap();
    spawner.spawns[0].source_indices = vec![0; count];
}

fn bullet_angles(pools: &PoolManager) -> Vec<f32> {
    let pool = pools.get_pool("Bullets").unwrap();
    let velocities = pool.component_array::<Velocity>("Velocity").unwrap();
    let mut angles: Vec<f32> = (0..pool.size() + pool.queued())
        .map(|slot| velocities[slot].angle())
        .collect();
    angles.sort_by(f32::total_cmp);
    angles
}

#[test]
fn queue_spawns_truncates_to_available_slots_and_clears_sources() {
    let (mut pools, mut rules) = spawn_setup(3, GroupInfo::default(), &[]);
    let mut rng = rng();

    stage_sources(&mut pools, 5);
    let spawned = queue_spawns(&mut pools, &mut rules, &mut rng, "Emitters", 0).unwrap();

    // Capacity 3: exactly the available count, never more, no error.
    assert_eq!(spawned, 3);
    let pool = pools.get_pool("Bullets").unwrap();
    assert_eq!(pool.queued(), 3);
    assert_eq!(pool.size() + pool.queued(), 3);
    assert_eq!(pool.available_slots(), 0);

    // Sources were cleared even though the batch was truncated.
    let spawner = pools
        .get_pool("Emitters")
        .unwrap()
        .shared::<Spawner>("Spawner")
        .unwrap();
    assert!(spawner.spawns[0].source_indices.is_empty());

    // A full destination is a no-op, not an error, and still clears.
    stage_sources(&mut pools, 2);
    let spawned = queue_spawns(&mut pools, &mut rules, &mut rng, "Emitters", 0).unwrap();
    assert_eq!(spawned, 0);
}

#[test]
fn count_rules_run_before_value_rules() {
    // Base of 2 groups; IncrementCount adds 2 more. Fan must see 4 groups,
    // so 4 distinct angles appear, not 2.
    let (mut pools, mut rules) = spawn_setup(
        16,
        GroupInfo::new(2, 1, 1),
        &["GrowPattern", "Fan"],
    );
    rules.register(
        "GrowPattern",
        Box::new(IncrementCount {
            amount: 2,
            min: 0,
            max: 16,
        }),
    );
    rules.register("Fan", Box::new(Fan { spacing: 0.25 }));
    let mut rng = rng();

    stage_sources(&mut pools, 4);
    let spawned = queue_spawns(&mut pools, &mut rules, &mut rng, "Emitters", 0).unwrap();
    assert_eq!(spawned, 4);

    let mut angles = bullet_angles(&pools);
    angles.dedup_by(|a, b| (*a - *b).abs() < 1e-5);
    assert_eq!(angles.len(), 4);
}

#[test]
fn out_of_range_count_mutation_is_silently_rejected() {
    let mut rule = IncrementCount {
        amount: 10,
        min: 0,
        max: 8,
    };
    let mut groups = GroupInfo::new(3, 1, 1);
    use crate::spawn::SpawnRule;
    rule.adjust_counts(&mut groups);
    assert_eq!(groups.num_groups, 3);

    rule.amount = 5;
    rule.adjust_counts(&mut groups);
    assert_eq!(groups.num_groups, 8);
}

#[test]
fn unknown_rule_name_fails_fast() {
    let (mut pools, mut rules) = spawn_setup(8, GroupInfo::default(), &["Nonexistent"]);
    let mut rng = rng();
    stage_sources(&mut pools, 1);

    let err = queue_spawns(&mut pools, &mut rules, &mut rng, "Emitters", 0).unwrap_err();
    assert_eq!(
        err,
        SimError::UnknownSpawnRule {
            pool: "Emitters".to_string(),
            rule: "Nonexistent".to_string(),
        }
    );
}

#[test]
fn value_rule_missing_component_names_rule_pool_and_component() {
    let registry = ComponentRegistry::with_engine_components();
    let mut pools = PoolManager::new();

    // Destination carries no ColorTint array, but the rule list asks for it.
    let bullet = ObjectArchetype::new("Bullet").with("Position", Position(Vec2::ZERO));
    let bullets = PoolArchetype::new("Bullets", 8)
        .with_array("Position")
        .with_array("Destructible")
        .with_spawn_archetype(bullet);
    pools.create_pool(&bullets, &registry).unwrap();

    let spawner_pool = PoolArchetype::new("Emitters", 2)
        .with_array("Position")
        .with_shared(
            "Spawner",
            Spawner {
                spawns: vec![SpawnInfo::new("Bullets", "Bullet", &["Paint"])],
            },
        )
        .with_starting_object(ObjectArchetype::new("Emitter").with("Position", Position(Vec2::ZERO)));
    pools.create_pool(&spawner_pool, &registry).unwrap();

    let mut rules = SpawnRuleSet::new();
    rules.register(
        "Paint",
        Box::new(crate::spawn::rules::SetColor {
            red: 1.0,
            green: 0.2,
            blue: 0.2,
            alpha: 1.0,
        }),
    );
    let mut rng = rng();
    stage_sources(&mut pools, 1);

    let err = queue_spawns(&mut pools, &mut rules, &mut rng, "Emitters", 0).unwrap_err();
    assert_eq!(
        err,
        SimError::RuleMissingComponent {
            rule: "SetColor".to_string(),
            pool: "Bullets".to_string(),
            component: "ColorTint".to_string(),
        }
    );
}

#[test]
fn spiral_state_compacts_in_lockstep_with_its_spawner_pool() {
    let (mut pools, mut rules) = spawn_setup(64, GroupInfo::default(), &["Spiral"]);
    rules.register("Spiral", Box::new(Spiral::new(0.3)));
    let mut rng = rng();

    // A second emitter in slot 1; slot 0 will be destroyed later.
    {
        let pool = pools.get_pool_mut("Emitters").unwrap();
        creation::create_object(
            pool,
            &ObjectArchetype::new("Emitter")
                .with("Position", Position(Vec2::new(100.0, 100.0)))
                .with("Velocity", Velocity(Vec2::ZERO)),
        )
        .unwrap();
    }

    // Fire emitter slot 1 twice: its accumulated spiral angle becomes 0.6.
    for _ in 0..2 {
        let spawner = pools
            .get_pool_mut("Emitters")
            .unwrap()
            .shared_mut::<Spawner>("Spawner")
            .unwrap();
        spawner.spawns[0].source_indices = vec![1];
        queue_spawns(&mut pools, &mut rules, &mut rng, "Emitters", 0).unwrap();
    }

    // Destroy emitter slot 0; the survivor moves to slot 0 and its spiral
    // state must move with it.
    destroy_slots(&mut pools, "Emitters", &[0]);
    let mut destruction = DestructionSystem::new();
    destruction.subscribe(pools.get_pool("Emitters").unwrap());
    let mut ctx = TickContext {
        pools: &mut pools,
        rules: &mut rules,
        rng: &mut rng,
        time: SimTime::default(),
    };
    destruction.update(&mut ctx).unwrap();
    assert_eq!(pools.get_pool("Emitters").unwrap().size(), 1);

    // The next batch from (now) slot 0 starts at the accumulated angle.
    let before = pools.get_pool("Bullets").unwrap().queued();
    let spawner = pools
        .get_pool_mut("Emitters")
        .unwrap()
        .shared_mut::<Spawner>("Spawner")
        .unwrap();
    spawner.spawns[0].source_indices = vec![0];
    queue_spawns(&mut pools, &mut rules, &mut rng, "Emitters", 0).unwrap();

    let pool = pools.get_pool("Bullets").unwrap();
    let velocities = pool.component_array::<Velocity>("Velocity").unwrap();
    let angle = velocities[before].angle();
    let base = Velocity(Vec2::new(0.0, -1.0)).angle();
    let expected = base + 0.6;
    assert!(
        (angle - expected).abs() < 1e-5,
        "angle {angle} should carry accumulated spiral rotation {expected}"
    );
}

// ---- Creation system activation ----

#[test]
fn creation_system_assigns_handles_before_activation() {
    let registry = ComponentRegistry::with_engine_components();
    let mut pools = PoolManager::new();
    let mut rules = SpawnRuleSet::new();
    let mut rng = rng();

    let archetype = bullet_pool_archetype("Bullets", 8)
        .with_array("HandleIndex")
        .with_shared("HandleDirectory", HandleDirectory::default());
    let pool = pools.create_pool(&archetype, &registry).unwrap();

    let mut creation_system = CreationSystem::new();
    creation_system.subscribe(pool);

    // Queue two objects by hand, as a spawn batch would.
    {
        let pool = pools.get_pool_mut("Bullets").unwrap();
        pool.copy_archetype_to_slot(&tagged_object(0), 0).unwrap();
        pool.copy_archetype_to_slot(&tagged_object(1), 1).unwrap();
        pool.grow_queued(2);
        assert_eq!(pool.size(), 0);
    }

    let mut ctx = TickContext {
        pools: &mut pools,
        rules: &mut rules,
        rng: &mut rng,
        time: SimTime::default(),
    };
    creation_system.update(&mut ctx).unwrap();

    let pool = pools.get_pool("Bullets").unwrap();
    assert_eq!(pool.size(), 2);
    assert_eq!(pool.queued(), 0);

    let handle_indices = pool.component_array::<HandleIndex>("HandleIndex").unwrap();
    let directory = pool.shared::<HandleDirectory>("HandleDirectory").unwrap();
    for slot in 0..2 {
        let handle = directory.get(handle_indices[slot].index).unwrap();
        assert_eq!(handle.pool_index, slot);
        assert_ne!(handle.id, DEAD_OBJECT_ID);
    }
}

// ---- Subscription and ordering ----

#[test]
fn pool_type_matches_structure() {
    let registry = ComponentRegistry::with_engine_components();
    let mut pools = PoolManager::new();
    let archetype = bullet_pool_archetype("Bullets", 4).with_tag("Bullet");
    let pool = pools.create_pool(&archetype, &registry).unwrap();

    assert!(PoolType::new().with_array("Position").matches(pool));
    assert!(PoolType::new()
        .with_array("Position")
        .with_tag("Bullet")
        .matches(pool));
    assert!(!PoolType::new().with_array("Lifetime").matches(pool));
    assert!(!PoolType::new().with_shared("Sprite").matches(pool));
    assert!(!PoolType::new().with_tag("Enemy").matches(pool));
}

#[test]
fn unsubscribe_removes_pool_from_every_group() {
    let registry = ComponentRegistry::with_engine_components();
    let mut pools = PoolManager::new();
    let pool = pools
        .create_pool(&bullet_pool_archetype("Bullets", 4), &registry)
        .unwrap();

    let mut groups = PoolGroups::new();
    groups.add_group("moving", PoolType::new().with_array("Velocity"));
    groups.add_group("everything", PoolType::new());
    groups.subscribe(pool);
    assert_eq!(groups.group("moving"), ["Bullets".to_string()]);
    assert_eq!(groups.group("everything"), ["Bullets".to_string()]);

    groups.unsubscribe("Bullets");
    assert!(groups.group("moving").is_empty());
    assert!(groups.group("everything").is_empty());
}

/// Records its runs into a shared log, and what it saw in a pool's sprite
/// layer at the time.
struct RecorderSystem {
    groups: PoolGroups,
    label: &'static str,
    bump_layer: bool,
    log: std::sync::Arc<std::sync::Mutex<Vec<(&'static str, i32)>>>,
}

impl RecorderSystem {
    fn new(
        label: &'static str,
        bump_layer: bool,
        log: std::sync::Arc<std::sync::Mutex<Vec<(&'static str, i32)>>>,
    ) -> Self {
        let mut groups = PoolGroups::new();
        groups.add_group("sprites", PoolType::new().with_shared("Sprite"));
        RecorderSystem {
            groups,
            label,
            bump_layer,
            log,
        }
    }
}

impl System for RecorderSystem {
    fn pool_groups(&mut self) -> &mut PoolGroups {
        &mut self.groups
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        for pool_name in self.groups.group("sprites") {
            let pool = ctx.pools.get_pool_mut(pool_name).unwrap();
            let sprite = pool.shared_mut::<Sprite>("Sprite")?;
            self.log.lock().unwrap().push((self.label, sprite.layer));
            if self.bump_layer {
                sprite.layer += 1;
            }
        }
        Ok(())
    }
}

#[test]
fn update_order_is_the_configured_list_only() {
    let registry = ComponentRegistry::with_engine_components();
    let mut objects = ObjectManager::new();

    let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let systems = objects.systems_mut();
    systems.register("A", Box::new(RecorderSystem::new("A", true, log.clone())));
    systems.register("B", Box::new(RecorderSystem::new("B", false, log.clone())));
    systems.register("C", Box::new(RecorderSystem::new("C", false, log.clone())));
    systems.set_update_order(&["C", "A"]);

    let archetype = PoolArchetype::new("Scenery", 1).with_shared("Sprite", Sprite::default());
    objects.create_pool(&archetype, &registry).unwrap();

    let mut rng = rng();
    objects.update(&mut rng, SimTime::default()).unwrap();

    // B never ran; C ran before A and observed the pre-mutation state.
    let log = log.lock().unwrap();
    assert_eq!(log.as_slice(), &[("C", 0), ("A", 0)]);
}

#[test]
fn duplicated_order_entries_run_twice() {
    let registry = ComponentRegistry::with_engine_components();
    let mut objects = ObjectManager::new();

    let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    objects
        .systems_mut()
        .register("A", Box::new(RecorderSystem::new("A", true, log.clone())));
    objects.systems_mut().set_update_order(&["A", "A"]);

    let archetype = PoolArchetype::new("Scenery", 1).with_shared("Sprite", Sprite::default());
    objects.create_pool(&archetype, &registry).unwrap();

    let mut rng = rng();
    objects.update(&mut rng, SimTime::default()).unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.as_slice(), &[("A", 0), ("A", 1)]);
}

// ---- Mirror and escalation ----

#[test]
fn mirror_reflects_odd_layer_copies() {
    // 2 groups x 1 object x 2 layer copies: the second layer is the first,
    // mirrored horizontally.
    let (mut pools, mut rules) = spawn_setup(16, GroupInfo::new(2, 1, 2), &["Fan", "Mirror"]);
    rules.register("Fan", Box::new(Fan { spacing: 0.4 }));
    rules.register("Mirror", Box::new(crate::spawn::rules::Mirror));
    let mut rng = rng();

    stage_sources(&mut pools, 4);
    queue_spawns(&mut pools, &mut rules, &mut rng, "Emitters", 0).unwrap();

    let pool = pools.get_pool("Bullets").unwrap();
    let velocities = pool.component_array::<Velocity>("Velocity").unwrap();
    // Layer 0 occupies slots 0..2, layer 1 occupies slots 2..4.
    for group in 0..2 {
        let original = velocities[group].0;
        let mirrored = velocities[group + 2].0;
        assert!((original.x + mirrored.x).abs() < 1e-6);
        assert!((original.y - mirrored.y).abs() < 1e-6);
    }
}

#[test]
fn iterate_count_escalates_across_batches() {
    use crate::spawn::SpawnRule;

    let mut rule = crate::spawn::rules::IterateCount::new(2, 0, 9);
    let base = GroupInfo::new(1, 1, 1);

    // Each batch adds step * iteration to the base count. Once the result
    // overflows the max, the mutation is rejected outright and the
    // iteration stops advancing.
    let mut sizes = Vec::new();
    for _ in 0..6 {
        let mut groups = base;
        rule.adjust_counts(&mut groups);
        sizes.push(groups.num_groups);
    }
    assert_eq!(sizes, vec![1, 3, 5, 7, 9, 1]);
}

// ---- Interactions ----

#[test]
fn update_interaction_visits_all_cross_pairs() {
    let registry = ComponentRegistry::with_engine_components();
    let mut pools = PoolManager::new();
    pools
        .create_pool(&bullet_pool_archetype("Bullets", 4).with_tag("Bullet"), &registry)
        .unwrap();
    pools
        .create_pool(
            &bullet_pool_archetype("EnemyShots", 4).with_tag("Bullet"),
            &registry,
        )
        .unwrap();
    pools
        .create_pool(
            &PoolArchetype::new("Players", 1)
                .with_array("Position")
                .with_tag("Player"),
            &registry,
        )
        .unwrap();

    let mut groups = PoolGroups::new();
    groups.add_group("bullets", PoolType::new().with_tag("Bullet"));
    groups.add_group("players", PoolType::new().with_tag("Player"));
    for name in ["Bullets", "EnemyShots", "Players"] {
        groups.subscribe(pools.get_pool(name).unwrap());
    }

    let mut pairs: Vec<(String, String)> = Vec::new();
    crate::system::update_interaction(&groups, "bullets", "players", &mut pools, |a, b| {
        pairs.push((a.name().to_string(), b.name().to_string()));
        Ok(())
    })
    .unwrap();

    assert_eq!(
        pairs,
        vec![
            ("Bullets".to_string(), "Players".to_string()),
            ("EnemyShots".to_string(), "Players".to_string()),
        ]
    );
}

// ---- Spaces ----

#[test]
fn load_scene_replaces_pools_and_clear_scene_empties() {
    let registry = ComponentRegistry::with_engine_components();
    let mut archetypes = crate::pool_manager::ArchetypeManager::new();
    archetypes.register(bullet_pool_archetype("Bullets", 8));
    archetypes.register(bullet_pool_archetype("EnemyShots", 8));

    let mut space = crate::space::Space::new("gameplay", crate::space::SpaceConfig::default());
    space
        .load_scene(&["Bullets"], &archetypes, &registry)
        .unwrap();
    assert!(space.objects().pools().get_pool("Bullets").is_some());

    space
        .load_scene(&["EnemyShots"], &archetypes, &registry)
        .unwrap();
    assert!(space.objects().pools().get_pool("Bullets").is_none());
    assert!(space.objects().pools().get_pool("EnemyShots").is_some());

    let err = space
        .load_scene(&["Missing"], &archetypes, &registry)
        .unwrap_err();
    assert_eq!(err, SimError::UnknownPoolArchetype("Missing".to_string()));

    space.clear_scene();
    assert!(space.objects().pools().is_empty());
}

#[test]
fn deleted_pools_are_unsubscribed_everywhere() {
    let registry = ComponentRegistry::with_engine_components();
    let mut objects = ObjectManager::new();

    let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    objects
        .systems_mut()
        .register("A", Box::new(RecorderSystem::new("A", false, log.clone())));
    objects.systems_mut().set_update_order(&["A"]);

    let archetype = PoolArchetype::new("Scenery", 1).with_shared("Sprite", Sprite::default());
    objects.create_pool(&archetype, &registry).unwrap();
    assert!(objects.delete_pool("Scenery"));

    let mut rng = rng();
    objects.update(&mut rng, SimTime::default()).unwrap();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn space_manager_updates_spaces_in_insertion_order() {
    let registry = ComponentRegistry::with_engine_components();
    let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));

    let build = |name: &str, label: &'static str| {
        let mut space = crate::space::Space::new(name, crate::space::SpaceConfig::default());
        let systems = space.objects_mut().systems_mut();
        systems.register(label, Box::new(RecorderSystem::new(label, false, log.clone())));
        systems.set_update_order(&[label]);
        let archetype = PoolArchetype::new("Scenery", 1).with_shared("Sprite", Sprite::default());
        space.objects_mut().create_pool(&archetype, &registry).unwrap();
        space
    };

    let mut manager = crate::space::SpaceManager::new();
    manager.add_space(build("menu", "B"));
    manager.add_space(build("gameplay", "A"));
    manager.update().unwrap();

    assert_eq!(log.lock().unwrap().as_slice(), &[("B", 0), ("A", 0)]);

    assert!(manager.get_space("menu").is_some());
    assert!(manager.remove_space("menu"));
    assert!(manager.get_space("menu").is_none());
}

// ---- Player input ----

struct ScriptedInput {
    held: Vec<crate::systems::player::Key>,
}

impl crate::systems::player::InputSource for ScriptedInput {
    fn key_is_down(&self, key: crate::systems::player::Key) -> bool {
        self.held.contains(&key)
    }

    fn key_triggered(&self, _key: crate::systems::player::Key) -> bool {
        false
    }
}

#[test]
fn player_system_drives_tagged_pools_from_input() {
    use crate::systems::player::{Key, PlayerSystem};
    use hailstorm_core::constants::PLAYER_FOCUS_SPEED;

    let registry = ComponentRegistry::with_engine_components();
    let mut pools = PoolManager::new();
    let mut rules = SpawnRuleSet::new();
    let mut rng = rng();

    let archetype = PoolArchetype::new("Players", 1)
        .with_array("Position")
        .with_array("Velocity")
        .with_tag("Player")
        .with_starting_object(
            ObjectArchetype::new("Ship").with("Position", Position(Vec2::new(320.0, 60.0))),
        );
    let pool = pools.create_pool(&archetype, &registry).unwrap();

    let mut player = PlayerSystem::new(Box::new(ScriptedInput {
        held: vec![Key::Up, Key::Focus],
    }));
    player.subscribe(pool);

    let mut ctx = TickContext {
        pools: &mut pools,
        rules: &mut rules,
        rng: &mut rng,
        time: SimTime::default(),
    };
    player.update(&mut ctx).unwrap();

    let pool = pools.get_pool("Players").unwrap();
    let velocities = pool.component_array::<Velocity>("Velocity").unwrap();
    assert_eq!(velocities[0], Velocity(Vec2::new(0.0, PLAYER_FOCUS_SPEED)));
}

// ---- Fan geometry ----

#[test]
fn fan_spreads_symmetric_adjacent_spacing() {
    let (mut pools, mut rules) = spawn_setup(16, GroupInfo::new(5, 1, 1), &["SetSpeed", "Fan"]);
    rules.register("SetSpeed", Box::new(SetSpeed { speed: 2.0 }));
    rules.register("Fan", Box::new(Fan { spacing: 0.1 }));
    let mut rng = rng();

    stage_sources(&mut pools, 5);
    queue_spawns(&mut pools, &mut rules, &mut rng, "Emitters", 0).unwrap();

    let pool = pools.get_pool("Bullets").unwrap();
    let velocities = pool.component_array::<Velocity>("Velocity").unwrap();
    let base = Velocity(Vec2::new(0.0, -1.0)).angle();

    let mut angles: Vec<f32> = (0..5).map(|slot| velocities[slot].angle()).collect();
    angles.sort_by(f32::total_cmp);

    for (index, angle) in angles.iter().enumerate() {
        assert!((velocities[index].speed() - 2.0).abs() < 1e-6);
        let expected = base + (index as f32 - 2.0) * 0.1;
        assert!((angle - expected).abs() < 1e-5);
    }
}
