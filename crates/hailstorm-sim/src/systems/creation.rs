//! Object creation and spawn realization.
//!
//! Two responsibilities each tick, in a fixed two-phase order: assign fresh
//! handles to every queued object in handle-carrying pools, then activate
//! the queued range in all pools. The order guarantees a handle exists
//! before any external code can observe the object as active.
//!
//! This module also owns `create_object` (direct, unqueued creation) and
//! `queue_spawns` (batch staging with the spawn-rule pipeline).

use hailstorm_core::archetype::ObjectArchetype;
use hailstorm_core::components::{HandleIndex, Position, Spawner, Velocity};
use hailstorm_core::spawn::{GroupInfo, SpawnInfo};
use rand_chacha::ChaCha8Rng;

use crate::error::{SimError, SimResult};
use crate::handle::HandleDirectory;
use crate::pool::Pool;
use crate::pool_manager::PoolManager;
use crate::spawn::{SourceObject, SpawnRuleContext, SpawnRuleSet, SpawnRuleStage};
use crate::system::{update_pool_group, PoolGroups, PoolType, System, TickContext};

const HANDLE_POOLS: &str = "handle_pools";
const ALL_POOLS: &str = "all_pools";

pub struct CreationSystem {
    groups: PoolGroups,
}

impl CreationSystem {
    pub fn new() -> Self {
        let mut groups = PoolGroups::new();
        groups.add_group(
            HANDLE_POOLS,
            PoolType::new()
                .with_array("HandleIndex")
                .with_shared("HandleDirectory"),
        );
        groups.add_group(ALL_POOLS, PoolType::new());
        CreationSystem { groups }
    }
}

impl Default for CreationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CreationSystem {
    fn pool_groups(&mut self) -> &mut PoolGroups {
        &mut self.groups
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        // Phase 1: queued objects in handle pools get their handles before
        // anything becomes observable as active.
        update_pool_group(&self.groups, HANDLE_POOLS, ctx.pools, |pool| {
            for slot in pool.size()..pool.size() + pool.queued() {
                assign_handle(pool, slot)?;
            }
            Ok(())
        })?;

        // Phase 2: activate the queued range everywhere.
        update_pool_group(&self.groups, ALL_POOLS, ctx.pools, |pool| {
            pool.activate_queued();
            Ok(())
        })
    }
}

/// Issue a handle for `slot` if the pool carries the handle subsystem;
/// otherwise a no-op.
pub(crate) fn assign_handle(pool: &mut Pool, slot: usize) -> SimResult<()> {
    if !pool.has_shared("HandleDirectory") || !pool.has_component_array("HandleIndex") {
        return Ok(());
    }
    let handle_index = pool
        .shared_mut::<HandleDirectory>("HandleDirectory")?
        .create_handle(slot);
    pool.component_array_mut::<HandleIndex>("HandleIndex")?[slot] =
        HandleIndex { index: handle_index };
    Ok(())
}

/// Create one object directly from an archetype, bypassing the queue: the
/// slot goes live immediately and gets a handle synchronously when the pool
/// has the handle subsystem. A full pool is a silent no-op (returns false).
pub fn create_object(pool: &mut Pool, archetype: &ObjectArchetype) -> SimResult<bool> {
    if pool.available_slots() == 0 {
        return Ok(false);
    }

    // Pending spawns sit at [size, size + queued); nudge them up so the new
    // object can claim slot `size`.
    pool.make_room_at_size();

    let slot = pool.size();
    pool.copy_archetype_to_slot(archetype, slot)?;
    pool.grow_size(1);
    assign_handle(pool, slot)?;
    Ok(true)
}

/// Realize one spawn batch: run count rules, copy the spawn archetype into
/// the queued range, run value rules, and clear the batch's source indices.
///
/// The batch is truncated to the destination's available slots; spawners
/// silently drop excess spawns rather than fail. Returns the number of
/// objects actually queued.
pub fn queue_spawns(
    pools: &mut PoolManager,
    rules: &mut SpawnRuleSet,
    rng: &mut ChaCha8Rng,
    spawner_pool: &str,
    spawn_index: usize,
) -> SimResult<usize> {
    let (info, source_slots) = {
        let pool = pools
            .get_pool_mut(spawner_pool)
            .ok_or_else(|| SimError::UnknownPool(spawner_pool.to_string()))?;
        let spawner = pool.shared_mut::<Spawner>("Spawner")?;
        let info: &mut SpawnInfo = &mut spawner.spawns[spawn_index];
        // Sources are cleared unconditionally, whether or not any object is
        // actually created below.
        let source_slots = std::mem::take(&mut info.source_indices);
        (info.clone(), source_slots)
    };

    if source_slots.is_empty() {
        return Ok(0);
    }

    // Count stage: finalize the pattern dimensions before any slot exists.
    let mut groups = info.group_info;
    for rule_name in &info.rule_names {
        let rule = rules.get_mut_or_err(rule_name, spawner_pool)?;
        if rule.stage() == SpawnRuleStage::Count {
            rule.adjust_counts(&mut groups);
        }
    }

    // Snapshot the triggering objects before touching the destination, so
    // value rules can read them even when a pool spawns into itself.
    let sources: Vec<SourceObject> = {
        let pool = pools
            .get_pool(spawner_pool)
            .ok_or_else(|| SimError::UnknownPool(spawner_pool.to_string()))?;
        let positions = pool.component_array::<Position>("Position").ok();
        let velocities = pool.component_array::<Velocity>("Velocity").ok();
        source_slots
            .iter()
            .map(|&slot| SourceObject {
                slot,
                position: positions.map(|p| p[slot].0).unwrap_or_default(),
                velocity: velocities.map(|v| v[slot].0).unwrap_or_default(),
            })
            .collect()
    };

    let mut destination = pools
        .take_pool(&info.destination_pool)
        .ok_or_else(|| SimError::UnknownPool(info.destination_pool.clone()))?;

    let result = realize_batch(&mut destination, rules, rng, spawner_pool, &info, &sources, groups);
    pools.put_pool(destination);
    result
}

fn realize_batch(
    destination: &mut Pool,
    rules: &mut SpawnRuleSet,
    rng: &mut ChaCha8Rng,
    spawner_pool: &str,
    info: &SpawnInfo,
    sources: &[SourceObject],
    groups: GroupInfo,
) -> SimResult<usize> {
    let available = destination.available_slots();
    let num_spawns = sources.len().min(available);
    if num_spawns < sources.len() {
        log::warn!(
            "spawn batch into `{}` truncated from {} to {} (pool full)",
            destination.name(),
            sources.len(),
            num_spawns
        );
    }
    if num_spawns == 0 {
        return Ok(0);
    }

    let archetype = destination
        .spawn_archetype(&info.spawn_archetype)
        .cloned()
        .ok_or_else(|| SimError::UnknownSpawnArchetype {
            pool: destination.name().to_string(),
            archetype: info.spawn_archetype.clone(),
        })?;

    let first_index = destination.size() + destination.queued();
    for offset in 0..num_spawns {
        destination.copy_archetype_to_slot(&archetype, first_index + offset)?;
    }
    destination.grow_queued(num_spawns);

    // Value stage over the materialized range.
    let mut ctx = SpawnRuleContext {
        pool: destination,
        spawner_pool,
        sources,
        first_index,
        num_spawns,
        groups,
        rng,
    };
    for rule_name in &info.rule_names {
        let rule = rules.get_mut_or_err(rule_name, spawner_pool)?;
        if rule.stage() == SpawnRuleStage::Value {
            rule.apply(&mut ctx)?;
        }
    }

    Ok(num_spawns)
}
