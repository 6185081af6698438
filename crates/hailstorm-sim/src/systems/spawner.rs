//! Spawn staging.
//!
//! Pools carrying a shared `Spawner` config and a `SpawnTimer` array emit
//! spawn batches: each live slot counts its timer down, and when it fires,
//! the slot's index is staged into every configured `SpawnInfo` (one copy
//! per object of the batch's pattern). Every staged batch is then handed to
//! `queue_spawns`, which runs the rule pipeline and queues the new objects
//! for activation on the next creation pass.

use hailstorm_core::components::{SpawnTimer, Spawner};

use crate::error::SimResult;
use crate::system::{PoolGroups, PoolType, System, TickContext};
use crate::systems::creation::queue_spawns;

const SPAWNER_POOLS: &str = "spawner_pools";

pub struct SpawnerSystem {
    groups: PoolGroups,
}

impl SpawnerSystem {
    pub fn new() -> Self {
        let mut groups = PoolGroups::new();
        groups.add_group(
            SPAWNER_POOLS,
            PoolType::new()
                .with_array("SpawnTimer")
                .with_shared("Spawner"),
        );
        SpawnerSystem { groups }
    }
}

impl Default for SpawnerSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for SpawnerSystem {
    fn pool_groups(&mut self) -> &mut PoolGroups {
        &mut self.groups
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        let pool_names: Vec<String> = self.groups.group(SPAWNER_POOLS).to_vec();

        for pool_name in &pool_names {
            let spawn_count = {
                let Some(pool) = ctx.pools.get_pool_mut(pool_name) else {
                    continue;
                };

                let size = pool.size();
                let fired: Vec<usize> = {
                    let timers = pool.component_array_mut::<SpawnTimer>("SpawnTimer")?;
                    let mut fired = Vec::new();
                    for slot in 0..size {
                        let timer = &mut timers[slot];
                        if timer.ticks_remaining > 0 {
                            timer.ticks_remaining -= 1;
                        } else {
                            timer.ticks_remaining = timer.interval;
                            fired.push(slot);
                        }
                    }
                    fired
                };

                let spawner = pool.shared_mut::<Spawner>("Spawner")?;
                if !fired.is_empty() {
                    for info in &mut spawner.spawns {
                        let copies = info.group_info.total();
                        for &slot in &fired {
                            for _ in 0..copies {
                                info.source_indices.push(slot);
                            }
                        }
                    }
                }
                spawner.spawns.len()
            };

            for spawn_index in 0..spawn_count {
                queue_spawns(ctx.pools, ctx.rules, ctx.rng, pool_name, spawn_index)?;
            }
        }
        Ok(())
    }
}
