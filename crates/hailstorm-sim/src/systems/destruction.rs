//! Lazy delete and in-place compaction.
//!
//! Update order is fixed and significant: first free the handle of every
//! destroyed object in handle-carrying pools (the handle's slot index is
//! meaningless after compaction), then compact every destructible pool, then
//! resync every surviving handle to its object's new slot.

use hailstorm_core::components::{Destructible, HandleIndex};

use crate::error::SimResult;
use crate::handle::HandleDirectory;
use crate::system::{update_pool_group, PoolGroups, PoolType, System, TickContext};

const DESTRUCTIBLE_POOLS: &str = "destructible_pools";
const HANDLE_POOLS: &str = "handle_pools";

pub struct DestructionSystem {
    groups: PoolGroups,
}

impl DestructionSystem {
    pub fn new() -> Self {
        let mut groups = PoolGroups::new();
        groups.add_group(
            DESTRUCTIBLE_POOLS,
            PoolType::new().with_array("Destructible"),
        );
        groups.add_group(
            HANDLE_POOLS,
            PoolType::new()
                .with_array("Destructible")
                .with_array("HandleIndex")
                .with_shared("HandleDirectory"),
        );
        DestructionSystem { groups }
    }
}

impl Default for DestructionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for DestructionSystem {
    fn pool_groups(&mut self) -> &mut PoolGroups {
        &mut self.groups
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        let pools = &mut *ctx.pools;
        let rules = &mut *ctx.rules;

        // 1. Free the handles of destroyed objects while their slot indices
        //    are still valid.
        update_pool_group(&self.groups, HANDLE_POOLS, pools, |pool| {
            let destroyed_handles: Vec<usize> = {
                let flags = pool.component_array::<Destructible>("Destructible")?;
                let handle_indices = pool.component_array::<HandleIndex>("HandleIndex")?;
                (0..pool.size())
                    .filter(|&slot| flags[slot].destroyed)
                    .map(|slot| handle_indices[slot].index)
                    .collect()
            };
            if destroyed_handles.is_empty() {
                return Ok(());
            }
            let directory = pool.shared_mut::<HandleDirectory>("HandleDirectory")?;
            for handle_index in destroyed_handles {
                directory.free_handle(handle_index);
            }
            Ok(())
        })?;

        // 2. Compact. Per-slot spawn-rule state compacts inside the same
        //    pass, against the original destroyed flags.
        update_pool_group(&self.groups, DESTRUCTIBLE_POOLS, pools, |pool| {
            let pool_name = pool.name().to_string();
            pool.destroy_objects(|flags, initial_alive_end, end| {
                rules.handle_destructions(&pool_name, flags, initial_alive_end, end);
            })?;
            Ok(())
        })?;

        // 3. Survivors moved; point every live handle at its new slot.
        update_pool_group(&self.groups, HANDLE_POOLS, pools, |pool| {
            let slot_to_handle: Vec<(usize, usize)> = {
                let handle_indices = pool.component_array::<HandleIndex>("HandleIndex")?;
                (0..pool.size())
                    .map(|slot| (slot, handle_indices[slot].index))
                    .collect()
            };
            let directory = pool.shared_mut::<HandleDirectory>("HandleDirectory")?;
            for (slot, handle_index) in slot_to_handle {
                directory.set_pool_index(handle_index, slot);
            }
            Ok(())
        })
    }
}
