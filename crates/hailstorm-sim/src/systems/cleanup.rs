//! Marks objects for destruction.
//!
//! Two checks: lifetime expiry (a Lifetime of zero remaining ticks) and
//! leaving the pool's boundary box plus margin. This system only sets the
//! destroyed flag; the destruction system compacts at its own place in the
//! update order.

use hailstorm_core::components::{BoundaryBox, Destructible, Lifetime, Position};
use hailstorm_core::constants::BOUNDS_MARGIN;

use crate::component::ComponentArray;
use crate::error::{SimError, SimResult};
use crate::system::{update_pool_group, PoolGroups, PoolType, System, TickContext};

const LIFETIME_POOLS: &str = "lifetime_pools";
const BOUNDED_POOLS: &str = "bounded_pools";

pub struct CleanupSystem {
    groups: PoolGroups,
}

impl CleanupSystem {
    pub fn new() -> Self {
        let mut groups = PoolGroups::new();
        groups.add_group(
            LIFETIME_POOLS,
            PoolType::new()
                .with_array("Lifetime")
                .with_array("Destructible"),
        );
        groups.add_group(
            BOUNDED_POOLS,
            PoolType::new()
                .with_array("Position")
                .with_array("Destructible")
                .with_shared("BoundaryBox"),
        );
        CleanupSystem { groups }
    }
}

impl Default for CleanupSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CleanupSystem {
    fn pool_groups(&mut self) -> &mut PoolGroups {
        &mut self.groups
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        // Lifetime expiry.
        update_pool_group(&self.groups, LIFETIME_POOLS, ctx.pools, |pool| {
            let size = pool.size();
            let mut lifetime_column = pool.take_column("Lifetime")?;
            let lifetimes = lifetime_column
                .as_any_mut()
                .downcast_mut::<ComponentArray<Lifetime>>()
                .ok_or_else(|| SimError::ComponentTypeMismatch {
                    pool: pool.name().to_string(),
                    component: "Lifetime".to_string(),
                });

            let result = lifetimes.and_then(|lifetimes| {
                let flags = pool.component_array_mut::<Destructible>("Destructible")?;
                for slot in 0..size {
                    if lifetimes[slot].remaining_ticks == 0 {
                        flags[slot].destroyed = true;
                    } else {
                        lifetimes[slot].remaining_ticks -= 1;
                    }
                }
                Ok(())
            });

            pool.put_column("Lifetime", lifetime_column);
            result
        })?;

        // Out of bounds.
        update_pool_group(&self.groups, BOUNDED_POOLS, ctx.pools, |pool| {
            let boundary = *pool.shared::<BoundaryBox>("BoundaryBox")?;
            let size = pool.size();
            let position_column = pool.take_column("Position")?;
            let positions = position_column
                .as_any()
                .downcast_ref::<ComponentArray<Position>>()
                .ok_or_else(|| SimError::ComponentTypeMismatch {
                    pool: pool.name().to_string(),
                    component: "Position".to_string(),
                });

            let result = positions.and_then(|positions| {
                let flags = pool.component_array_mut::<Destructible>("Destructible")?;
                for slot in 0..size {
                    if !boundary.contains(positions[slot].0, BOUNDS_MARGIN) {
                        flags[slot].destroyed = true;
                    }
                }
                Ok(())
            });

            pool.put_column("Position", position_column);
            result
        })
    }
}
