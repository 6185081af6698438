//! Kinematic integration.
//!
//! Euler integration over every pool with Position + Velocity:
//! `position += velocity * DT`. Pools that also carry a Rotation array get
//! their rotation aligned to the velocity direction, so sprites face where
//! they are headed.

use hailstorm_core::components::{Position, Rotation, Velocity};
use hailstorm_core::constants::DT;

use crate::component::ComponentArray;
use crate::error::{SimError, SimResult};
use crate::system::{update_pool_group, PoolGroups, PoolType, System, TickContext};

const MOVING_POOLS: &str = "moving_pools";

pub struct MovementSystem {
    groups: PoolGroups,
}

impl MovementSystem {
    pub fn new() -> Self {
        let mut groups = PoolGroups::new();
        groups.add_group(
            MOVING_POOLS,
            PoolType::new().with_array("Position").with_array("Velocity"),
        );
        MovementSystem { groups }
    }
}

impl Default for MovementSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for MovementSystem {
    fn pool_groups(&mut self) -> &mut PoolGroups {
        &mut self.groups
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        update_pool_group(&self.groups, MOVING_POOLS, ctx.pools, |pool| {
            let size = pool.size();
            let velocity_column = pool.take_column("Velocity")?;
            let velocities = velocity_column
                .as_any()
                .downcast_ref::<ComponentArray<Velocity>>()
                .ok_or_else(|| SimError::ComponentTypeMismatch {
                    pool: pool.name().to_string(),
                    component: "Velocity".to_string(),
                });

            let result = velocities.and_then(|velocities| {
                let positions = pool.component_array_mut::<Position>("Position")?;
                for slot in 0..size {
                    positions[slot].0 += velocities[slot].0 * DT;
                }

                if pool.has_component_array("Rotation") {
                    let rotations = pool.component_array_mut::<Rotation>("Rotation")?;
                    for slot in 0..size {
                        if velocities[slot].speed() > 1e-6 {
                            rotations[slot].angle = velocities[slot].angle();
                        }
                    }
                }
                Ok(())
            });

            pool.put_column("Velocity", velocity_column);
            result
        })
    }
}
