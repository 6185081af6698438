//! Player movement.
//!
//! The core never polls devices; it consumes a boolean key-query interface
//! and writes velocity on pools tagged `Player`. Holding the focus key
//! switches to the slower, precise movement speed.

use glam::Vec2;

use hailstorm_core::components::Velocity;
use hailstorm_core::constants::{PLAYER_FOCUS_SPEED, PLAYER_SPEED};

use crate::error::SimResult;
use crate::system::{update_pool_group, PoolGroups, PoolType, System, TickContext};

/// Keys the simulation core cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Focus,
    Shoot,
}

/// Input query interface supplied by the shell. The core only ever asks
/// questions; polling and event pumping happen elsewhere.
pub trait InputSource: Send {
    fn key_is_down(&self, key: Key) -> bool;

    /// True only on the tick the key went down.
    fn key_triggered(&self, key: Key) -> bool;
}

const PLAYER_POOLS: &str = "player_pools";

pub struct PlayerSystem {
    groups: PoolGroups,
    input: Box<dyn InputSource>,
}

impl PlayerSystem {
    pub fn new(input: Box<dyn InputSource>) -> Self {
        let mut groups = PoolGroups::new();
        groups.add_group(
            PLAYER_POOLS,
            PoolType::new().with_array("Velocity").with_tag("Player"),
        );
        PlayerSystem { groups, input }
    }
}

impl System for PlayerSystem {
    fn pool_groups(&mut self) -> &mut PoolGroups {
        &mut self.groups
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        let mut axis = Vec2::ZERO;
        if self.input.key_is_down(Key::Right) {
            axis.x += 1.0;
        }
        if self.input.key_is_down(Key::Left) {
            axis.x -= 1.0;
        }
        if self.input.key_is_down(Key::Up) {
            axis.y += 1.0;
        }
        if self.input.key_is_down(Key::Down) {
            axis.y -= 1.0;
        }

        let speed = if self.input.key_is_down(Key::Focus) {
            PLAYER_FOCUS_SPEED
        } else {
            PLAYER_SPEED
        };
        let velocity = axis.normalize_or_zero() * speed;

        update_pool_group(&self.groups, PLAYER_POOLS, ctx.pools, |pool| {
            let size = pool.size();
            let velocities = pool.component_array_mut::<Velocity>("Velocity")?;
            for slot in 0..size {
                velocities[slot] = Velocity(velocity);
            }
            Ok(())
        })
    }
}
