//! Batched draw submission.
//!
//! Walks every drawable pool in ascending sprite-layer order and hands each
//! one's component arrays to an opaque renderer as a single instanced-quad
//! batch. The core never issues GPU calls itself; the renderer trait is the
//! boundary.

use hailstorm_core::components::{Position, Rotation, Scale, Sprite, TexCoords};

use crate::error::SimResult;
use crate::system::{PoolGroups, PoolType, System, TickContext};

/// One pool's worth of quads, ready for an instanced draw call.
pub struct QuadBatch<'a> {
    pub positions: &'a [Position],
    pub scales: &'a [Scale],
    pub rotations: &'a [Rotation],
    pub tex_coords: &'a [TexCoords],
    pub count: usize,
    pub texture: &'a str,
}

/// Rendering backend supplied by the shell.
pub trait Renderer: Send {
    fn draw_quads(&mut self, batch: QuadBatch<'_>);
}

const DRAWABLE_POOLS: &str = "drawable_pools";

pub struct DrawSystem {
    groups: PoolGroups,
    renderer: Box<dyn Renderer>,
}

impl DrawSystem {
    pub fn new(renderer: Box<dyn Renderer>) -> Self {
        let mut groups = PoolGroups::new();
        groups.add_group(
            DRAWABLE_POOLS,
            PoolType::new()
                .with_array("Position")
                .with_array("Scale")
                .with_array("Rotation")
                .with_array("TexCoords")
                .with_shared("Sprite"),
        );
        DrawSystem { groups, renderer }
    }
}

impl System for DrawSystem {
    fn pool_groups(&mut self) -> &mut PoolGroups {
        &mut self.groups
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        // Order pools by their sprite layer; ties keep subscription order.
        let mut layered: Vec<(i32, String)> = Vec::new();
        for pool_name in self.groups.group(DRAWABLE_POOLS) {
            let Some(pool) = ctx.pools.get_pool(pool_name) else {
                continue;
            };
            let sprite = pool.shared::<Sprite>("Sprite")?;
            layered.push((sprite.layer, pool_name.clone()));
        }
        layered.sort_by_key(|(layer, _)| *layer);

        for (_, pool_name) in &layered {
            let Some(pool) = ctx.pools.get_pool(pool_name) else {
                continue;
            };
            let count = pool.size();
            if count == 0 {
                continue;
            }
            let sprite = pool.shared::<Sprite>("Sprite")?;
            let batch = QuadBatch {
                positions: &pool.component_array::<Position>("Position")?.as_slice()[..count],
                scales: &pool.component_array::<Scale>("Scale")?.as_slice()[..count],
                rotations: &pool.component_array::<Rotation>("Rotation")?.as_slice()[..count],
                tex_coords: &pool.component_array::<TexCoords>("TexCoords")?.as_slice()[..count],
                count,
                texture: &sprite.texture,
            };
            self.renderer.draw_quads(batch);
        }
        Ok(())
    }
}
