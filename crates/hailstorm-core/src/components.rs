//! Component types stored in pools.
//!
//! Per-slot components live in densely packed arrays, one element per object
//! slot. Shared components are a single instance owned by the whole pool
//! (sprite, boundary box, spawner config).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::constants::NULL_HANDLE_INDEX;
use crate::spawn::SpawnInfo;

// ---- Per-slot components ----

/// World-space position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec2);

/// Velocity in units/second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity(pub Vec2);

impl Velocity {
    /// Heading in radians. Zero velocity reports a zero heading.
    pub fn angle(&self) -> f32 {
        self.0.y.atan2(self.0.x)
    }

    /// Speed magnitude (units/second).
    pub fn speed(&self) -> f32 {
        self.0.length()
    }
}

/// Sprite rotation in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub angle: f32,
}

/// Sprite scale. Defaults to 1x1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale(pub Vec2);

impl Default for Scale {
    fn default() -> Self {
        Scale(Vec2::ONE)
    }
}

/// Texture sub-rectangle for the instanced quad draw call.
/// Defaults to the full texture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TexCoords {
    pub offset: Vec2,
    pub extent: Vec2,
}

impl Default for TexCoords {
    fn default() -> Self {
        TexCoords {
            offset: Vec2::ZERO,
            extent: Vec2::ONE,
        }
    }
}

/// RGBA color multiplier. Defaults to opaque white (no tint).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorTint {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl Default for ColorTint {
    fn default() -> Self {
        ColorTint {
            red: 1.0,
            green: 1.0,
            blue: 1.0,
            alpha: 1.0,
        }
    }
}

/// Remaining lifetime in ticks. The cleanup system marks the object
/// destroyed when this reaches zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifetime {
    pub remaining_ticks: u32,
}

/// Lazy-delete flag. The destruction system compacts marked objects out of
/// the pool at the end of the tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destructible {
    pub destroyed: bool,
}

/// Countdown until the next spawn batch fires for this spawner slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnTimer {
    pub ticks_remaining: u32,
    pub interval: u32,
}

/// Index of this slot's entry in the pool's handle directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleIndex {
    pub index: usize,
}

impl Default for HandleIndex {
    fn default() -> Self {
        HandleIndex {
            index: NULL_HANDLE_INDEX,
        }
    }
}

// ---- Shared components ----

/// Texture and draw-layer configuration shared by every object in a pool.
/// Batches are drawn in ascending layer order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub texture: String,
    pub layer: i32,
}

/// Axis-aligned play area for a pool. Objects outside it (plus margin) are
/// marked for destruction by the cleanup system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryBox {
    pub min: Vec2,
    pub max: Vec2,
}

impl BoundaryBox {
    pub fn contains(&self, point: Vec2, margin: f32) -> bool {
        point.x >= self.min.x - margin
            && point.x <= self.max.x + margin
            && point.y >= self.min.y - margin
            && point.y <= self.max.y + margin
    }
}

/// Spawner configuration shared by a pool: each entry describes one spawn
/// batch (destination, archetype, rules) this pool can emit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Spawner {
    pub spawns: Vec<SpawnInfo>,
}
