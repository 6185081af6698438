//! The built-in spawn rules.
//!
//! Count rules reshape a batch's `GroupInfo`; value rules fill component
//! data for the materialized slots. Rule instances are configured once and
//! registered by name in a `SpawnRuleSet`; a spawner references them by that
//! name. A value rule that needs a component the destination pool lacks
//! fails fast, naming the rule, the pool, and the missing component.

use std::collections::HashMap;

use glam::Vec2;
use rand::Rng;

use hailstorm_core::components::{ColorTint, Destructible, Position, Velocity};
use hailstorm_core::spawn::GroupInfo;

use crate::component::ComponentArray;
use crate::error::{SimError, SimResult};
use crate::pool::Pool;
use crate::spawn::{SpawnRule, SpawnRuleContext, SpawnRuleStage};

/// Rewrap a missing-array error with the rule's name so the failure is
/// traceable to the spawn configuration.
fn rule_error(rule: &'static str, err: SimError) -> SimError {
    match err {
        SimError::MissingComponentArray { pool, component } => SimError::RuleMissingComponent {
            rule: rule.to_string(),
            pool,
            component,
        },
        other => other,
    }
}

fn positions<'p>(
    rule: &'static str,
    pool: &'p mut Pool,
) -> SimResult<&'p mut ComponentArray<Position>> {
    pool.component_array_mut::<Position>("Position")
        .map_err(|err| rule_error(rule, err))
}

fn velocities<'p>(
    rule: &'static str,
    pool: &'p mut Pool,
) -> SimResult<&'p mut ComponentArray<Velocity>> {
    pool.component_array_mut::<Velocity>("Velocity")
        .map_err(|err| rule_error(rule, err))
}

// ---- Count rules ----

/// Add a fixed amount to the batch's group count. A result outside
/// `[min, max]` is rejected and the count left unchanged.
pub struct IncrementCount {
    pub amount: i32,
    pub min: u32,
    pub max: u32,
}

impl SpawnRule for IncrementCount {
    fn stage(&self) -> SpawnRuleStage {
        SpawnRuleStage::Count
    }

    fn adjust_counts(&mut self, groups: &mut GroupInfo) {
        let adjusted = groups.num_groups as i64 + self.amount as i64;
        if adjusted >= self.min as i64 && adjusted <= self.max as i64 {
            groups.num_groups = adjusted as u32;
        }
    }
}

/// Grow the group count a little more on every batch, for escalating
/// patterns. Out-of-range results are rejected without advancing.
pub struct IterateCount {
    pub step: u32,
    pub min: u32,
    pub max: u32,
    iteration: u32,
}

impl IterateCount {
    pub fn new(step: u32, min: u32, max: u32) -> Self {
        IterateCount {
            step,
            min,
            max,
            iteration: 0,
        }
    }
}

impl SpawnRule for IterateCount {
    fn stage(&self) -> SpawnRuleStage {
        SpawnRuleStage::Count
    }

    fn adjust_counts(&mut self, groups: &mut GroupInfo) {
        let adjusted = groups.num_groups as u64 + (self.step as u64 * self.iteration as u64);
        if adjusted >= self.min as u64 && adjusted <= self.max as u64 {
            groups.num_groups = adjusted as u32;
            self.iteration += 1;
        }
    }
}

// ---- Value rules: position ----

/// Place every new object at its source spawner object's position.
pub struct MatchSpawnerPosition;

impl SpawnRule for MatchSpawnerPosition {
    fn stage(&self) -> SpawnRuleStage {
        SpawnRuleStage::Value
    }

    fn apply(&mut self, ctx: &mut SpawnRuleContext<'_>) -> SimResult<()> {
        let placements: Vec<(usize, Vec2)> = ctx
            .slots()
            .iter()
            .map(|slot| (slot.index, ctx.source_for(slot).position))
            .collect();
        let positions = positions("MatchSpawnerPosition", ctx.pool)?;
        for (index, position) in placements {
            positions[index] = Position(position);
        }
        Ok(())
    }
}

/// Translate every new object by a fixed offset.
pub struct OffsetPosition {
    pub offset: Vec2,
}

impl SpawnRule for OffsetPosition {
    fn stage(&self) -> SpawnRuleStage {
        SpawnRuleStage::Value
    }

    fn apply(&mut self, ctx: &mut SpawnRuleContext<'_>) -> SimResult<()> {
        let slots = ctx.slots();
        let positions = positions("OffsetPosition", ctx.pool)?;
        for slot in &slots {
            positions[slot.index].0 += self.offset;
        }
        Ok(())
    }
}

/// Scatter positions uniformly inside a box centered on each object's
/// current position.
pub struct RandomPositionBox {
    pub half_extents: Vec2,
}

impl SpawnRule for RandomPositionBox {
    fn stage(&self) -> SpawnRuleStage {
        SpawnRuleStage::Value
    }

    fn apply(&mut self, ctx: &mut SpawnRuleContext<'_>) -> SimResult<()> {
        let jitters: Vec<(usize, Vec2)> = ctx
            .slots()
            .iter()
            .map(|slot| {
                let jitter = Vec2::new(
                    ctx.rng
                        .gen_range(-self.half_extents.x..=self.half_extents.x),
                    ctx.rng
                        .gen_range(-self.half_extents.y..=self.half_extents.y),
                );
                (slot.index, jitter)
            })
            .collect();
        let positions = positions("RandomPositionBox", ctx.pool)?;
        for (index, jitter) in jitters {
            positions[index].0 += jitter;
        }
        Ok(())
    }
}

// ---- Value rules: speed and direction ----

/// Set every new object's speed, preserving its heading.
pub struct SetSpeed {
    pub speed: f32,
}

impl SpawnRule for SetSpeed {
    fn stage(&self) -> SpawnRuleStage {
        SpawnRuleStage::Value
    }

    fn apply(&mut self, ctx: &mut SpawnRuleContext<'_>) -> SimResult<()> {
        let slots = ctx.slots();
        let velocities = velocities("SetSpeed", ctx.pool)?;
        for slot in &slots {
            let angle = velocities[slot.index].angle();
            velocities[slot.index] = Velocity(Vec2::from_angle(angle) * self.speed);
        }
        Ok(())
    }
}

/// Roll a uniform speed per object, preserving its heading.
pub struct RandomSpeed {
    pub min: f32,
    pub max: f32,
}

impl SpawnRule for RandomSpeed {
    fn stage(&self) -> SpawnRuleStage {
        SpawnRuleStage::Value
    }

    fn apply(&mut self, ctx: &mut SpawnRuleContext<'_>) -> SimResult<()> {
        let speeds: Vec<(usize, f32)> = ctx
            .slots()
            .iter()
            .map(|slot| (slot.index, ctx.rng.gen_range(self.min..=self.max)))
            .collect();
        let velocities = velocities("RandomSpeed", ctx.pool)?;
        for (index, speed) in speeds {
            let angle = velocities[index].angle();
            velocities[index] = Velocity(Vec2::from_angle(angle) * speed);
        }
        Ok(())
    }
}

/// Roll a uniform heading per object, preserving its speed.
pub struct RandomDirection;

impl SpawnRule for RandomDirection {
    fn stage(&self) -> SpawnRuleStage {
        SpawnRuleStage::Value
    }

    fn apply(&mut self, ctx: &mut SpawnRuleContext<'_>) -> SimResult<()> {
        let headings: Vec<(usize, f32)> = ctx
            .slots()
            .iter()
            .map(|slot| (slot.index, ctx.rng.gen_range(0.0..std::f32::consts::TAU)))
            .collect();
        let velocities = velocities("RandomDirection", ctx.pool)?;
        for (index, angle) in headings {
            let speed = velocities[index].speed();
            velocities[index] = Velocity(Vec2::from_angle(angle) * speed);
        }
        Ok(())
    }
}

/// Rotate every new object's heading by a fixed angle.
pub struct RotateDirection {
    pub angle: f32,
}

impl SpawnRule for RotateDirection {
    fn stage(&self) -> SpawnRuleStage {
        SpawnRuleStage::Value
    }

    fn apply(&mut self, ctx: &mut SpawnRuleContext<'_>) -> SimResult<()> {
        let slots = ctx.slots();
        let velocities = velocities("RotateDirection", ctx.pool)?;
        let rotation = Vec2::from_angle(self.angle);
        for slot in &slots {
            velocities[slot.index].0 = rotation.rotate(velocities[slot.index].0);
        }
        Ok(())
    }
}

// ---- Value rules: patterns ----

/// Spread the batch's groups into a fan: group `g` of `n` is rotated
/// `(g - (n - 1) / 2) * spacing` radians, symmetric around the base
/// heading.
pub struct Fan {
    pub spacing: f32,
}

impl SpawnRule for Fan {
    fn stage(&self) -> SpawnRuleStage {
        SpawnRuleStage::Value
    }

    fn apply(&mut self, ctx: &mut SpawnRuleContext<'_>) -> SimResult<()> {
        let slots = ctx.slots();
        let center = (ctx.groups.num_groups.saturating_sub(1)) as f32 / 2.0;
        let velocities = velocities("Fan", ctx.pool)?;
        for slot in &slots {
            let offset = (slot.group as f32 - center) * self.spacing;
            velocities[slot.index].0 = Vec2::from_angle(offset).rotate(velocities[slot.index].0);
        }
        Ok(())
    }
}

/// Spread the batch's groups evenly around a full circle.
pub struct Ring;

impl SpawnRule for Ring {
    fn stage(&self) -> SpawnRuleStage {
        SpawnRuleStage::Value
    }

    fn apply(&mut self, ctx: &mut SpawnRuleContext<'_>) -> SimResult<()> {
        let slots = ctx.slots();
        let step = std::f32::consts::TAU / ctx.groups.num_groups.max(1) as f32;
        let velocities = velocities("Ring", ctx.pool)?;
        for slot in &slots {
            let offset = slot.group as f32 * step;
            velocities[slot.index].0 = Vec2::from_angle(offset).rotate(velocities[slot.index].0);
        }
        Ok(())
    }
}

/// Mirror odd layer copies horizontally, for left/right symmetric patterns.
pub struct Mirror;

impl SpawnRule for Mirror {
    fn stage(&self) -> SpawnRuleStage {
        SpawnRuleStage::Value
    }

    fn apply(&mut self, ctx: &mut SpawnRuleContext<'_>) -> SimResult<()> {
        let slots = ctx.slots();
        let velocities = velocities("Mirror", ctx.pool)?;
        for slot in &slots {
            if slot.layer_copy % 2 == 1 {
                velocities[slot.index].0.x = -velocities[slot.index].0.x;
            }
        }
        Ok(())
    }
}

/// Rotate each batch a little further than the last one fired by the same
/// spawner slot. The accumulated angle is per-spawner-slot state, sized with
/// the spawner pool and compacted in lockstep with it.
pub struct Spiral {
    pub radians_per_spawn: f32,
    angles: HashMap<String, Vec<f32>>,
}

impl Spiral {
    pub fn new(radians_per_spawn: f32) -> Self {
        Spiral {
            radians_per_spawn,
            angles: HashMap::new(),
        }
    }
}

impl SpawnRule for Spiral {
    fn stage(&self) -> SpawnRuleStage {
        SpawnRuleStage::Value
    }

    fn apply(&mut self, ctx: &mut SpawnRuleContext<'_>) -> SimResult<()> {
        let slots = ctx.slots();
        let angles = self
            .angles
            .entry(ctx.spawner_pool.to_string())
            .or_default();

        let rotations: Vec<(usize, f32)> = slots
            .iter()
            .map(|slot| {
                let source_slot = ctx.source_for(slot).slot;
                if angles.len() <= source_slot {
                    angles.resize(source_slot + 1, 0.0);
                }
                (slot.index, angles[source_slot])
            })
            .collect();

        let velocities = velocities("Spiral", ctx.pool)?;
        for (index, accumulated) in rotations {
            velocities[index].0 = Vec2::from_angle(accumulated).rotate(velocities[index].0);
        }

        // Advance each firing slot once per batch, however many objects it
        // produced.
        let mut advanced: Vec<usize> = Vec::new();
        for slot in &slots {
            let source_slot = ctx.source_for(slot).slot;
            if !advanced.contains(&source_slot) {
                angles[source_slot] += self.radians_per_spawn;
                advanced.push(source_slot);
            }
        }
        Ok(())
    }

    fn sync_spawner_capacity(&mut self, pool: &str, capacity: usize) {
        if let Some(angles) = self.angles.get_mut(pool) {
            angles.resize(capacity, 0.0);
        }
    }

    fn handle_destructions(
        &mut self,
        pool: &str,
        destroyed: &[Destructible],
        initial_alive_end: usize,
        end: usize,
    ) {
        let Some(angles) = self.angles.get_mut(pool) else {
            return;
        };
        let end = end.min(angles.len());
        if initial_alive_end >= end {
            return;
        }
        let mut alive_end = initial_alive_end;
        for next_alive in initial_alive_end..end {
            if !destroyed[next_alive].destroyed {
                angles[alive_end] = angles[next_alive];
                alive_end += 1;
            }
        }
    }
}

// ---- Value rules: color ----

/// Set every new object's color tint.
pub struct SetColor {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl SpawnRule for SetColor {
    fn stage(&self) -> SpawnRuleStage {
        SpawnRuleStage::Value
    }

    fn apply(&mut self, ctx: &mut SpawnRuleContext<'_>) -> SimResult<()> {
        let slots = ctx.slots();
        let tints = ctx
            .pool
            .component_array_mut::<ColorTint>("ColorTint")
            .map_err(|err| rule_error("SetColor", err))?;
        for slot in &slots {
            tints[slot.index] = ColorTint {
                red: self.red,
                green: self.green,
                blue: self.blue,
                alpha: self.alpha,
            };
        }
        Ok(())
    }
}
