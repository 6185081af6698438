//! The spawn-rule pipeline.
//!
//! A spawn batch lays its new objects out in one contiguous queued range of
//! the destination pool. Rules shape that range in two strict stages: count
//! rules first reshape the batch's `GroupInfo` dimensions, then value rules
//! fill component data, addressing slots through the shared destination
//! index formula. The staging order is load-bearing: value rules iterate
//! `groups x objects_per_group x layer_copies`, so every count mutation must
//! be finalized before any value rule computes a destination index.

pub mod rules;

use std::collections::HashMap;

use glam::Vec2;
use rand_chacha::ChaCha8Rng;

use hailstorm_core::components::Destructible;
use hailstorm_core::spawn::{destination_index, GroupInfo};

use crate::error::{SimError, SimResult};
use crate::pool::Pool;

/// Which stage of the pipeline a rule runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnRuleStage {
    /// Mutates the batch's `GroupInfo` before any slot is written.
    Count,
    /// Mutates the newly created objects' component data.
    Value,
}

/// Snapshot of one spawner-pool object that triggered a spawn, taken before
/// the destination pool is touched so rules can read it even when a pool
/// spawns into itself.
#[derive(Debug, Clone, Copy)]
pub struct SourceObject {
    pub slot: usize,
    pub position: Vec2,
    pub velocity: Vec2,
}

/// One destination slot of a spawn batch, with its pattern coordinates.
#[derive(Debug, Clone, Copy)]
pub struct SpawnSlot {
    pub index: usize,
    pub object: u32,
    pub group: u32,
    pub layer_copy: u32,
}

/// Execution context handed to value rules.
pub struct SpawnRuleContext<'a> {
    pub pool: &'a mut Pool,
    pub spawner_pool: &'a str,
    pub sources: &'a [SourceObject],
    pub first_index: usize,
    pub num_spawns: usize,
    pub groups: GroupInfo,
    pub rng: &'a mut ChaCha8Rng,
}

impl SpawnRuleContext<'_> {
    /// Enumerate the batch's slots in the canonical nesting (layer copies
    /// outermost, objects innermost), guarded against slots the batch did
    /// not actually materialize.
    pub fn slots(&self) -> Vec<SpawnSlot> {
        let mut slots = Vec::with_capacity(self.num_spawns);
        for layer_copy in 0..self.groups.num_layer_copies {
            for group in 0..self.groups.num_groups {
                for object in 0..self.groups.num_objects_per_group {
                    let index =
                        destination_index(self.first_index, object, group, layer_copy, &self.groups);
                    if index < self.first_index + self.num_spawns {
                        slots.push(SpawnSlot {
                            index,
                            object,
                            group,
                            layer_copy,
                        });
                    }
                }
            }
        }
        slots
    }

    /// The source object positionally paired with a destination slot.
    pub fn source_for(&self, slot: &SpawnSlot) -> &SourceObject {
        &self.sources[(slot.index - self.first_index) % self.sources.len()]
    }
}

/// A composable mutation applied to a batch of newly spawned objects.
///
/// Rules carrying per-spawner-slot state ("with-array" rules) keep it sized
/// to the spawner pool's capacity and compact it in lockstep with the pool,
/// via the two sync hooks.
pub trait SpawnRule: Send + Sync {
    fn stage(&self) -> SpawnRuleStage;

    /// Count stage. Runs before any destination slot is written.
    fn adjust_counts(&mut self, _groups: &mut GroupInfo) {}

    /// Value stage. Runs over the materialized batch.
    fn apply(&mut self, _ctx: &mut SpawnRuleContext<'_>) -> SimResult<()> {
        Ok(())
    }

    /// A pool this rule may hold per-slot state for was created.
    fn sync_spawner_capacity(&mut self, _pool: &str, _capacity: usize) {}

    /// The named pool is being compacted; per-slot state must compact with
    /// the same original destroyed flags so it stays attached to the same
    /// surviving objects.
    fn handle_destructions(
        &mut self,
        _pool: &str,
        _destroyed: &[Destructible],
        _initial_alive_end: usize,
        _end: usize,
    ) {
    }
}

/// Registry of spawn rules by name. An explicit object passed by reference,
/// not process-wide state.
#[derive(Default)]
pub struct SpawnRuleSet {
    rules: HashMap<String, Box<dyn SpawnRule>>,
}

impl SpawnRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a configured rule instance. First registration wins.
    pub fn register(&mut self, name: &str, rule: Box<dyn SpawnRule>) {
        if self.rules.contains_key(name) {
            log::warn!("spawn rule `{name}` registered twice; keeping first registration");
            return;
        }
        self.rules.insert(name.to_string(), rule);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn SpawnRule>> {
        self.rules.get_mut(name)
    }

    /// Fetch a rule or fail fast, naming the pool whose config referenced it.
    pub fn get_mut_or_err(
        &mut self,
        name: &str,
        referencing_pool: &str,
    ) -> SimResult<&mut Box<dyn SpawnRule>> {
        self.rules
            .get_mut(name)
            .ok_or_else(|| SimError::UnknownSpawnRule {
                pool: referencing_pool.to_string(),
                rule: name.to_string(),
            })
    }

    pub fn sync_spawner_capacity(&mut self, pool: &str, capacity: usize) {
        for rule in self.rules.values_mut() {
            rule.sync_spawner_capacity(pool, capacity);
        }
    }

    pub fn handle_destructions(
        &mut self,
        pool: &str,
        destroyed: &[Destructible],
        initial_alive_end: usize,
        end: usize,
    ) {
        for rule in self.rules.values_mut() {
            rule.handle_destructions(pool, destroyed, initial_alive_end, end);
        }
    }
}
