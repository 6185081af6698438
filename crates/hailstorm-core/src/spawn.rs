//! Spawn configuration data.
//!
//! A `SpawnInfo` describes one batch a spawner pool can emit: where the new
//! objects go, which archetype seeds them, and which rules shape them.
//! `GroupInfo` gives the batch its pattern dimensions, and
//! `destination_index` is the addressing scheme every value rule uses to find
//! its slots inside the contiguous destination range.

use serde::{Deserialize, Serialize};

/// Pattern dimensions for one spawn batch.
///
/// `num_groups` counts distinct variations (e.g. arms of a fan),
/// `num_objects_per_group` counts objects sharing one variation's values, and
/// `num_layer_copies` counts whole-pattern repeats (e.g. mirrored layers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub num_groups: u32,
    pub num_objects_per_group: u32,
    pub num_layer_copies: u32,
}

impl Default for GroupInfo {
    fn default() -> Self {
        GroupInfo {
            num_groups: 1,
            num_objects_per_group: 1,
            num_layer_copies: 1,
        }
    }
}

impl GroupInfo {
    pub fn new(num_groups: u32, num_objects_per_group: u32, num_layer_copies: u32) -> Self {
        GroupInfo {
            num_groups,
            num_objects_per_group,
            num_layer_copies,
        }
    }

    /// Total objects one full pattern instance occupies.
    pub fn total(&self) -> usize {
        self.num_groups as usize * self.num_objects_per_group as usize
            * self.num_layer_copies as usize
    }
}

/// Destination slot for the `(object, group, layer_copy)` triple of a spawn
/// batch starting at `first`: row-major flattening with layer copies as whole
/// repeated blocks. Every value rule addresses its slots through this formula
/// so they stay consistent with the contiguous range the batch was laid out
/// in.
pub fn destination_index(
    first: usize,
    object: u32,
    group: u32,
    layer_copy: u32,
    groups: &GroupInfo,
) -> usize {
    first
        + layer_copy as usize * (groups.num_groups as usize * groups.num_objects_per_group as usize)
        + group as usize * groups.num_objects_per_group as usize
        + object as usize
}

/// One spawn batch configuration: destination pool, seeding archetype, the
/// ordered rule list applied to each batch, and the batch's base pattern
/// dimensions.
///
/// `source_indices` is transient per-tick state: the spawner-pool slots that
/// fired this tick, one entry per object to create. It is cleared
/// unconditionally after every batch, whether or not any objects were
/// actually created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpawnInfo {
    pub destination_pool: String,
    pub spawn_archetype: String,
    pub rule_names: Vec<String>,
    pub group_info: GroupInfo,
    #[serde(skip)]
    pub source_indices: Vec<usize>,
}

impl SpawnInfo {
    pub fn new(destination_pool: &str, spawn_archetype: &str, rule_names: &[&str]) -> Self {
        SpawnInfo {
            destination_pool: destination_pool.to_string(),
            spawn_archetype: spawn_archetype.to_string(),
            rule_names: rule_names.iter().map(|s| s.to_string()).collect(),
            group_info: GroupInfo::default(),
            source_indices: Vec::new(),
        }
    }

    pub fn with_group_info(mut self, group_info: GroupInfo) -> Self {
        self.group_info = group_info;
        self
    }
}
