//! Spaces and the per-tick driver.
//!
//! A `Space` is one self-contained simulation: it owns its seeded RNG, its
//! pools, its systems, and its spawn rules. One tick runs the system list in
//! the configured order, then advances time. The `SpaceManager` updates its
//! spaces in insertion order.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use hailstorm_core::archetype::PoolArchetype;
use hailstorm_core::types::SimTime;

use crate::error::{SimError, SimResult};
use crate::pool_manager::{ArchetypeManager, PoolManager};
use crate::registry::ComponentRegistry;
use crate::spawn::SpawnRuleSet;
use crate::system::{SystemManager, TickContext};

/// Couples the pool collection, the system roster, and the spawn rules, and
/// keeps system subscriptions in step with pool lifecycle.
#[derive(Default)]
pub struct ObjectManager {
    pools: PoolManager,
    systems: SystemManager,
    rules: SpawnRuleSet,
}

impl ObjectManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pools(&self) -> &PoolManager {
        &self.pools
    }

    pub fn pools_mut(&mut self) -> &mut PoolManager {
        &mut self.pools
    }

    pub fn systems_mut(&mut self) -> &mut SystemManager {
        &mut self.systems
    }

    pub fn rules_mut(&mut self) -> &mut SpawnRuleSet {
        &mut self.rules
    }

    /// Create a pool from an archetype and offer it to every system for
    /// subscription. Spawn rules holding per-slot state get sized for it.
    pub fn create_pool(
        &mut self,
        archetype: &PoolArchetype,
        registry: &ComponentRegistry,
    ) -> SimResult<()> {
        let pool = self.pools.create_pool(archetype, registry)?;
        let (name, capacity) = (pool.name().to_string(), pool.capacity());
        self.systems.subscribe_pool(pool);
        self.rules.sync_spawner_capacity(&name, capacity);
        Ok(())
    }

    /// Delete a pool, removing it from every system group first.
    pub fn delete_pool(&mut self, name: &str) -> bool {
        self.systems.unsubscribe_pool(name);
        self.pools.delete_pool(name)
    }

    pub fn delete_all_pools(&mut self) {
        let names: Vec<String> = self.pools.pool_names().map(String::from).collect();
        for name in &names {
            self.systems.unsubscribe_pool(name);
        }
        self.pools.delete_all_pools();
    }

    /// Run one tick's worth of systems.
    pub fn update(&mut self, rng: &mut ChaCha8Rng, time: SimTime) -> SimResult<()> {
        let mut ctx = TickContext {
            pools: &mut self.pools,
            rules: &mut self.rules,
            rng,
            time,
        };
        self.systems.update(&mut ctx)
    }
}

/// Configuration for a new space.
pub struct SpaceConfig {
    /// RNG seed for determinism. Same seed, same scene, same simulation.
    pub seed: u64,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        SpaceConfig { seed: 42 }
    }
}

/// One self-contained simulation world.
pub struct Space {
    name: String,
    rng: ChaCha8Rng,
    time: SimTime,
    objects: ObjectManager,
}

impl Space {
    pub fn new(name: &str, config: SpaceConfig) -> Self {
        Space {
            name: name.to_string(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            time: SimTime::default(),
            objects: ObjectManager::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn objects(&self) -> &ObjectManager {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut ObjectManager {
        &mut self.objects
    }

    /// Advance the space by one tick.
    pub fn update(&mut self) -> SimResult<()> {
        self.objects.update(&mut self.rng, self.time)?;
        self.time.advance();
        Ok(())
    }

    /// Replace the current scene: delete every pool, then create one pool
    /// per named archetype.
    pub fn load_scene(
        &mut self,
        pool_archetypes: &[&str],
        archetypes: &ArchetypeManager,
        registry: &ComponentRegistry,
    ) -> SimResult<()> {
        self.clear_scene();
        for name in pool_archetypes {
            let archetype = archetypes
                .get(name)
                .ok_or_else(|| SimError::UnknownPoolArchetype(name.to_string()))?;
            self.objects.create_pool(archetype, registry)?;
        }
        Ok(())
    }

    /// Tear down the current scene, deleting all pools.
    pub fn clear_scene(&mut self) {
        self.objects.delete_all_pools();
    }
}

/// Owns every live space; updates them in insertion order.
#[derive(Default)]
pub struct SpaceManager {
    spaces: Vec<Space>,
}

impl SpaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a space. A name collision keeps the existing space.
    pub fn add_space(&mut self, space: Space) {
        if self.get_space(space.name()).is_some() {
            log::warn!("space `{}` already exists; keeping the first", space.name());
            return;
        }
        self.spaces.push(space);
    }

    pub fn get_space(&self, name: &str) -> Option<&Space> {
        self.spaces.iter().find(|space| space.name() == name)
    }

    pub fn get_space_mut(&mut self, name: &str) -> Option<&mut Space> {
        self.spaces.iter_mut().find(|space| space.name() == name)
    }

    pub fn remove_space(&mut self, name: &str) -> bool {
        let before = self.spaces.len();
        self.spaces.retain(|space| space.name() != name);
        self.spaces.len() != before
    }

    /// Tick every space, in insertion order.
    pub fn update(&mut self) -> SimResult<()> {
        for space in &mut self.spaces {
            space.update()?;
        }
        Ok(())
    }
}
