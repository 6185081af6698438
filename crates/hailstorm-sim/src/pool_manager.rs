//! Pool and archetype collections.
//!
//! `PoolManager` owns every live pool, keyed by name; `ArchetypeManager`
//! owns the registered pool archetypes. Lookup failures are configuration
//! errors surfaced as `None`/`Err` for callers to check.

use std::collections::HashMap;

use hailstorm_core::archetype::PoolArchetype;

use crate::error::{SimError, SimResult};
use crate::pool::Pool;
use crate::registry::ComponentRegistry;
use crate::systems::creation;

#[derive(Default)]
pub struct PoolManager {
    pools: HashMap<String, Pool>,
}

impl PoolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize a pool from an archetype: allocate each named component
    /// array (default-initialized), deep-copy each shared component, copy
    /// the spawn archetypes, then create one live object per starting
    /// object. Capacity is fixed for the pool's life.
    pub fn create_pool(
        &mut self,
        archetype: &PoolArchetype,
        registry: &ComponentRegistry,
    ) -> SimResult<&mut Pool> {
        if self.pools.contains_key(&archetype.name) {
            return Err(SimError::DuplicatePool(archetype.name.clone()));
        }

        let mut pool = Pool::new(&archetype.name, archetype.capacity);

        for component in &archetype.component_arrays {
            let column = registry
                .allocate_array(component, archetype.capacity)
                .ok_or_else(|| SimError::UnregisteredComponentArray(component.clone()))?;
            pool.insert_column(component, column);
        }

        for (component, value) in archetype.shared_components() {
            let mut shared = registry
                .allocate_shared(component)
                .ok_or_else(|| SimError::UnregisteredSharedComponent(component.to_string()))?;
            if !shared.assign_value(value) {
                return Err(SimError::ArchetypeValueMismatch {
                    pool: archetype.name.clone(),
                    component: component.to_string(),
                });
            }
            pool.insert_shared(component, shared);
        }

        for tag in &archetype.tags {
            pool.add_tag(tag);
        }

        for spawn_archetype in &archetype.spawn_archetypes {
            pool.add_spawn_archetype(spawn_archetype.clone());
        }

        // Starting objects go live immediately, one capacity slot each; no
        // queuing at pool creation.
        for object in &archetype.starting_objects {
            creation::create_object(&mut pool, object)?;
        }

        Ok(self
            .pools
            .entry(archetype.name.clone())
            .or_insert(pool))
    }

    pub fn get_pool(&self, name: &str) -> Option<&Pool> {
        self.pools.get(name)
    }

    pub fn get_pool_mut(&mut self, name: &str) -> Option<&mut Pool> {
        self.pools.get_mut(name)
    }

    /// Delete a pool and everything it owns. Returns false if no such pool
    /// exists.
    pub fn delete_pool(&mut self, name: &str) -> bool {
        self.pools.remove(name).is_some()
    }

    pub fn delete_all_pools(&mut self) {
        self.pools.clear();
    }

    pub fn pool_names(&self) -> impl Iterator<Item = &str> {
        self.pools.keys().map(|name| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Temporarily remove a pool from the manager (for spawn batches and
    /// pairwise interactions that need a second pool borrowed alongside).
    /// Must be paired with `put_pool`.
    pub(crate) fn take_pool(&mut self, name: &str) -> Option<Pool> {
        self.pools.remove(name)
    }

    pub(crate) fn put_pool(&mut self, pool: Pool) {
        self.pools.insert(pool.name().to_string(), pool);
    }

    /// Run `f` with two distinct pools borrowed mutably. Returns `None` when
    /// either pool is missing or both names refer to the same pool.
    pub fn with_pool_pair_mut<R>(
        &mut self,
        first: &str,
        second: &str,
        f: impl FnOnce(&mut Pool, &mut Pool) -> R,
    ) -> Option<R> {
        if first == second {
            return None;
        }
        let mut taken = self.take_pool(first)?;
        let result = self.pools.get_mut(second).map(|other| f(&mut taken, other));
        self.put_pool(taken);
        result
    }
}

#[derive(Default)]
pub struct ArchetypeManager {
    archetypes: HashMap<String, PoolArchetype>,
}

impl ArchetypeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pool archetype. First registration wins.
    pub fn register(&mut self, archetype: PoolArchetype) {
        if self.archetypes.contains_key(&archetype.name) {
            log::warn!(
                "pool archetype `{}` registered twice; keeping first registration",
                archetype.name
            );
            return;
        }
        self.archetypes.insert(archetype.name.clone(), archetype);
    }

    pub fn get(&self, name: &str) -> Option<&PoolArchetype> {
        self.archetypes.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.archetypes.keys().map(|name| name.as_str())
    }
}
