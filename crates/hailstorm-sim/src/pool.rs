//! Fixed-capacity object pools.
//!
//! A pool owns one component array per registered field group (length
//! exactly `capacity`), a set of shared components, and bookkeeping for
//! active and queued objects. Slots `[0, size)` are live; slots
//! `[size, size + queued)` are pending spawns awaiting activation. The
//! invariant `size + queued <= capacity` holds at all times.

use std::collections::{HashMap, HashSet};

use hailstorm_core::archetype::ObjectArchetype;
use hailstorm_core::components::Destructible;

use crate::component::{ColumnDyn, Component, ComponentArray, SharedComponent, SharedDyn};
use crate::error::{SimError, SimResult};

pub struct Pool {
    name: String,
    capacity: usize,
    size: usize,
    queued: usize,
    components: HashMap<String, Box<dyn ColumnDyn>>,
    shared: HashMap<String, Box<dyn SharedDyn>>,
    tags: HashSet<String>,
    spawn_archetypes: HashMap<String, ObjectArchetype>,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("size", &self.size)
            .field("queued", &self.queued)
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("shared", &self.shared.keys().collect::<Vec<_>>())
            .field("tags", &self.tags)
            .field(
                "spawn_archetypes",
                &self.spawn_archetypes.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Pool {
    pub(crate) fn new(name: &str, capacity: usize) -> Self {
        Pool {
            name: name.to_string(),
            capacity,
            size: 0,
            queued: 0,
            components: HashMap::new(),
            shared: HashMap::new(),
            tags: HashSet::new(),
            spawn_archetypes: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of active objects, in slots `[0, size)`.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of pending spawns, in slots `[size, size + queued)`.
    pub fn queued(&self) -> usize {
        self.queued
    }

    pub fn available_slots(&self) -> usize {
        self.capacity - self.size - self.queued
    }

    pub fn has_component_array(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn has_shared(&self, name: &str) -> bool {
        self.shared.contains_key(name)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Typed access to a component array. Asking for an array the pool does
    /// not carry is a configuration error surfaced immediately.
    pub fn component_array<T: Component>(&self, name: &str) -> SimResult<&ComponentArray<T>> {
        let column = self
            .components
            .get(name)
            .ok_or_else(|| SimError::MissingComponentArray {
                pool: self.name.clone(),
                component: name.to_string(),
            })?;
        column
            .as_any()
            .downcast_ref::<ComponentArray<T>>()
            .ok_or_else(|| SimError::ComponentTypeMismatch {
                pool: self.name.clone(),
                component: name.to_string(),
            })
    }

    pub fn component_array_mut<T: Component>(
        &mut self,
        name: &str,
    ) -> SimResult<&mut ComponentArray<T>> {
        let (pool, component) = (self.name.clone(), name.to_string());
        let column = self
            .components
            .get_mut(name)
            .ok_or(SimError::MissingComponentArray {
                pool: pool.clone(),
                component: component.clone(),
            })?;
        column
            .as_any_mut()
            .downcast_mut::<ComponentArray<T>>()
            .ok_or(SimError::ComponentTypeMismatch { pool, component })
    }

    pub fn shared<T: Component>(&self, name: &str) -> SimResult<&T> {
        let shared = self
            .shared
            .get(name)
            .ok_or_else(|| SimError::MissingSharedComponent {
                pool: self.name.clone(),
                component: name.to_string(),
            })?;
        shared
            .as_any()
            .downcast_ref::<SharedComponent<T>>()
            .map(|shared| shared.get())
            .ok_or_else(|| SimError::SharedTypeMismatch {
                pool: self.name.clone(),
                component: name.to_string(),
            })
    }

    pub fn shared_mut<T: Component>(&mut self, name: &str) -> SimResult<&mut T> {
        let (pool, component) = (self.name.clone(), name.to_string());
        let shared = self
            .shared
            .get_mut(name)
            .ok_or(SimError::MissingSharedComponent {
                pool: pool.clone(),
                component: component.clone(),
            })?;
        shared
            .as_any_mut()
            .downcast_mut::<SharedComponent<T>>()
            .map(|shared| shared.get_mut())
            .ok_or(SimError::SharedTypeMismatch { pool, component })
    }

    pub fn spawn_archetype(&self, name: &str) -> Option<&ObjectArchetype> {
        self.spawn_archetypes.get(name)
    }

    // ---- Construction (PoolManager only) ----

    pub(crate) fn insert_column(&mut self, name: &str, column: Box<dyn ColumnDyn>) {
        self.components.insert(name.to_string(), column);
    }

    pub(crate) fn insert_shared(&mut self, name: &str, shared: Box<dyn SharedDyn>) {
        self.shared.insert(name.to_string(), shared);
    }

    pub(crate) fn add_tag(&mut self, tag: &str) {
        self.tags.insert(tag.to_string());
    }

    pub(crate) fn add_spawn_archetype(&mut self, archetype: ObjectArchetype) {
        self.spawn_archetypes
            .insert(archetype.name.clone(), archetype);
    }

    // ---- Slot bookkeeping ----

    /// Copy an archetype's initial values into one slot. Components the
    /// archetype does not mention keep their current contents.
    pub(crate) fn copy_archetype_to_slot(
        &mut self,
        archetype: &ObjectArchetype,
        slot: usize,
    ) -> SimResult<()> {
        for (component, value) in archetype.components() {
            let column =
                self.components
                    .get_mut(component)
                    .ok_or_else(|| SimError::MissingComponentArray {
                        pool: self.name.clone(),
                        component: component.to_string(),
                    })?;
            if !column.load_value(value, slot) {
                return Err(SimError::ArchetypeValueMismatch {
                    pool: self.name.clone(),
                    component: component.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Shift the queued block up one slot so a direct creation can claim
    /// slot `size` without clobbering a pending spawn.
    pub(crate) fn make_room_at_size(&mut self) {
        if self.queued == 0 {
            return;
        }
        for column in self.components.values_mut() {
            for slot in (self.size..self.size + self.queued).rev() {
                column.clone_slot(slot, slot + 1);
            }
        }
    }

    pub(crate) fn grow_size(&mut self, count: usize) {
        self.size += count;
        debug_assert!(self.size + self.queued <= self.capacity);
    }

    pub(crate) fn grow_queued(&mut self, count: usize) {
        self.queued += count;
        debug_assert!(self.size + self.queued <= self.capacity);
    }

    /// Activate every queued object: `[size, size + queued)` becomes live.
    pub(crate) fn activate_queued(&mut self) {
        self.size += self.queued;
        self.queued = 0;
    }

    // ---- Column extraction (same-crate systems only) ----

    /// Temporarily remove a column so another column of the same pool can be
    /// borrowed mutably alongside it. Must be paired with `put_column`.
    pub(crate) fn take_column(&mut self, name: &str) -> SimResult<Box<dyn ColumnDyn>> {
        self.components
            .remove(name)
            .ok_or_else(|| SimError::MissingComponentArray {
                pool: self.name.clone(),
                component: name.to_string(),
            })
    }

    pub(crate) fn put_column(&mut self, name: &str, column: Box<dyn ColumnDyn>) {
        self.components.insert(name.to_string(), column);
    }

    // ---- Compaction ----

    /// Remove every object marked destroyed, packing survivors to the front
    /// of all component arrays while preserving their relative order.
    ///
    /// The destructible array is removed from the component map for the
    /// duration of the pass so every other array (and any per-slot spawn
    /// rule state, via `rule_state_hook`) compacts against the original
    /// destroyed flags; the destructible array itself is compacted last.
    /// Queued objects carry unset flags, so the pass also shifts the queued
    /// block down to stay adjacent to the live range.
    ///
    /// Returns the new active size.
    pub(crate) fn destroy_objects<F>(&mut self, rule_state_hook: F) -> SimResult<usize>
    where
        F: FnOnce(&[Destructible], usize, usize),
    {
        let mut destructible_column = self.take_column("Destructible")?;
        let result = self.destroy_objects_inner(&mut destructible_column, rule_state_hook);
        self.put_column("Destructible", destructible_column);
        result
    }

    fn destroy_objects_inner<F>(
        &mut self,
        destructible_column: &mut Box<dyn ColumnDyn>,
        rule_state_hook: F,
    ) -> SimResult<usize>
    where
        F: FnOnce(&[Destructible], usize, usize),
    {
        let destructible = destructible_column
            .as_any_mut()
            .downcast_mut::<ComponentArray<Destructible>>()
            .ok_or_else(|| SimError::ComponentTypeMismatch {
                pool: self.name.clone(),
                component: "Destructible".to_string(),
            })?;

        // Early out when nothing was destroyed this tick.
        let initial_alive_end = match (0..self.size).find(|&slot| destructible[slot].destroyed) {
            Some(slot) => slot,
            None => return Ok(self.size),
        };

        let end = self.size + self.queued;
        for column in self.components.values_mut() {
            column.handle_destructions(destructible, initial_alive_end, end);
        }
        rule_state_hook(&destructible.as_slice()[..end], initial_alive_end, end);

        let alive_end = destructible.compact_self(initial_alive_end, end);
        self.size = alive_end - self.queued;
        Ok(self.size)
    }
}
