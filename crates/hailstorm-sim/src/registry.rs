//! Name-to-factory registry for component storage.
//!
//! Archetypes are pure data; this registry is how a pool materializes a
//! component array or shared component from a string name. It is an explicit
//! object constructed once at startup and passed by reference, not
//! process-wide static state, so initialization order stays deterministic
//! and tests can build isolated registries.
//!
//! First registration wins for every name; later registrations are ignored.
//! Registration must happen before any archetype referencing the name is
//! materialized. There is no unregistration.

use std::collections::{HashMap, HashSet};

use hailstorm_core::components::{
    BoundaryBox, ColorTint, Destructible, HandleIndex, Lifetime, Position, Rotation, Scale,
    SpawnTimer, Spawner, Sprite, TexCoords, Velocity,
};

use crate::component::{ColumnDyn, Component, ComponentArray, SharedComponent, SharedDyn};
use crate::handle::HandleDirectory;

type ColumnFactory = Box<dyn Fn(usize) -> Box<dyn ColumnDyn> + Send + Sync>;
type SharedFactory = Box<dyn Fn() -> Box<dyn SharedDyn> + Send + Sync>;

#[derive(Default)]
pub struct ComponentRegistry {
    arrays: HashMap<String, ColumnFactory>,
    shared: HashMap<String, SharedFactory>,
    tags: HashSet<String>,

    // Sorted name lists for deterministic enumeration (editor/tooling),
    // rebuilt lazily when a registration dirties them.
    sorted_array_names: Vec<String>,
    arrays_dirty: bool,
    sorted_shared_names: Vec<String>,
    shared_dirty: bool,
    sorted_tag_names: Vec<String>,
    tags_dirty: bool,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the engine's standard component set.
    pub fn with_engine_components() -> Self {
        let mut registry = Self::new();
        registry.register_engine_components();
        registry
    }

    pub fn register_array<T: Component>(&mut self, name: &str) {
        if self.arrays.contains_key(name) {
            log::warn!("component array `{name}` registered twice; keeping first registration");
            return;
        }
        self.arrays.insert(
            name.to_string(),
            Box::new(|capacity| Box::new(ComponentArray::<T>::new(capacity)) as Box<dyn ColumnDyn>),
        );
        self.arrays_dirty = true;
    }

    pub fn register_shared<T: Component>(&mut self, name: &str) {
        if self.shared.contains_key(name) {
            log::warn!("shared component `{name}` registered twice; keeping first registration");
            return;
        }
        self.shared.insert(
            name.to_string(),
            Box::new(|| Box::new(SharedComponent::<T>::new(T::default())) as Box<dyn SharedDyn>),
        );
        self.shared_dirty = true;
    }

    /// Register a tag name. Collisions are silently ignored.
    pub fn register_tag(&mut self, name: &str) {
        if self.tags.insert(name.to_string()) {
            self.tags_dirty = true;
        }
    }

    /// Allocate a default-initialized component array, or `None` if the name
    /// was never registered. Callers must check.
    pub fn allocate_array(&self, name: &str, capacity: usize) -> Option<Box<dyn ColumnDyn>> {
        self.arrays.get(name).map(|factory| factory(capacity))
    }

    /// Allocate a default-initialized shared component, or `None` if the
    /// name was never registered. Callers must check.
    pub fn allocate_shared(&self, name: &str) -> Option<Box<dyn SharedDyn>> {
        self.shared.get(name).map(|factory| factory())
    }

    pub fn is_tag_registered(&self, name: &str) -> bool {
        self.tags.contains(name)
    }

    pub fn array_names(&mut self) -> &[String] {
        if self.arrays_dirty {
            self.sorted_array_names = self.arrays.keys().cloned().collect();
            self.sorted_array_names.sort_unstable();
            self.arrays_dirty = false;
        }
        &self.sorted_array_names
    }

    pub fn shared_names(&mut self) -> &[String] {
        if self.shared_dirty {
            self.sorted_shared_names = self.shared.keys().cloned().collect();
            self.sorted_shared_names.sort_unstable();
            self.shared_dirty = false;
        }
        &self.sorted_shared_names
    }

    pub fn tag_names(&mut self) -> &[String] {
        if self.tags_dirty {
            self.sorted_tag_names = self.tags.iter().cloned().collect();
            self.sorted_tag_names.sort_unstable();
            self.tags_dirty = false;
        }
        &self.sorted_tag_names
    }

    /// Register the component arrays, shared components, and tags the
    /// engine's own systems know about.
    pub fn register_engine_components(&mut self) {
        self.register_array::<Position>("Position");
        self.register_array::<Velocity>("Velocity");
        self.register_array::<Rotation>("Rotation");
        self.register_array::<Scale>("Scale");
        self.register_array::<TexCoords>("TexCoords");
        self.register_array::<ColorTint>("ColorTint");
        self.register_array::<Lifetime>("Lifetime");
        self.register_array::<Destructible>("Destructible");
        self.register_array::<SpawnTimer>("SpawnTimer");
        self.register_array::<HandleIndex>("HandleIndex");

        self.register_shared::<Sprite>("Sprite");
        self.register_shared::<BoundaryBox>("BoundaryBox");
        self.register_shared::<Spawner>("Spawner");
        self.register_shared::<HandleDirectory>("HandleDirectory");

        self.register_tag("Player");
        self.register_tag("Enemy");
        self.register_tag("Bullet");
    }
}
