//! Archetype templates.
//!
//! A `PoolArchetype` describes a pool's shape (component arrays, shared
//! components, tags, capacity); an `ObjectArchetype` holds the initial value
//! for each component of a newly created object. Both are plain data the
//! runtime materializes into pools without compile-time knowledge of the
//! concrete component types. Copies are deep: a pool created from an
//! archetype never aliases it.
//!
//! Serialization of archetypes to a wire format is the job of an external
//! parser; this crate's contract is only the in-memory template.

use std::any::Any;
use std::collections::HashMap;

/// A type-erased, deep-clonable component value held by an archetype.
pub trait ComponentValue: Any + Send + Sync {
    fn clone_value(&self) -> Box<dyn ComponentValue>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Clone + Send + Sync> ComponentValue for T {
    fn clone_value(&self) -> Box<dyn ComponentValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Clone for Box<dyn ComponentValue> {
    fn clone(&self) -> Self {
        self.clone_value()
    }
}

/// Initial component values for one newly created object, keyed by component
/// array name.
#[derive(Clone, Default)]
pub struct ObjectArchetype {
    pub name: String,
    components: HashMap<String, Box<dyn ComponentValue>>,
}

impl ObjectArchetype {
    pub fn new(name: &str) -> Self {
        ObjectArchetype {
            name: name.to_string(),
            components: HashMap::new(),
        }
    }

    /// Builder-style: set the initial value for one component.
    pub fn with<T: Any + Clone + Send + Sync>(mut self, component: &str, value: T) -> Self {
        self.set(component, value);
        self
    }

    pub fn set<T: Any + Clone + Send + Sync>(&mut self, component: &str, value: T) {
        self.components.insert(component.to_string(), Box::new(value));
    }

    pub fn get(&self, component: &str) -> Option<&dyn ComponentValue> {
        self.components.get(component).map(|v| v.as_ref())
    }

    pub fn get_as<T: Any>(&self, component: &str) -> Option<&T> {
        self.get(component).and_then(|v| v.as_any().downcast_ref::<T>())
    }

    pub fn components(&self) -> impl Iterator<Item = (&str, &dyn ComponentValue)> {
        self.components.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

impl std::fmt::Debug for ObjectArchetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.components.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("ObjectArchetype")
            .field("name", &self.name)
            .field("components", &names)
            .finish()
    }
}

/// Serializable template describing a pool's shape.
///
/// Immutable once a pool has been created from it: pools deep-copy
/// everything they need at creation time.
#[derive(Clone, Default)]
pub struct PoolArchetype {
    pub name: String,
    pub capacity: usize,
    /// Component array names (shape only; arrays are default-initialized).
    pub component_arrays: Vec<String>,
    /// Initialized shared-component values, keyed by name.
    shared: HashMap<String, Box<dyn ComponentValue>>,
    pub tags: Vec<String>,
    /// Objects created live at pool creation, one capacity slot each.
    pub starting_objects: Vec<ObjectArchetype>,
    /// Object templates spawn rules reference later by name.
    pub spawn_archetypes: Vec<ObjectArchetype>,
}

impl PoolArchetype {
    pub fn new(name: &str, capacity: usize) -> Self {
        PoolArchetype {
            name: name.to_string(),
            capacity,
            ..Default::default()
        }
    }

    pub fn with_array(mut self, component: &str) -> Self {
        self.component_arrays.push(component.to_string());
        self
    }

    pub fn with_shared<T: Any + Clone + Send + Sync>(mut self, component: &str, value: T) -> Self {
        self.shared.insert(component.to_string(), Box::new(value));
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn with_starting_object(mut self, object: ObjectArchetype) -> Self {
        self.starting_objects.push(object);
        self
    }

    pub fn with_spawn_archetype(mut self, object: ObjectArchetype) -> Self {
        self.spawn_archetypes.push(object);
        self
    }

    pub fn shared_components(&self) -> impl Iterator<Item = (&str, &dyn ComponentValue)> {
        self.shared.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

impl std::fmt::Debug for PoolArchetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut shared: Vec<&str> = self.shared.keys().map(|s| s.as_str()).collect();
        shared.sort_unstable();
        f.debug_struct("PoolArchetype")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("component_arrays", &self.component_arrays)
            .field("shared", &shared)
            .field("tags", &self.tags)
            .finish()
    }
}
