//! Columnar component storage.
//!
//! A `ComponentArray<T>` is a densely packed array with exactly one element
//! per object slot in its pool; its length always equals the pool's
//! capacity. A `SharedComponent<T>` is a single instance owned by the whole
//! pool. Pools hold both behind object-safe traits so archetypes (pure data)
//! can materialize storage without compile-time knowledge of the concrete
//! component types.

use std::any::Any;
use std::ops::{Index, IndexMut};

use hailstorm_core::archetype::ComponentValue;
use hailstorm_core::components::Destructible;

/// Anything storable in a component array or shared component.
pub trait Component: Clone + Default + Send + Sync + 'static {}

impl<T: Clone + Default + Send + Sync + 'static> Component for T {}

/// Densely packed storage for one field group, one element per object slot.
#[derive(Debug)]
pub struct ComponentArray<T> {
    data: Vec<T>,
}

impl<T: Component> ComponentArray<T> {
    pub fn new(capacity: usize) -> Self {
        ComponentArray {
            data: vec![T::default(); capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: Component> Index<usize> for ComponentArray<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

impl<T: Component> IndexMut<usize> for ComponentArray<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.data[index]
    }
}

impl ComponentArray<Destructible> {
    /// Compact this array against its own destroyed flags. Runs last, after
    /// every other array in the pool has been compacted against the original
    /// flag contents.
    pub(crate) fn compact_self(&mut self, initial_alive_end: usize, end: usize) -> usize {
        let mut alive_end = initial_alive_end;
        for next_alive in initial_alive_end..end {
            if !self.data[next_alive].destroyed {
                self.data[alive_end] = self.data[next_alive];
                alive_end += 1;
            }
        }
        alive_end
    }
}

/// Object-safe view of a component array, used by pools and archetype
/// materialization.
pub trait ColumnDyn: Send + Sync {
    fn capacity(&self) -> usize;

    /// Clone the element at `source` into `destination`.
    fn clone_slot(&mut self, source: usize, destination: usize);

    /// Copy an archetype value into `destination`. Returns false when the
    /// value's type does not match the array's element type.
    fn load_value(&mut self, value: &dyn ComponentValue, destination: usize) -> bool;

    /// Stable in-place partition: pack elements whose slot is still alive
    /// (per `destroyed`) toward the front, preserving relative order.
    /// `initial_alive_end` is the first destroyed slot; everything before it
    /// is already in place. Returns the new alive end.
    fn handle_destructions(
        &mut self,
        destroyed: &ComponentArray<Destructible>,
        initial_alive_end: usize,
        end: usize,
    ) -> usize;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ColumnDyn for ComponentArray<T> {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn clone_slot(&mut self, source: usize, destination: usize) {
        if source != destination {
            let value = self.data[source].clone();
            self.data[destination] = value;
        }
    }

    fn load_value(&mut self, value: &dyn ComponentValue, destination: usize) -> bool {
        match value.as_any().downcast_ref::<T>() {
            Some(value) => {
                self.data[destination] = value.clone();
                true
            }
            None => false,
        }
    }

    fn handle_destructions(
        &mut self,
        destroyed: &ComponentArray<Destructible>,
        initial_alive_end: usize,
        end: usize,
    ) -> usize {
        let mut alive_end = initial_alive_end;
        for next_alive in initial_alive_end..end {
            if !destroyed[next_alive].destroyed {
                self.clone_slot(next_alive, alive_end);
                alive_end += 1;
            }
        }
        alive_end
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// One field-group instance shared by every object in a pool.
pub struct SharedComponent<T> {
    value: T,
}

impl<T: Component> SharedComponent<T> {
    pub fn new(value: T) -> Self {
        SharedComponent { value }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

/// Object-safe view of a shared component.
pub trait SharedDyn: Send + Sync {
    /// Overwrite the value from an archetype's initializer. Returns false
    /// when the initializer's type does not match.
    fn assign_value(&mut self, value: &dyn ComponentValue) -> bool;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> SharedDyn for SharedComponent<T> {
    fn assign_value(&mut self, value: &dyn ComponentValue) -> bool {
        match value.as_any().downcast_ref::<T>() {
            Some(value) => {
                self.value = value.clone();
                true
            }
            None => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
