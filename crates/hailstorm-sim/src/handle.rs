//! Stable object handles.
//!
//! A handle is a `(id, pool_index)` pair: the id is unique for the pool's
//! lifetime and the pool index tracks the object's current slot across
//! compaction. The directory recycles freed entries through a free list;
//! a freed entry keeps the `DEAD_OBJECT_ID` sentinel so stale external
//! references can detect that their object is gone.

use serde::{Deserialize, Serialize};

use hailstorm_core::constants::DEAD_OBJECT_ID;

/// Stable reference to one pool object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handle {
    /// Monotonically increasing per pool; `DEAD_OBJECT_ID` once freed.
    pub id: u64,
    /// The object's current slot, resynced after every compaction.
    pub pool_index: usize,
}

/// Shared component holding every handle issued by a pool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandleDirectory {
    handles: Vec<Handle>,
    free_indices: Vec<usize>,
    next_id: u64,
}

impl HandleDirectory {
    /// Issue a handle for the object at `pool_index`, recycling a freed
    /// directory entry when one is available. Returns the handle's index in
    /// the directory.
    pub fn create_handle(&mut self, pool_index: usize) -> usize {
        let id = self.next_id;
        self.next_id += 1;

        let handle = Handle { id, pool_index };
        match self.free_indices.pop() {
            Some(index) => {
                self.handles[index] = handle;
                index
            }
            None => {
                self.handles.push(handle);
                self.handles.len() - 1
            }
        }
    }

    /// Mark a handle dead and make its directory entry reusable.
    pub fn free_handle(&mut self, handle_index: usize) {
        if let Some(handle) = self.handles.get_mut(handle_index) {
            if handle.id != DEAD_OBJECT_ID {
                handle.id = DEAD_OBJECT_ID;
                self.free_indices.push(handle_index);
            }
        }
    }

    pub fn get(&self, handle_index: usize) -> Option<&Handle> {
        self.handles.get(handle_index)
    }

    /// Point a handle at its object's new slot (after compaction).
    pub fn set_pool_index(&mut self, handle_index: usize, pool_index: usize) {
        if let Some(handle) = self.handles.get_mut(handle_index) {
            handle.pool_index = pool_index;
        }
    }

    /// True when the handle at `handle_index` still refers to a live object
    /// with the given id.
    pub fn is_alive(&self, handle_index: usize, id: u64) -> bool {
        id != DEAD_OBJECT_ID
            && self
                .handles
                .get(handle_index)
                .is_some_and(|handle| handle.id == id)
    }

    pub fn free_indices(&self) -> &[usize] {
        &self.free_indices
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
