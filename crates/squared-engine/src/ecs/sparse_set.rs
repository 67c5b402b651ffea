// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Type-homogeneous component storage.

use std::any::Any;

use super::Entity;

const EMPTY: u32 = u32::MAX;

/// Stores one `T` per entity in a packed array.
///
/// `sparse[entity.index()]` points into the dense `entities`/`values`
/// arrays, which gives O(1) lookup, insertion and swap-removal while keeping
/// iteration cache friendly.
#[derive(Debug)]
pub struct SparseSet<T> {
    sparse: Vec<u32>,
    entities: Vec<Entity>,
    values: Vec<T>,
}

impl<T> SparseSet<T> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            entities: Vec::new(),
            values: Vec::new(),
        }
    }

    fn dense_index(&self, entity: Entity) -> Option<usize> {
        let slot = *self.sparse.get(entity.index() as usize)?;
        if slot == EMPTY || self.entities[slot as usize] != entity {
            return None;
        }
        Some(slot as usize)
    }

    /// Returns `true` if `entity` (with this exact version) has a value.
    pub fn contains(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    /// Stores `value` for `entity`, handing back the value it replaces.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        if let Some(dense) = self.dense_index(entity) {
            return Some(std::mem::replace(&mut self.values[dense], value));
        }

        let index = entity.index() as usize;
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, EMPTY);
        }
        self.sparse[index] = self.entities.len() as u32;
        self.entities.push(entity);
        self.values.push(value);
        None
    }

    /// Removes and returns the value of `entity`.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let dense = self.dense_index(entity)?;
        let last = self.entities.len() - 1;
        if dense != last {
            let moved = self.entities[last];
            self.sparse[moved.index() as usize] = dense as u32;
        }
        self.sparse[entity.index() as usize] = EMPTY;
        self.entities.swap_remove(dense);
        Some(self.values.swap_remove(dense))
    }

    /// Returns the value of `entity`.
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.dense_index(entity).map(|dense| &self.values[dense])
    }

    /// Returns the value of `entity` mutably.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.dense_index(entity).map(|dense| &mut self.values[dense])
    }

    /// Returns the number of stored values.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The entities holding a value, in dense order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Iterates over `(entity, value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.values.iter())
    }

    /// Mutably iterates over `(entity, value)` pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entities.iter().copied().zip(self.values.iter_mut())
    }
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased access to a [`SparseSet`] used by the registry.
pub(crate) trait ComponentPool: Any {
    fn contains(&self, entity: Entity) -> bool;
    fn remove_entity(&mut self, entity: Entity) -> bool;
    fn entities(&self) -> &[Entity];
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> ComponentPool for SparseSet<T> {
    fn contains(&self, entity: Entity) -> bool {
        SparseSet::contains(self, entity)
    }

    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn entities(&self) -> &[Entity] {
        SparseSet::entities(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
