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

use std::collections::HashSet;
use std::fmt;

use super::FunctionId;

/// An ordered collection of callables sharing one signature.
///
/// `F` is the stored handle, typically a boxed or reference-counted trait
/// object such as `Box<dyn FnMut(&mut Core) -> anyhow::Result<()>>`.
/// Iteration follows insertion order and every [`FunctionId`] appears at most
/// once. Structural mistakes (adding a duplicate, deleting an unknown ID) are
/// logged as warnings and otherwise ignored.
pub struct FunctionContainer<F> {
    functions: Vec<(FunctionId, F)>,
    ids: HashSet<FunctionId>,
}

impl<F> FunctionContainer<F> {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Appends `function` under `id`.
    ///
    /// If a function with the same ID is already stored, the new one is
    /// dropped, a warning is logged and the existing ID is returned.
    pub fn add_function(&mut self, id: FunctionId, function: F) -> FunctionId {
        if !self.ids.insert(id) {
            log::warn!("Function {id} already exists in the container, ignoring the new one.");
            return id;
        }
        self.functions.push((id, function));
        id
    }

    /// Appends every `(id, function)` pair in order.
    pub fn add_functions(&mut self, functions: impl IntoIterator<Item = (FunctionId, F)>) {
        for (id, function) in functions {
            self.add_function(id, function);
        }
    }

    /// Removes the function stored under `id` and hands it back.
    ///
    /// Returns `None` and logs a warning if no such function exists.
    pub fn delete_function(&mut self, id: FunctionId) -> Option<F> {
        if !self.ids.remove(&id) {
            log::warn!("Function {id} not found in the container.");
            return None;
        }
        let position = self.functions.iter().position(|(stored, _)| *stored == id)?;
        Some(self.functions.remove(position).1)
    }

    /// Returns `true` if a function with `id` is stored.
    pub fn contains(&self, id: FunctionId) -> bool {
        self.ids.contains(&id)
    }

    /// Returns the stored function for `id`, if any.
    pub fn get(&self, id: FunctionId) -> Option<&F> {
        self.functions
            .iter()
            .find(|(stored, _)| *stored == id)
            .map(|(_, function)| function)
    }

    /// Returns the number of stored functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Iterates over the stored IDs in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = FunctionId> + '_ {
        self.functions.iter().map(|(id, _)| *id)
    }

    /// Iterates over the stored functions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (FunctionId, &F)> {
        self.functions.iter().map(|(id, function)| (*id, function))
    }

    /// Mutably iterates over the stored functions in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (FunctionId, &mut F)> {
        self.functions.iter_mut().map(|(id, function)| (*id, function))
    }

    /// Moves every function of `other` to the back of this container.
    pub fn append(&mut self, other: FunctionContainer<F>) {
        self.add_functions(other.functions);
    }
}

impl<F: Clone> FunctionContainer<F> {
    /// Clones the stored handles, in order, into a detached list.
    ///
    /// Used to invoke reference-counted callbacks without keeping the
    /// container borrowed.
    pub fn snapshot(&self) -> Vec<(FunctionId, F)> {
        self.functions.clone()
    }
}

impl<F> Default for FunctionContainer<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> fmt::Debug for FunctionContainer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}
