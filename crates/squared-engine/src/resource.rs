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

//! A type-keyed store of singleton values.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

use crate::error::ResourceError;

/// Holds at most one value per resource type.
///
/// The store lives inside the [`Registry`](crate::ecs::Registry) context so
/// that component hooks, which only receive the registry, can still reach
/// engine resources.
#[derive(Default)]
pub struct ResourceStore {
    resources: HashMap<TypeId, Box<dyn Any>>,
}

impl ResourceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resources: HashMap::new(),
        }
    }

    /// Adds `value`, failing if a `T` is already present.
    pub fn register<T: 'static>(&mut self, value: T) -> Result<&mut T, ResourceError> {
        if self.contains::<T>() {
            return Err(ResourceError::AlreadyRegistered(type_name::<T>()));
        }
        log::debug!("Registering resource `{}`.", type_name::<T>());
        self.set(value);
        self.get_mut::<T>()
    }

    /// Inserts `value`, handing back the `T` it replaces.
    pub fn set<T: 'static>(&mut self, value: T) -> Option<T> {
        self.resources
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|previous| previous.downcast::<T>().ok())
            .map(|previous| *previous)
    }

    /// Returns the `T`, or [`ResourceError::Missing`].
    pub fn get<T: 'static>(&self) -> Result<&T, ResourceError> {
        self.try_get::<T>()
            .ok_or(ResourceError::Missing(type_name::<T>()))
    }

    /// Returns the `T` mutably, or [`ResourceError::Missing`].
    pub fn get_mut<T: 'static>(&mut self) -> Result<&mut T, ResourceError> {
        self.try_get_mut::<T>()
            .ok_or(ResourceError::Missing(type_name::<T>()))
    }

    /// Returns the `T` if present.
    #[must_use]
    pub fn try_get<T: 'static>(&self) -> Option<&T> {
        self.resources
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    /// Returns the `T` mutably if present.
    pub fn try_get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.resources
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut::<T>())
    }

    /// Returns `true` if a `T` is present.
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.resources.contains_key(&TypeId::of::<T>())
    }

    /// Removes and returns the `T`.
    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        let removed = self
            .resources
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed);
        if removed.is_some() {
            log::debug!("Removed resource `{}`.", type_name::<T>());
        }
        removed
    }

    /// Returns the number of stored resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns `true` if no resources are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
