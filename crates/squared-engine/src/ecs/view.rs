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

//! Read-only iteration over entities holding a set of components.

use std::any::TypeId;
use std::marker::PhantomData;

use super::{Component, Entity, Registry};

/// A tuple of component types that can be matched against an entity.
///
/// Implemented for `(A,)` through `(A, B, C, D)`.
pub trait ComponentSet {
    /// What a matching entity yields, e.g. `(&'a Position, &'a Velocity)`.
    type Item<'a>;

    /// The `TypeId`s of the member components.
    fn type_ids() -> Vec<TypeId>;

    /// Fetches every member component of `entity`, or `None` if one is missing.
    fn fetch(registry: &Registry, entity: Entity) -> Option<Self::Item<'_>>;
}

macro_rules! impl_component_set {
    ($($C:ident),*) => {
        impl<$($C: Component),*> ComponentSet for ($($C,)*) {
            type Item<'a> = ($(&'a $C,)*);

            fn type_ids() -> Vec<TypeId> {
                vec![$(TypeId::of::<$C>()),*]
            }

            fn fetch(registry: &Registry, entity: Entity) -> Option<Self::Item<'_>> {
                Some(($(registry.try_get::<$C>(entity)?,)*))
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);

/// A lazy iterator over `(Entity, Q::Item)`.
///
/// It walks the smallest storage among the members of `Q` and skips entities
/// missing any other member.
pub struct View<'a, Q: ComponentSet> {
    registry: &'a Registry,
    driver: &'a [Entity],
    position: usize,
    _marker: PhantomData<Q>,
}

impl<'a, Q: ComponentSet> View<'a, Q> {
    pub(crate) fn new(registry: &'a Registry, driver: &'a [Entity]) -> Self {
        Self {
            registry,
            driver,
            position: 0,
            _marker: PhantomData,
        }
    }
}

impl<'a, Q: ComponentSet> Iterator for View<'a, Q> {
    type Item = (Entity, Q::Item<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&entity) = self.driver.get(self.position) {
            self.position += 1;
            if let Some(item) = Q::fetch(self.registry, entity) {
                return Some((entity, item));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.driver.len() - self.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Position(i32);
    impl Component for Position {}

    #[derive(Debug, PartialEq)]
    struct Velocity(i32);
    impl Component for Velocity {}

    struct Frozen;
    impl Component for Frozen {}

    #[test]
    fn view_yields_only_full_matches() {
        // --- 1. SETUP ---
        let mut registry = Registry::new();
        let moving = registry.create();
        let still = registry.create();
        let other = registry.create();
        registry.emplace(moving, Position(1)).unwrap();
        registry.emplace(moving, Velocity(2)).unwrap();
        registry.emplace(still, Position(3)).unwrap();
        registry.emplace(other, Velocity(4)).unwrap();

        // --- 2. ACTION ---
        let matches: Vec<(Entity, i32, i32)> = registry
            .view::<(Position, Velocity)>()
            .map(|(entity, (position, velocity))| (entity, position.0, velocity.0))
            .collect();

        // --- 3. ASSERT ---
        assert_eq!(matches, vec![(moving, 1, 2)]);
        assert_eq!(registry.view::<(Position,)>().count(), 2);
    }

    #[test]
    fn view_of_unknown_type_is_empty() {
        let mut registry = Registry::new();
        let entity = registry.create();
        registry.emplace(entity, Position(0)).unwrap();

        assert_eq!(registry.view::<(Position, Frozen)>().count(), 0);
    }

    #[test]
    fn mutation_through_collected_entities() {
        let mut registry = Registry::new();
        for x in 0..3 {
            let entity = registry.create();
            registry.emplace(entity, Position(x)).unwrap();
            registry.emplace(entity, Velocity(10)).unwrap();
        }

        for entity in registry.view_entities::<(Position, Velocity)>() {
            let dx = registry.get::<Velocity>(entity).0;
            registry.get_mut::<Position>(entity).0 += dx;
        }
        for (_, velocity) in registry.view_mut::<Velocity>() {
            velocity.0 = 0;
        }

        let mut xs: Vec<i32> = registry.view::<(Position,)>().map(|(_, (p,))| p.0).collect();
        xs.sort();
        assert_eq!(xs, vec![10, 11, 12]);
        assert!(registry.view::<(Velocity,)>().all(|(_, (v,))| v.0 == 0));
    }
}
