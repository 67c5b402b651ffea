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

//! Entity and component storage with lifecycle hooks.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

use squared_core::{FunctionContainer, FunctionId};

use super::sparse_set::{ComponentPool, SparseSet};
use super::view::{ComponentSet, View};
use super::{Component, Entity};
use crate::error::EcsError;
use crate::resource::ResourceStore;

/// A component lifecycle observer. It receives the registry and the entity
/// whose component is being constructed or destroyed.
pub type Hook = Rc<dyn Fn(&mut Registry, Entity) -> anyhow::Result<()>>;

#[derive(Clone, Copy)]
enum HookKind {
    Construct,
    Destroy,
}

#[derive(Default)]
struct LifecycleHooks {
    on_construct: FunctionContainer<Hook>,
    on_destroy: FunctionContainer<Hook>,
}

impl LifecycleHooks {
    fn of_kind(&mut self, kind: HookKind) -> &mut FunctionContainer<Hook> {
        match kind {
            HookKind::Construct => &mut self.on_construct,
            HookKind::Destroy => &mut self.on_destroy,
        }
    }
}

/// Owns every entity and component.
///
/// Components live in one [`SparseSet`] per type. Construct hooks run after a
/// component becomes observable; destroy hooks run while it is still
/// attached. Hooks are cloned out of their container before they run, so a
/// hook may freely mutate the registry, including registering more hooks.
///
/// The registry also carries a context [`ResourceStore`] through which hooks
/// reach engine-wide resources.
#[derive(Default)]
pub struct Registry {
    slots: Vec<(Entity, bool)>,
    free: Vec<u32>,
    pools: Vec<(TypeId, Box<dyn ComponentPool>)>,
    pool_index: HashMap<TypeId, usize>,
    hooks: HashMap<TypeId, LifecycleHooks>,
    dying: Vec<Entity>,
    context: ResourceStore,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Entities ---

    /// Allocates a new entity, recycling a destroyed index when one is free.
    ///
    /// # Panics
    ///
    /// Panics if all 2^20 - 1 indices are alive at once.
    pub fn create(&mut self) -> Entity {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.1 = true;
            return slot.0;
        }

        let index = self.slots.len() as u32;
        assert!(index <= Entity::MAX_INDEX, "entity index space exhausted");
        let entity = Entity::new(index, 0);
        self.slots.push((entity, true));
        entity
    }

    /// Returns `true` if `entity` was created by this registry and not destroyed since.
    pub fn valid(&self, entity: Entity) -> bool {
        matches!(
            self.slots.get(entity.index() as usize),
            Some((current, true)) if *current == entity
        )
    }

    /// Returns the number of live entities.
    pub fn alive(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Iterates over the live entities in index order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots
            .iter()
            .filter(|(_, alive)| *alive)
            .map(|(entity, _)| *entity)
    }

    /// Destroys `entity` and every component attached to it.
    ///
    /// Destroy hooks fire once per attached component type before any
    /// component is erased, so every hook still sees the whole entity.
    /// Components a hook removes are skipped; components a hook attaches
    /// get their own destroy hooks. Destroying the entity again from one of
    /// its hooks is a no-op. If a hook fails, the remaining hooks still run,
    /// the entity is still destroyed, and the first error is returned.
    pub fn destroy(&mut self, entity: Entity) -> anyhow::Result<()> {
        if !self.valid(entity) {
            return Err(EcsError::InvalidEntity(entity).into());
        }
        if self.dying.contains(&entity) {
            log::trace!("{entity} is already being destroyed.");
            return Ok(());
        }
        self.dying.push(entity);

        let mut fired: Vec<TypeId> = Vec::new();
        let mut first_error = None;
        while let Some(type_id) = self.next_unfired(entity, &fired) {
            fired.push(type_id);
            if let Err(error) = self.fire(type_id, HookKind::Destroy, entity) {
                log::debug!("Destroy hook failed while destroying {entity}: {error:#}");
                first_error.get_or_insert(error);
            }
        }

        for (_, pool) in &mut self.pools {
            pool.remove_entity(entity);
        }
        self.dying.retain(|dying| *dying != entity);
        let index = entity.index();
        self.slots[index as usize] = (Entity::new(index, entity.next_version()), false);
        self.free.push(index);
        log::trace!("Destroyed {entity}.");

        first_error.map_or(Ok(()), Err)
    }

    /// The first component type still attached to `entity` whose destroy
    /// hooks have not fired yet.
    fn next_unfired(&self, entity: Entity, fired: &[TypeId]) -> Option<TypeId> {
        self.pools
            .iter()
            .map(|(type_id, _)| *type_id)
            .find(|type_id| {
                !fired.contains(type_id)
                    && self
                        .pool_by_id(*type_id)
                        .is_some_and(|pool| pool.contains(entity))
            })
    }

    /// Destroys every live entity, returning the first hook error.
    ///
    /// Entities already destroyed by another entity's hooks are skipped.
    pub fn clear(&mut self) -> anyhow::Result<()> {
        let live: Vec<Entity> = self.entities().collect();
        let mut first_error = None;
        for entity in live {
            if !self.valid(entity) {
                continue;
            }
            if let Err(error) = self.destroy(entity) {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // --- Components ---

    /// Attaches `value` to `entity` and returns it.
    ///
    /// If the entity already holds a `T`, destroy hooks fire for the old value
    /// before it is replaced. Construct hooks fire once the new value is
    /// observable. A failing hook aborts the call with its error.
    pub fn emplace<T: Component>(&mut self, entity: Entity, value: T) -> anyhow::Result<&mut T> {
        if !self.valid(entity) {
            return Err(EcsError::InvalidEntity(entity).into());
        }

        let type_id = TypeId::of::<T>();
        if self.has::<T>(entity) {
            self.fire(type_id, HookKind::Destroy, entity)?;
        }
        self.pool_mut::<T>().insert(entity, value);
        self.fire(type_id, HookKind::Construct, entity)?;

        self.try_get_mut::<T>(entity).ok_or_else(|| {
            EcsError::ComponentRemovedByHook {
                entity,
                component: type_name::<T>(),
            }
            .into()
        })
    }

    /// Detaches and returns the `T` of `entity`, firing destroy hooks first.
    ///
    /// Returns `Ok(None)` if the entity holds no `T`. If a hook fails, the
    /// component stays attached.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> anyhow::Result<Option<T>> {
        if !self.has::<T>(entity) {
            return Ok(None);
        }
        self.fire(TypeId::of::<T>(), HookKind::Destroy, entity)?;
        Ok(self.storage_mut::<T>().and_then(|pool| pool.remove(entity)))
    }

    /// Removes every `T` in the registry, firing destroy hooks for each.
    pub fn clear_component<T: Component>(&mut self) -> anyhow::Result<()> {
        let holders: Vec<Entity> = match self.storage::<T>() {
            Some(pool) => pool.entities().to_vec(),
            None => return Ok(()),
        };
        for entity in holders {
            self.remove::<T>(entity)?;
        }
        Ok(())
    }

    /// Returns the `T` of `entity`.
    ///
    /// # Panics
    ///
    /// Panics if the entity holds no `T`.
    pub fn get<T: Component>(&self, entity: Entity) -> &T {
        match self.try_get::<T>(entity) {
            Some(value) => value,
            None => panic!("{entity} has no `{}` component", type_name::<T>()),
        }
    }

    /// Returns the `T` of `entity` mutably.
    ///
    /// # Panics
    ///
    /// Panics if the entity holds no `T`.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        match self.try_get_mut::<T>(entity) {
            Some(value) => value,
            None => panic!("{entity} has no `{}` component", type_name::<T>()),
        }
    }

    /// Returns the `T` of `entity`, if any.
    pub fn try_get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage::<T>()?.get(entity)
    }

    /// Returns the `T` of `entity` mutably, if any.
    pub fn try_get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.storage_mut::<T>()?.get_mut(entity)
    }

    /// Returns `true` if `entity` holds a `T`.
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.storage::<T>()
            .is_some_and(|pool| pool.contains(entity))
    }

    /// Returns `true` if `entity` holds every component of the set `Q`.
    pub fn has_all<Q: ComponentSet>(&self, entity: Entity) -> bool {
        Q::type_ids()
            .iter()
            .all(|type_id| self.pool_by_id(*type_id).is_some_and(|pool| pool.contains(entity)))
    }

    /// Iterates over the entities holding every component of `Q`.
    ///
    /// The view borrows the registry; collect [`Registry::view_entities`]
    /// first when the loop body needs to mutate.
    pub fn view<Q: ComponentSet>(&self) -> View<'_, Q> {
        let driver = Q::type_ids()
            .iter()
            .map(|type_id| self.pool_by_id(*type_id).map(|pool| pool.entities()))
            .try_fold(None::<&[Entity]>, |smallest, entities| {
                let entities = entities?;
                Some(match smallest {
                    Some(current) if current.len() <= entities.len() => Some(current),
                    _ => Some(entities),
                })
            })
            .flatten()
            .unwrap_or(&[]);
        View::new(self, driver)
    }

    /// Collects the entities currently matching `Q`.
    pub fn view_entities<Q: ComponentSet>(&self) -> Vec<Entity> {
        self.view::<Q>().map(|(entity, _)| entity).collect()
    }

    /// Mutably iterates over every `T` and its entity.
    pub fn view_mut<T: Component>(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.storage_mut::<T>().into_iter().flat_map(|pool| pool.iter_mut())
    }

    /// Returns the storage of `T`, if any `T` was ever attached.
    pub fn storage<T: Component>(&self) -> Option<&SparseSet<T>> {
        self.pool_by_id(TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<SparseSet<T>>()
    }

    fn storage_mut<T: Component>(&mut self) -> Option<&mut SparseSet<T>> {
        let index = *self.pool_index.get(&TypeId::of::<T>())?;
        self.pools[index].1.as_any_mut().downcast_mut::<SparseSet<T>>()
    }

    fn pool_mut<T: Component>(&mut self) -> &mut SparseSet<T> {
        let type_id = TypeId::of::<T>();
        let index = match self.pool_index.get(&type_id) {
            Some(index) => *index,
            None => {
                self.pools.push((type_id, Box::new(SparseSet::<T>::new())));
                self.pool_index.insert(type_id, self.pools.len() - 1);
                self.pools.len() - 1
            }
        };
        match self.pools[index].1.as_any_mut().downcast_mut::<SparseSet<T>>() {
            Some(pool) => pool,
            None => unreachable!("pool registered under the TypeId of another type"),
        }
    }

    pub(crate) fn pool_by_id(&self, type_id: TypeId) -> Option<&dyn ComponentPool> {
        let index = *self.pool_index.get(&type_id)?;
        Some(self.pools[index].1.as_ref())
    }

    // --- Hooks ---

    /// Registers a hook fired after a `T` is attached to an entity.
    pub fn on_construct<T, F>(&mut self, hook: F) -> FunctionId
    where
        T: Component,
        F: Fn(&mut Registry, Entity) -> anyhow::Result<()> + 'static,
    {
        self.add_hook::<T, F>(HookKind::Construct, hook)
    }

    /// Registers a hook fired before a `T` is detached from an entity.
    pub fn on_destroy<T, F>(&mut self, hook: F) -> FunctionId
    where
        T: Component,
        F: Fn(&mut Registry, Entity) -> anyhow::Result<()> + 'static,
    {
        self.add_hook::<T, F>(HookKind::Destroy, hook)
    }

    /// Unregisters a construct hook of `T`. Returns `false` if it was unknown.
    pub fn remove_construct_hook<T: Component>(&mut self, id: FunctionId) -> bool {
        self.remove_hook::<T>(HookKind::Construct, id)
    }

    /// Unregisters a destroy hook of `T`. Returns `false` if it was unknown.
    pub fn remove_destroy_hook<T: Component>(&mut self, id: FunctionId) -> bool {
        self.remove_hook::<T>(HookKind::Destroy, id)
    }

    fn add_hook<T, F>(&mut self, kind: HookKind, hook: F) -> FunctionId
    where
        T: Component,
        F: Fn(&mut Registry, Entity) -> anyhow::Result<()> + 'static,
    {
        self.hooks
            .entry(TypeId::of::<T>())
            .or_default()
            .of_kind(kind)
            .add_function(FunctionId::of::<F>(), Rc::new(hook))
    }

    fn remove_hook<T: Component>(&mut self, kind: HookKind, id: FunctionId) -> bool {
        match self.hooks.get_mut(&TypeId::of::<T>()) {
            Some(hooks) => hooks.of_kind(kind).delete_function(id).is_some(),
            None => {
                log::warn!("No hooks registered for `{}`.", type_name::<T>());
                false
            }
        }
    }

    fn fire(&mut self, type_id: TypeId, kind: HookKind, entity: Entity) -> anyhow::Result<()> {
        let hooks = match self.hooks.get_mut(&type_id) {
            Some(hooks) => hooks.of_kind(kind).snapshot(),
            None => return Ok(()),
        };
        for (_, hook) in hooks {
            hook(self, entity)?;
        }
        Ok(())
    }

    // --- Context ---

    /// The resources reachable from hooks.
    pub fn ctx(&self) -> &ResourceStore {
        &self.context
    }

    /// The resources reachable from hooks, mutably.
    pub fn ctx_mut(&mut self) -> &mut ResourceStore {
        &mut self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, PartialEq)]
    struct Position(i32);
    impl Component for Position {}

    #[derive(Debug, PartialEq)]
    struct Velocity(i32);
    impl Component for Velocity {}

    #[derive(Default)]
    struct Journal(Vec<String>);

    fn journal(registry: &Registry) -> Vec<String> {
        registry.ctx().get::<Journal>().unwrap().0.clone()
    }

    #[test]
    fn test_create_and_destroy_recycles_with_new_version() {
        let mut registry = Registry::new();
        let first = registry.create();
        assert!(registry.valid(first));

        registry.destroy(first).unwrap();
        assert!(!registry.valid(first));

        let second = registry.create();
        assert_eq!(second.index(), first.index());
        assert_ne!(second, first);
        assert!(registry.valid(second));
        assert!(!registry.valid(Entity::NULL));
    }

    #[test]
    fn test_destroy_invalid_entity_fails() {
        let mut registry = Registry::new();
        let entity = registry.create();
        registry.destroy(entity).unwrap();

        let error = registry.destroy(entity).unwrap_err();
        assert_eq!(
            error.downcast_ref::<EcsError>(),
            Some(&EcsError::InvalidEntity(entity))
        );
    }

    #[test]
    fn test_emplace_get_and_remove() {
        let mut registry = Registry::new();
        let entity = registry.create();

        registry.emplace(entity, Position(1)).unwrap().0 += 1;
        assert_eq!(registry.get::<Position>(entity), &Position(2));
        assert!(registry.has::<Position>(entity));
        assert!(registry.try_get::<Velocity>(entity).is_none());

        assert_eq!(registry.remove::<Position>(entity).unwrap(), Some(Position(2)));
        assert!(!registry.has::<Position>(entity));
        assert_eq!(registry.remove::<Position>(entity).unwrap(), None);
    }

    #[test]
    #[should_panic(expected = "has no")]
    fn test_get_missing_component_panics() {
        let mut registry = Registry::new();
        let entity = registry.create();
        registry.get::<Position>(entity);
    }

    #[test]
    fn test_has_all_matches_try_get() {
        let mut registry = Registry::new();
        let both = registry.create();
        let one = registry.create();
        registry.emplace(both, Position(0)).unwrap();
        registry.emplace(both, Velocity(0)).unwrap();
        registry.emplace(one, Position(0)).unwrap();

        assert!(registry.has_all::<(Position, Velocity)>(both));
        assert!(!registry.has_all::<(Position, Velocity)>(one));
        assert!(registry.has_all::<(Position,)>(one));
    }

    #[test]
    fn test_hooks_observe_component() {
        // --- 1. SETUP ---
        let mut registry = Registry::new();
        registry.ctx_mut().register(Journal::default()).unwrap();
        registry.on_construct::<Position, _>(|registry, entity| {
            let x = registry.get::<Position>(entity).0;
            registry.ctx_mut().get_mut::<Journal>()?.0.push(format!("construct {x}"));
            Ok(())
        });
        registry.on_destroy::<Position, _>(|registry, entity| {
            let x = registry.get::<Position>(entity).0;
            registry.ctx_mut().get_mut::<Journal>()?.0.push(format!("destroy {x}"));
            Ok(())
        });

        // --- 2. ACTION ---
        let entity = registry.create();
        registry.emplace(entity, Position(1)).unwrap();
        registry.emplace(entity, Position(2)).unwrap();
        registry.destroy(entity).unwrap();

        // --- 3. ASSERT ---
        assert_eq!(
            journal(&registry),
            vec!["construct 1", "destroy 1", "construct 2", "destroy 2"]
        );
    }

    #[test]
    fn test_removed_hook_is_not_called() {
        let mut registry = Registry::new();
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let id = registry.on_construct::<Position, _>(move |_, _| {
            *counter.borrow_mut() += 1;
            Ok(())
        });

        let entity = registry.create();
        registry.emplace(entity, Position(0)).unwrap();
        assert!(registry.remove_construct_hook::<Position>(id));
        assert!(!registry.remove_construct_hook::<Position>(id));
        registry.emplace(entity, Position(1)).unwrap();

        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_hook_may_mutate_registry() {
        let mut registry = Registry::new();
        registry.on_construct::<Position, _>(|registry, entity| {
            registry.emplace(entity, Velocity(7))?;
            Ok(())
        });

        let entity = registry.create();
        registry.emplace(entity, Position(0)).unwrap();
        assert_eq!(registry.get::<Velocity>(entity), &Velocity(7));
    }

    #[test]
    fn test_hook_removing_its_component_is_reported() {
        let mut registry = Registry::new();
        registry.on_construct::<Position, _>(|registry, entity| {
            registry.remove::<Position>(entity)?;
            Ok(())
        });

        let entity = registry.create();
        let error = registry.emplace(entity, Position(0)).err().unwrap();
        assert!(matches!(
            error.downcast_ref::<EcsError>(),
            Some(EcsError::ComponentRemovedByHook { .. })
        ));
    }

    #[test]
    fn test_failing_destroy_hook_still_destroys() {
        let mut registry = Registry::new();
        registry.on_destroy::<Position, _>(|_, _| anyhow::bail!("native body missing"));

        let entity = registry.create();
        registry.emplace(entity, Position(0)).unwrap();
        assert!(registry.destroy(entity).is_err());
        assert!(!registry.valid(entity));
        assert_eq!(registry.storage::<Position>().map(|pool| pool.len()), Some(0));
    }

    #[test]
    fn test_failing_remove_hook_keeps_component() {
        let mut registry = Registry::new();
        registry.on_destroy::<Position, _>(|_, _| anyhow::bail!("refused"));

        let entity = registry.create();
        registry.emplace(entity, Position(3)).unwrap();
        assert!(registry.remove::<Position>(entity).is_err());
        assert!(registry.has::<Position>(entity));
    }

    #[test]
    fn test_clear_component_and_clear() {
        let mut registry = Registry::new();
        let a = registry.create();
        let b = registry.create();
        registry.emplace(a, Position(0)).unwrap();
        registry.emplace(b, Position(1)).unwrap();
        registry.emplace(b, Velocity(1)).unwrap();

        registry.clear_component::<Position>().unwrap();
        assert!(!registry.has::<Position>(a));
        assert!(!registry.has::<Position>(b));
        assert!(registry.has::<Velocity>(b));

        registry.clear().unwrap();
        assert_eq!(registry.alive(), 0);
        assert!(!registry.valid(a));
    }

    fn journaled_registry() -> Registry {
        let mut registry = Registry::new();
        registry.ctx_mut().register(Journal::default()).unwrap();
        registry.on_destroy::<Velocity, _>(|registry, entity| {
            let v = registry.get::<Velocity>(entity).0;
            registry.ctx_mut().get_mut::<Journal>()?.0.push(format!("destroy velocity {v}"));
            Ok(())
        });
        registry
    }

    #[test]
    fn test_destroy_skips_components_removed_by_earlier_hooks() {
        // --- 1. SETUP ---
        let mut registry = journaled_registry();
        registry.on_destroy::<Position, _>(|registry, entity| {
            registry.remove::<Velocity>(entity)?;
            Ok(())
        });
        let entity = registry.create();
        registry.emplace(entity, Position(0)).unwrap();
        registry.emplace(entity, Velocity(4)).unwrap();

        // --- 2. ACTION ---
        registry.destroy(entity).unwrap();

        // --- 3. ASSERT ---
        assert_eq!(journal(&registry), vec!["destroy velocity 4"]);
        assert!(!registry.valid(entity));
    }

    #[test]
    fn test_destroy_fires_hooks_of_components_added_by_hooks() {
        let mut registry = journaled_registry();
        registry.on_destroy::<Position, _>(|registry, entity| {
            registry.emplace(entity, Velocity(9))?;
            Ok(())
        });
        let entity = registry.create();
        registry.emplace(entity, Position(0)).unwrap();

        registry.destroy(entity).unwrap();

        assert_eq!(journal(&registry), vec!["destroy velocity 9"]);
        assert_eq!(registry.storage::<Velocity>().map(|pool| pool.len()), Some(0));
    }

    #[test]
    fn test_hook_destroying_its_own_entity_is_a_no_op() {
        let mut registry = journaled_registry();
        registry.on_destroy::<Position, _>(|registry, entity| registry.destroy(entity));
        let entity = registry.create();
        registry.emplace(entity, Position(0)).unwrap();
        registry.emplace(entity, Velocity(1)).unwrap();

        registry.destroy(entity).unwrap();

        assert!(!registry.valid(entity));
        assert_eq!(journal(&registry), vec!["destroy velocity 1"]);
        assert_eq!(registry.alive(), 0);
    }

    #[test]
    fn test_clear_skips_entities_destroyed_by_cascading_hooks() {
        struct Children(Vec<Entity>);
        impl Component for Children {}

        let mut registry = Registry::new();
        registry.on_destroy::<Children, _>(|registry, entity| {
            let children = registry.get::<Children>(entity).0.clone();
            for child in children {
                registry.destroy(child)?;
            }
            Ok(())
        });
        let parent = registry.create();
        let child = registry.create();
        registry.emplace(parent, Children(vec![child])).unwrap();

        registry.clear().unwrap();

        assert_eq!(registry.alive(), 0);
        assert!(!registry.valid(child));
    }
}
