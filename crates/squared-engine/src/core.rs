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

//! The application-facing facade.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

use squared_core::logging::{self, LogHandle, LoggingError};
use squared_core::FunctionId;

use crate::config::CoreConfig;
use crate::ecs::{Component, ComponentSet, Entity, Registry};
use crate::error::{PluginError, ResourceError, SchedulerError};
use crate::plugin::{Plugin, PluginSet};
use crate::resource::ResourceStore;
use crate::scheduler::{
    FixedTimeUpdate, RelativeTimeUpdate, Scheduler, SchedulerDag, SchedulerErrorPolicy,
    SchedulerKey, Shutdown, Startup, System, SystemSet, Update,
};
use crate::time::{update_time, Time};

type TemporaryCleanup = fn(&mut Registry) -> anyhow::Result<()>;

/// Owns the registry, the resources, the schedulers and the plugins.
///
/// A new core holds a [`Time`] resource and the five built-in schedulers,
/// ordered `Startup -> Update -> {FixedTimeUpdate, RelativeTimeUpdate} ->
/// Shutdown`. [`Core::run_systems`] walks them once; [`Core::run_core`] keeps
/// walking until [`Core::stop`] is called.
///
/// ```
/// use squared_engine::Core;
///
/// struct Frames(u32);
///
/// let mut core = Core::new();
/// core.register_resource(Frames(0)).unwrap();
/// core.register_system(|core: &mut Core| {
///     let frames = core.get_resource_mut::<Frames>()?;
///     frames.0 += 1;
///     if frames.0 == 3 {
///         core.stop();
///     }
///     Ok(())
/// })
/// .unwrap();
///
/// core.run_core().unwrap();
/// assert_eq!(core.get_resource::<Frames>().unwrap().0, 3);
/// ```
pub struct Core {
    registry: Registry,
    schedulers: SchedulerDag,
    default_scheduler: SchedulerKey,
    plugins: HashMap<TypeId, Option<Box<dyn Any>>>,
    temporary_components: Vec<(TypeId, TemporaryCleanup)>,
    running: bool,
    stop_requested: bool,
    log_handle: Option<LogHandle>,
}

impl Core {
    /// Creates a core with the default configuration.
    pub fn new() -> Self {
        Self::build(&CoreConfig::default(), None)
    }

    /// Creates a core from `config`, installing the global logger if the
    /// configuration asks for it.
    ///
    /// Fails only if the log pattern is invalid. If another logger is
    /// already installed, a warning is logged and the core keeps going
    /// without a log handle.
    pub fn with_config(config: CoreConfig) -> Result<Self, LoggingError> {
        let log_handle = match &config.log {
            Some(log_config) => match logging::init(log_config) {
                Ok(handle) => Some(handle),
                Err(LoggingError::AlreadyInitialized(_)) => {
                    log::warn!("A logger is already installed, keeping it.");
                    None
                }
                Err(error) => return Err(error),
            },
            None => None,
        };
        Ok(Self::build(&config, log_handle))
    }

    fn build(config: &CoreConfig, log_handle: Option<LogHandle>) -> Self {
        let mut registry = Registry::new();
        registry.ctx_mut().set(Time::new());

        let mut schedulers = SchedulerDag::new();
        let startup = schedulers.insert(Startup::new());
        let update = schedulers.insert(Update::new());
        schedulers.insert(FixedTimeUpdate::new(config.fixed_tick_rate));
        schedulers.insert(RelativeTimeUpdate::new(config.relative_tick_rate));
        schedulers.insert(Shutdown::new());

        let startup_key = SchedulerKey::of::<Startup>();
        let update_key = SchedulerKey::of::<Update>();
        let shutdown_key = SchedulerKey::of::<Shutdown>();
        for timed in [
            SchedulerKey::of::<FixedTimeUpdate>(),
            SchedulerKey::of::<RelativeTimeUpdate>(),
        ] {
            schedulers.add_edge(startup_key, timed);
            schedulers.add_edge(update_key, timed);
            schedulers.add_edge(timed, shutdown_key);
        }
        schedulers.add_edge(startup_key, update_key);
        schedulers.add_edge(update_key, shutdown_key);
        schedulers.set_error_policy_for_all(config.error_policy);

        let time_system = FunctionId::of_val(&update_time);
        startup.base().add_system(time_system, Box::new(update_time));
        update.base().add_system(time_system, Box::new(update_time));

        log::debug!("Core created.");
        Self {
            registry,
            schedulers,
            default_scheduler: update_key,
            plugins: HashMap::new(),
            temporary_components: Vec::new(),
            running: false,
            stop_requested: false,
            log_handle,
        }
    }

    // --- Lifecycle ---

    /// Walks the schedulers once, then deletes the schedulers that asked to
    /// be removed during the walk.
    ///
    /// A scheduler that clears its "run next scheduler" flag ends the walk.
    /// Errors returned by a scheduler (a fatal engine error, or any error
    /// under [`SchedulerErrorPolicy::Nothing`]) end the walk and are returned
    /// once the deletions are processed.
    pub fn run_systems(&mut self) -> anyhow::Result<()> {
        let schedulers = self.schedulers.sorted()?;
        let result = self.walk(&schedulers);
        self.schedulers.sweep();
        result
    }

    fn walk(&mut self, schedulers: &[Rc<dyn Scheduler>]) -> anyhow::Result<()> {
        for scheduler in schedulers {
            let base = scheduler.base();
            base.reset_flags();
            scheduler.run_systems(self)?;
            if !base.should_run_next_scheduler() {
                log::debug!("Scheduler `{}` ended the tick early.", base.name());
                break;
            }
        }
        Ok(())
    }

    /// Runs ticks until [`Core::stop`] is called.
    ///
    /// The tick during which `stop` is called completes, and [`Shutdown`]
    /// fires at its end. If a tick fails, the core stops running and the
    /// error is returned.
    pub fn run_core(&mut self) -> anyhow::Result<()> {
        log::info!("Core running.");
        self.running = true;
        self.stop_requested = false;
        while self.running {
            if let Err(error) = self.run_systems() {
                self.running = false;
                log::error!("Core stopped on error: {error:#}");
                return Err(error);
            }
        }
        log::info!("Core stopped.");
        Ok(())
    }

    /// Asks [`Core::run_core`] to return after the current tick.
    pub fn stop(&mut self) {
        self.running = false;
        self.stop_requested = true;
    }

    /// Returns `true` while [`Core::run_core`] is looping.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Returns `true` once [`Core::stop`] has been called.
    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Replaces the log line pattern of the logger this core installed.
    pub fn set_log_pattern(&self, pattern: &str) -> Result<(), LoggingError> {
        match &self.log_handle {
            Some(handle) => handle.set_pattern(pattern),
            None => {
                log::warn!("The logger was not installed by this core, ignoring pattern '{pattern}'.");
                Ok(())
            }
        }
    }

    // --- Systems ---

    /// Adds `system` to the default scheduler ([`Update`] unless changed).
    pub fn register_system<F>(&mut self, system: F) -> Result<FunctionId, SchedulerError>
    where
        F: FnMut(&mut Core) -> anyhow::Result<()> + 'static,
    {
        let id = FunctionId::of::<F>();
        self.add_system_to(self.default_scheduler, id, Box::new(system))
    }

    /// Adds `system` to scheduler `S`.
    pub fn register_system_in<S, F>(&mut self, system: F) -> Result<FunctionId, SchedulerError>
    where
        S: Scheduler,
        F: FnMut(&mut Core) -> anyhow::Result<()> + 'static,
    {
        let id = FunctionId::of::<F>();
        self.add_system_to(SchedulerKey::of::<S>(), id, Box::new(system))
    }

    /// Adds every system of the tuple to the default scheduler, in order.
    pub fn register_systems<T: SystemSet>(&mut self, systems: T) -> Result<Vec<FunctionId>, SchedulerError> {
        let key = self.default_scheduler;
        self.add_systems_to(key, systems)
    }

    /// Adds every system of the tuple to scheduler `S`, in order.
    pub fn register_systems_in<S: Scheduler, T: SystemSet>(
        &mut self,
        systems: T,
    ) -> Result<Vec<FunctionId>, SchedulerError> {
        self.add_systems_to(SchedulerKey::of::<S>(), systems)
    }

    /// Adds `system` to the default scheduler. When it fails, `handler` sees
    /// the error first and the error then goes on to the scheduler's error
    /// policy.
    ///
    /// The system keeps its own [`FunctionId`].
    pub fn register_system_with_error_handler<F, H>(
        &mut self,
        system: F,
        handler: H,
    ) -> Result<FunctionId, SchedulerError>
    where
        F: FnMut(&mut Core) -> anyhow::Result<()> + 'static,
        H: FnMut(&mut Core, &anyhow::Error) + 'static,
    {
        let key = self.default_scheduler;
        self.add_system_with_handler(key, system, handler)
    }

    /// Like [`Core::register_system_with_error_handler`], targeting `S`.
    pub fn register_system_with_error_handler_in<S, F, H>(
        &mut self,
        system: F,
        handler: H,
    ) -> Result<FunctionId, SchedulerError>
    where
        S: Scheduler,
        F: FnMut(&mut Core) -> anyhow::Result<()> + 'static,
        H: FnMut(&mut Core, &anyhow::Error) + 'static,
    {
        self.add_system_with_handler(SchedulerKey::of::<S>(), system, handler)
    }

    fn add_system_with_handler<F, H>(
        &mut self,
        key: SchedulerKey,
        mut system: F,
        mut handler: H,
    ) -> Result<FunctionId, SchedulerError>
    where
        F: FnMut(&mut Core) -> anyhow::Result<()> + 'static,
        H: FnMut(&mut Core, &anyhow::Error) + 'static,
    {
        let id = FunctionId::of::<F>();
        let wrapped = move |core: &mut Core| -> anyhow::Result<()> {
            system(core).inspect_err(|error| handler(core, error))
        };
        self.add_system_to(key, id, Box::new(wrapped))
    }

    fn add_system_to(&mut self, key: SchedulerKey, id: FunctionId, system: System) -> Result<FunctionId, SchedulerError> {
        let scheduler = self.schedulers.get_dyn(key)?;
        Ok(scheduler.base().add_system(id, system))
    }

    fn add_systems_to<T: SystemSet>(&mut self, key: SchedulerKey, systems: T) -> Result<Vec<FunctionId>, SchedulerError> {
        let scheduler = self.schedulers.get_dyn(key)?;
        Ok(systems
            .into_systems()
            .into_iter()
            .map(|(id, system)| scheduler.base().add_system(id, system))
            .collect())
    }

    /// Makes `S` the target of [`Core::register_system`].
    pub fn set_default_scheduler<S: Scheduler>(&mut self) {
        let key = SchedulerKey::of::<S>();
        if !self.schedulers.contains(key) {
            log::warn!("Cannot make unregistered scheduler `{}` the default.", key.name());
            return;
        }
        self.default_scheduler = key;
    }

    // --- Schedulers ---

    /// Registers a scheduler instance. Its systems start running on the next tick.
    pub fn register_scheduler<S: Scheduler>(&mut self, scheduler: S) -> Result<&S, SchedulerError> {
        self.schedulers.register(scheduler)?;
        self.schedulers.get::<S>()
    }

    /// Returns the scheduler of type `S`.
    pub fn get_scheduler<S: Scheduler>(&self) -> Result<&S, SchedulerError> {
        self.schedulers.get::<S>()
    }

    /// Returns a shared handle to the scheduler of type `S`, usable while the
    /// core is borrowed mutably.
    pub fn shared_scheduler<S: Scheduler>(&self) -> Result<Rc<S>, SchedulerError> {
        self.schedulers.get_shared::<S>()
    }

    /// Returns `true` if a scheduler of type `S` is registered.
    pub fn has_scheduler<S: Scheduler>(&self) -> bool {
        self.schedulers.contains(SchedulerKey::of::<S>())
    }

    /// Removes scheduler `S` at the end of the current (or next) tick.
    pub fn delete_scheduler<S: Scheduler>(&mut self) -> Result<(), SchedulerError> {
        self.schedulers.stage_delete(SchedulerKey::of::<S>())
    }

    /// Requires `A` to run before `B`.
    pub fn set_scheduler_before<A: Scheduler, B: Scheduler>(&mut self) -> Result<(), SchedulerError> {
        self.schedulers
            .set_before(SchedulerKey::of::<A>(), SchedulerKey::of::<B>())
    }

    /// Requires `A` to run after `B`.
    pub fn set_scheduler_after<A: Scheduler, B: Scheduler>(&mut self) -> Result<(), SchedulerError> {
        self.schedulers
            .set_after(SchedulerKey::of::<A>(), SchedulerKey::of::<B>())
    }

    /// Drops the requirement that `A` runs before `B`.
    pub fn remove_dependency_before<A: Scheduler, B: Scheduler>(&mut self) -> bool {
        self.schedulers
            .remove_dependency_before(SchedulerKey::of::<A>(), SchedulerKey::of::<B>())
    }

    /// Drops the requirement that `A` runs after `B`.
    pub fn remove_dependency_after<A: Scheduler, B: Scheduler>(&mut self) -> bool {
        self.schedulers
            .remove_dependency_after(SchedulerKey::of::<A>(), SchedulerKey::of::<B>())
    }

    /// Sets the error policy of every registered scheduler.
    pub fn set_error_policy_for_all(&self, policy: SchedulerErrorPolicy) {
        self.schedulers.set_error_policy_for_all(policy);
    }

    /// The scheduler graph.
    pub fn schedulers(&self) -> &SchedulerDag {
        &self.schedulers
    }

    // --- Resources ---

    /// Adds a resource, failing if one of the same type exists.
    pub fn register_resource<T: 'static>(&mut self, resource: T) -> Result<&mut T, ResourceError> {
        self.registry.ctx_mut().register(resource)
    }

    /// Returns the `T` resource.
    pub fn get_resource<T: 'static>(&self) -> Result<&T, ResourceError> {
        self.registry.ctx().get::<T>()
    }

    /// Returns the `T` resource mutably.
    pub fn get_resource_mut<T: 'static>(&mut self) -> Result<&mut T, ResourceError> {
        self.registry.ctx_mut().get_mut::<T>()
    }

    /// Returns the `T` resource if present.
    pub fn try_get_resource<T: 'static>(&self) -> Option<&T> {
        self.registry.ctx().try_get::<T>()
    }

    /// Returns the `T` resource mutably if present.
    pub fn try_get_resource_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.registry.ctx_mut().try_get_mut::<T>()
    }

    /// Returns `true` if a `T` resource exists.
    pub fn has_resource<T: 'static>(&self) -> bool {
        self.registry.ctx().contains::<T>()
    }

    /// Removes and returns the `T` resource.
    pub fn delete_resource<T: 'static>(&mut self) -> Option<T> {
        self.registry.ctx_mut().remove::<T>()
    }

    /// All resources.
    pub fn resources(&self) -> &ResourceStore {
        self.registry.ctx()
    }

    // --- Entities ---

    /// The entity and component storage.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The entity and component storage, mutably.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Creates an entity with no components.
    pub fn create_entity(&mut self) -> Entity {
        self.registry.create()
    }

    /// Destroys `entity`, firing destroy hooks for its components.
    pub fn kill_entity(&mut self, entity: Entity) -> anyhow::Result<()> {
        self.registry.destroy(entity)
    }

    /// Destroys every entity.
    pub fn clear_entities(&mut self) -> anyhow::Result<()> {
        self.registry.clear()
    }

    /// Returns `true` if `entity` is alive.
    pub fn is_entity_valid(&self, entity: Entity) -> bool {
        self.registry.valid(entity)
    }

    /// Attaches `component` to `entity`, replacing any existing `T`.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> anyhow::Result<&mut T> {
        self.registry.emplace(entity, component)
    }

    /// Attaches `component` unless `entity` already holds a `T`, and returns
    /// the `T` it ends up with.
    pub fn add_component_if_missing<T: Component>(
        &mut self,
        entity: Entity,
        component: T,
    ) -> anyhow::Result<&mut T> {
        if self.registry.has::<T>(entity) {
            return Ok(self.registry.get_mut::<T>(entity));
        }
        self.registry.emplace(entity, component)
    }

    /// Attaches a component that [`remove_temporary_components`] clears.
    pub fn add_temporary_component<T: Component>(
        &mut self,
        entity: Entity,
        component: T,
    ) -> anyhow::Result<&mut T> {
        let type_id = TypeId::of::<T>();
        if !self.temporary_components.iter().any(|(id, _)| *id == type_id) {
            let cleanup: TemporaryCleanup = Registry::clear_component::<T>;
            self.temporary_components.push((type_id, cleanup));
        }
        self.registry.emplace(entity, component)
    }

    /// Detaches and returns the `T` of `entity`.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> anyhow::Result<Option<T>> {
        self.registry.remove::<T>(entity)
    }

    /// Returns `true` if `entity` holds every component of `Q`.
    pub fn has_components<Q: ComponentSet>(&self, entity: Entity) -> bool {
        self.registry.has_all::<Q>(entity)
    }

    /// Returns the `T` of `entity`.
    ///
    /// # Panics
    ///
    /// Panics if the entity holds no `T`.
    pub fn get_component<T: Component>(&self, entity: Entity) -> &T {
        self.registry.get::<T>(entity)
    }

    /// Returns the `T` of `entity` mutably.
    ///
    /// # Panics
    ///
    /// Panics if the entity holds no `T`.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        self.registry.get_mut::<T>(entity)
    }

    /// Returns the `T` of `entity`, if any.
    pub fn try_get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.registry.try_get::<T>(entity)
    }

    /// Returns the `T` of `entity` mutably, if any.
    pub fn try_get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.registry.try_get_mut::<T>(entity)
    }

    // --- Plugins ---

    /// Adds every plugin of the tuple, constructing each with `Default`.
    pub fn add_plugins<P: PluginSet>(&mut self) -> Result<(), PluginError> {
        P::add_to(self)
    }

    /// Adds the plugins a plugin depends on. Meant to be called from
    /// [`Plugin::bind`].
    pub fn require_plugins<P: PluginSet>(&mut self) -> Result<(), PluginError> {
        P::add_to(self)
    }

    /// Adds and binds `plugin`, unless a plugin of the same type exists.
    ///
    /// If `bind` fails the plugin is forgotten, but whatever it registered
    /// before failing stays registered.
    pub fn add_plugin<P: Plugin>(&mut self, mut plugin: P) -> Result<(), PluginError> {
        let type_id = TypeId::of::<P>();
        if self.plugins.contains_key(&type_id) {
            log::debug!("Plugin `{}` already added, skipping.", type_name::<P>());
            return Ok(());
        }

        self.plugins.insert(type_id, None);
        log::info!("Binding plugin `{}`.", type_name::<P>());
        if let Err(error) = plugin.bind(self) {
            self.plugins.remove(&type_id);
            return Err(PluginError::Bind {
                plugin: type_name::<P>(),
                source: error.into(),
            });
        }
        self.plugins.insert(type_id, Some(Box::new(plugin)));
        Ok(())
    }

    /// Returns `true` if a plugin of type `P` was added.
    pub fn has_plugin<P: Plugin>(&self) -> bool {
        self.plugins.contains_key(&TypeId::of::<P>())
    }

    /// Returns the plugin of type `P` once it has finished binding.
    pub fn get_plugin<P: Plugin>(&self) -> Option<&P> {
        self.plugins
            .get(&TypeId::of::<P>())?
            .as_ref()?
            .downcast_ref::<P>()
    }
}

impl Default for Core {
    fn default() -> Self {
        Self::new()
    }
}

/// System removing every component added with
/// [`Core::add_temporary_component`] since it last ran.
pub fn remove_temporary_components(core: &mut Core) -> anyhow::Result<()> {
    let cleanups = std::mem::take(&mut core.temporary_components);
    let mut first_error = None;
    for (_, cleanup) in cleanups {
        if let Err(error) = cleanup(&mut core.registry) {
            first_error.get_or_insert(error);
        }
    }
    first_error.map_or(Ok(()), Err)
}
