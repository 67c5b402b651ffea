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

//! Typed events with immediate or scheduler-bound delivery.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use squared_core::{EventBus, FunctionContainer, FunctionId};

use crate::core::Core;
use crate::scheduler::{Scheduler, SchedulerKey};

type ImmediateCallback = Arc<dyn Fn(&dyn Any) + Send + Sync>;
type PendingEvent = (TypeId, Box<dyn Any + Send>);

/// A callback run by [`process_events`] on the main thread.
pub type ScheduledCallback<E> = Rc<dyn Fn(&mut Core, &E) -> anyhow::Result<()>>;

#[derive(Default)]
struct Routes {
    immediate: HashMap<TypeId, FunctionContainer<ImmediateCallback>>,
    scheduled: HashMap<TypeId, Vec<(SchedulerKey, flume::Sender<PendingEvent>)>>,
}

/// The part of the manager reachable from any thread.
#[derive(Default)]
struct Shared {
    routes: Mutex<Routes>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Routes> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push<E: Any + Send + Clone>(&self, event: E) {
        let type_id = TypeId::of::<E>();
        let (callbacks, targets) = {
            let routes = self.lock();
            let callbacks: Vec<ImmediateCallback> = routes
                .immediate
                .get(&type_id)
                .map(|container| container.iter().map(|(_, callback)| callback.clone()).collect())
                .unwrap_or_default();
            let targets: Vec<(SchedulerKey, flume::Sender<PendingEvent>)> =
                routes.scheduled.get(&type_id).cloned().unwrap_or_default();
            (callbacks, targets)
        };

        for callback in callbacks {
            callback(&event);
        }
        for (key, sender) in targets {
            if sender.send((type_id, Box::new(event.clone()))).is_err() {
                log::error!(
                    "Event queue of scheduler `{}` is closed, dropping `{}`.",
                    key.name(),
                    type_name::<E>()
                );
            }
        }
    }
}

trait ErasedCallbacks {
    fn dispatch(&self, core: &mut Core, event: &dyn Any) -> anyhow::Result<()>;
    fn as_any(&self) -> &dyn Any;
}

struct ScheduledCallbacks<E> {
    callbacks: RefCell<FunctionContainer<ScheduledCallback<E>>>,
}

impl<E> Default for ScheduledCallbacks<E> {
    fn default() -> Self {
        Self {
            callbacks: RefCell::default(),
        }
    }
}

impl<E: 'static> ErasedCallbacks for ScheduledCallbacks<E> {
    fn dispatch(&self, core: &mut Core, event: &dyn Any) -> anyhow::Result<()> {
        let Some(event) = event.downcast_ref::<E>() else {
            return Ok(());
        };
        let callbacks = self.callbacks.borrow().snapshot();
        let mut first_error = None;
        for (_, callback) in callbacks {
            if let Err(error) = callback(core, event) {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Delivers typed events to typed callbacks.
///
/// Immediate callbacks run inside [`EventManager::push_event`] on the
/// pushing thread. Scheduler-bound callbacks run when the
/// [`process_events`] system of their scheduler drains its queue, in push
/// order. Worker threads push through an [`EventSender`].
///
/// The manager lives in the core as a resource, see
/// [`EventPlugin`](super::EventPlugin).
#[derive(Default)]
pub struct EventManager {
    shared: Arc<Shared>,
    queues: HashMap<SchedulerKey, EventBus<PendingEvent>>,
    scheduled: HashMap<SchedulerKey, HashMap<TypeId, Rc<dyn ErasedCallbacks>>>,
}

impl EventManager {
    /// Creates a manager with no callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback invoked synchronously for every pushed `E`.
    ///
    /// It may run on whichever thread pushes the event.
    pub fn register_callback<E, F>(&mut self, callback: F) -> FunctionId
    where
        E: Any + Send,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = FunctionId::of::<F>();
        let erased: ImmediateCallback = Arc::new(move |event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<E>() {
                callback(event);
            }
        });
        self.shared
            .lock()
            .immediate
            .entry(TypeId::of::<E>())
            .or_default()
            .add_function(id, erased)
    }

    /// Unregisters an immediate callback of `E`.
    pub fn unregister_callback<E: Any>(&mut self, id: FunctionId) -> bool {
        let mut routes = self.shared.lock();
        let Some(container) = routes.immediate.get_mut(&TypeId::of::<E>()) else {
            log::warn!("No callbacks registered for event `{}`.", type_name::<E>());
            return false;
        };
        let removed = container.delete_function(id).is_some();
        if container.is_empty() {
            routes.immediate.remove(&TypeId::of::<E>());
        }
        removed
    }

    /// Registers a callback run by `process_events::<S>` for every `E`
    /// pushed since the previous drain.
    pub fn register_scheduled_callback<E, S, F>(&mut self, callback: F) -> FunctionId
    where
        E: Any + Send,
        S: Scheduler,
        F: Fn(&mut Core, &E) -> anyhow::Result<()> + 'static,
    {
        let key = SchedulerKey::of::<S>();
        let type_id = TypeId::of::<E>();
        let entry = self
            .scheduled
            .entry(key)
            .or_default()
            .entry(type_id)
            .or_insert_with(|| Rc::new(ScheduledCallbacks::<E>::default()));
        let Some(callbacks) = entry.as_any().downcast_ref::<ScheduledCallbacks<E>>() else {
            unreachable!("callbacks stored under the TypeId of another event");
        };
        let id = callbacks
            .callbacks
            .borrow_mut()
            .add_function(FunctionId::of::<F>(), Rc::new(callback));

        let sender = self.queues.entry(key).or_default().sender();
        let mut routes = self.shared.lock();
        let targets = routes.scheduled.entry(type_id).or_default();
        if !targets.iter().any(|(target, _)| *target == key) {
            targets.push((key, sender));
        }
        id
    }

    /// Unregisters a scheduler-bound callback of `E` on `S`.
    ///
    /// Once the last callback of `E` on `S` is gone, `E` is no longer queued
    /// for `S`.
    pub fn unregister_scheduled_callback<E: Any, S: Scheduler>(&mut self, id: FunctionId) -> bool {
        let key = SchedulerKey::of::<S>();
        let type_id = TypeId::of::<E>();
        let Some(callbacks) = self
            .scheduled
            .get(&key)
            .and_then(|by_type| by_type.get(&type_id))
            .and_then(|entry| entry.as_any().downcast_ref::<ScheduledCallbacks<E>>())
        else {
            log::warn!(
                "No callbacks registered for event `{}` on scheduler `{}`.",
                type_name::<E>(),
                key.name()
            );
            return false;
        };

        let (removed, now_empty) = {
            let mut container = callbacks.callbacks.borrow_mut();
            (container.delete_function(id).is_some(), container.is_empty())
        };
        if now_empty {
            if let Some(by_type) = self.scheduled.get_mut(&key) {
                by_type.remove(&type_id);
            }
            let mut routes = self.shared.lock();
            if let Some(targets) = routes.scheduled.get_mut(&type_id) {
                targets.retain(|(target, _)| *target != key);
                if targets.is_empty() {
                    routes.scheduled.remove(&type_id);
                }
            }
        }
        removed
    }

    /// Delivers `event` to the immediate callbacks of `E` and queues a copy
    /// for every scheduler with callbacks for `E`.
    pub fn push_event<E: Any + Send + Clone>(&self, event: E) {
        self.shared.push(event);
    }

    /// A handle for pushing events from other threads.
    pub fn sender(&self) -> EventSender {
        EventSender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Number of events waiting for `S`.
    pub fn pending<S: Scheduler>(&self) -> usize {
        self.queues
            .get(&SchedulerKey::of::<S>())
            .map_or(0, EventBus::len)
    }

    fn take_pending(&self, key: SchedulerKey) -> (Vec<PendingEvent>, HashMap<TypeId, Rc<dyn ErasedCallbacks>>) {
        let events = self.queues.get(&key).map(EventBus::drain).unwrap_or_default();
        let handlers = self.scheduled.get(&key).cloned().unwrap_or_default();
        (events, handlers)
    }
}

/// A cloneable, thread-safe handle that pushes events into an
/// [`EventManager`].
#[derive(Clone)]
pub struct EventSender {
    shared: Arc<Shared>,
}

impl EventSender {
    /// Same as [`EventManager::push_event`].
    pub fn push_event<E: Any + Send + Clone>(&self, event: E) {
        self.shared.push(event);
    }
}

/// System delivering the events queued for scheduler `S`.
///
/// Callbacks that fail do not stop the drain; the first error is returned
/// once every event has been delivered. Does nothing if no
/// [`EventManager`] resource exists.
pub fn process_events<S: Scheduler>(core: &mut Core) -> anyhow::Result<()> {
    let Some(manager) = core.try_get_resource::<EventManager>() else {
        return Ok(());
    };
    let (events, handlers) = manager.take_pending(SchedulerKey::of::<S>());

    let mut first_error = None;
    for (type_id, event) in events {
        let Some(handler) = handlers.get(&type_id) else {
            continue;
        };
        if let Err(error) = handler.dispatch(core, &*event) {
            first_error.get_or_insert(error);
        }
    }
    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{FixedTimeUpdate, Update};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);

    #[derive(Debug, Clone)]
    struct Pong;

    #[derive(Default)]
    struct Seen(Vec<u32>);

    fn counting(counter: Arc<AtomicU32>) -> impl Fn(&Ping) + Send + Sync {
        move |ping: &Ping| {
            counter.fetch_add(ping.0, Ordering::SeqCst);
        }
    }

    fn record(core: &mut Core, ping: &Ping) -> anyhow::Result<()> {
        core.get_resource_mut::<Seen>()?.0.push(ping.0);
        Ok(())
    }

    fn core_with_manager() -> Core {
        let mut core = Core::new();
        core.register_resource(EventManager::new()).unwrap();
        core.register_resource(Seen::default()).unwrap();
        core
    }

    #[test]
    fn immediate_callback_sees_event_before_push_returns() {
        let mut manager = EventManager::new();
        let counter = Arc::new(AtomicU32::new(0));
        let id = manager.register_callback::<Ping, _>(counting(counter.clone()));

        manager.push_event(Ping(42));
        assert_eq!(counter.load(Ordering::SeqCst), 42);

        assert!(manager.unregister_callback::<Ping>(id));
        manager.push_event(Ping(42));
        assert_eq!(counter.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn register_unregister_register_counts_once() {
        let mut manager = EventManager::new();
        let counter = Arc::new(AtomicU32::new(0));

        let first = manager.register_callback::<Ping, _>(counting(counter.clone()));
        manager.unregister_callback::<Ping>(first);
        let second = manager.register_callback::<Ping, _>(counting(counter.clone()));
        assert_eq!(first, second);
        // Same callable type again: rejected as a duplicate.
        manager.register_callback::<Ping, _>(counting(counter.clone()));

        manager.push_event(Ping(1));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn scheduled_callbacks_wait_for_their_scheduler() {
        // --- 1. SETUP ---
        let mut core = core_with_manager();
        core.get_resource_mut::<EventManager>()
            .unwrap()
            .register_scheduled_callback::<Ping, Update, _>(record);

        // --- 2. ACTION ---
        let manager = core.get_resource::<EventManager>().unwrap();
        manager.push_event(Ping(1));
        manager.push_event(Pong);
        manager.push_event(Ping(2));
        assert_eq!(manager.pending::<Update>(), 2);
        assert!(core.get_resource::<Seen>().unwrap().0.is_empty());

        process_events::<FixedTimeUpdate>(&mut core).unwrap();
        assert!(core.get_resource::<Seen>().unwrap().0.is_empty());
        process_events::<Update>(&mut core).unwrap();

        // --- 3. ASSERT ---
        assert_eq!(core.get_resource::<Seen>().unwrap().0, vec![1, 2]);
        assert_eq!(core.get_resource::<EventManager>().unwrap().pending::<Update>(), 0);
    }

    #[test]
    fn events_pushed_during_a_drain_wait_for_the_next_one() {
        let mut core = core_with_manager();
        core.get_resource_mut::<EventManager>()
            .unwrap()
            .register_scheduled_callback::<Ping, Update, _>(|core: &mut Core, ping: &Ping| {
                core.get_resource_mut::<Seen>()?.0.push(ping.0);
                if ping.0 < 3 {
                    core.get_resource::<EventManager>()?.push_event(Ping(ping.0 + 1));
                }
                Ok(())
            });

        core.get_resource::<EventManager>().unwrap().push_event(Ping(1));
        process_events::<Update>(&mut core).unwrap();
        assert_eq!(core.get_resource::<Seen>().unwrap().0, vec![1]);
        process_events::<Update>(&mut core).unwrap();
        process_events::<Update>(&mut core).unwrap();
        assert_eq!(core.get_resource::<Seen>().unwrap().0, vec![1, 2, 3]);
    }

    #[test]
    fn unregistering_the_last_scheduled_callback_stops_queueing() {
        let mut core = core_with_manager();
        let manager = core.get_resource_mut::<EventManager>().unwrap();
        let id = manager.register_scheduled_callback::<Ping, Update, _>(record);
        assert!(manager.unregister_scheduled_callback::<Ping, Update>(id));
        assert!(!manager.unregister_scheduled_callback::<Ping, Update>(id));

        manager.push_event(Ping(5));
        assert_eq!(manager.pending::<Update>(), 0);
    }

    #[test]
    fn failing_callback_does_not_stop_the_drain() {
        let mut core = core_with_manager();
        let manager = core.get_resource_mut::<EventManager>().unwrap();
        manager.register_scheduled_callback::<Ping, Update, _>(|_: &mut Core, ping: &Ping| {
            anyhow::ensure!(ping.0 != 1, "bad ping");
            Ok(())
        });
        manager.register_scheduled_callback::<Ping, Update, _>(record);
        manager.push_event(Ping(1));
        manager.push_event(Ping(2));

        assert!(process_events::<Update>(&mut core).is_err());
        assert_eq!(core.get_resource::<Seen>().unwrap().0, vec![1, 2]);
    }

    #[test]
    fn worker_threads_push_through_the_sender() {
        let mut core = core_with_manager();
        let manager = core.get_resource_mut::<EventManager>().unwrap();
        manager.register_scheduled_callback::<Ping, Update, _>(record);
        let sender = manager.sender();

        let workers: Vec<_> = (0..4)
            .map(|n| {
                let sender = sender.clone();
                std::thread::spawn(move || sender.push_event(Ping(n)))
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        process_events::<Update>(&mut core).unwrap();
        let mut seen = core.get_resource::<Seen>().unwrap().0.clone();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }
}
