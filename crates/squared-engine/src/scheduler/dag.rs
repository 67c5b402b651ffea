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

//! Ordering of scheduler types.

use std::any::Any;
use std::rc::Rc;

use squared_core::graph::{has_path, topological_sort};

use super::{Scheduler, SchedulerErrorPolicy, SchedulerKey};
use crate::error::SchedulerError;

struct Entry {
    key: SchedulerKey,
    scheduler: Rc<dyn Scheduler>,
    concrete: Rc<dyn Any>,
}

/// Registered schedulers plus the "runs before" edges between them.
///
/// The run order is a topological sort of the edges, recomputed lazily when
/// schedulers or edges change. Schedulers with no ordering relation run in
/// registration order. Edges may name schedulers that are not registered
/// yet; they take effect once both ends exist.
#[derive(Default)]
pub struct SchedulerDag {
    entries: Vec<Entry>,
    edges: Vec<(SchedulerKey, SchedulerKey)>,
    sorted: Vec<Rc<dyn Scheduler>>,
    dirty: bool,
    to_delete: Vec<SchedulerKey>,
}

impl SchedulerDag {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Schedulers ---

    /// Adds `scheduler`, failing if one of the same type exists.
    pub fn register<S: Scheduler>(&mut self, scheduler: S) -> Result<Rc<S>, SchedulerError> {
        let key = SchedulerKey::of::<S>();
        if self.contains(key) {
            return Err(SchedulerError::AlreadyRegistered(key.name()));
        }
        Ok(self.insert(scheduler))
    }

    pub(crate) fn insert<S: Scheduler>(&mut self, scheduler: S) -> Rc<S> {
        let key = SchedulerKey::of::<S>();
        let scheduler = Rc::new(scheduler);
        scheduler.base().set_name(key.name());
        self.entries.retain(|entry| entry.key != key);
        self.entries.push(Entry {
            key,
            scheduler: scheduler.clone(),
            concrete: scheduler.clone(),
        });
        self.dirty = true;
        log::debug!("Registered scheduler `{}`.", key.name());
        scheduler
    }

    /// Returns `true` if a scheduler with `key` is registered.
    pub fn contains(&self, key: SchedulerKey) -> bool {
        self.entries.iter().any(|entry| entry.key == key)
    }

    /// Returns the scheduler of type `S`.
    pub fn get<S: Scheduler>(&self) -> Result<&S, SchedulerError> {
        let key = SchedulerKey::of::<S>();
        self.entry(key)
            .and_then(|entry| entry.concrete.downcast_ref::<S>())
            .ok_or(SchedulerError::NotRegistered(key.name()))
    }

    /// Returns a shared handle to the scheduler of type `S`.
    pub fn get_shared<S: Scheduler>(&self) -> Result<Rc<S>, SchedulerError> {
        let key = SchedulerKey::of::<S>();
        self.entry(key)
            .and_then(|entry| entry.concrete.clone().downcast::<S>().ok())
            .ok_or(SchedulerError::NotRegistered(key.name()))
    }

    /// Returns the scheduler registered under `key`.
    pub fn get_dyn(&self, key: SchedulerKey) -> Result<Rc<dyn Scheduler>, SchedulerError> {
        self.entry(key)
            .map(|entry| entry.scheduler.clone())
            .ok_or(SchedulerError::NotRegistered(key.name()))
    }

    fn entry(&self, key: SchedulerKey) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// The registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = SchedulerKey> + '_ {
        self.entries.iter().map(|entry| entry.key)
    }

    /// Removes the scheduler under `key` and every edge touching it.
    ///
    /// Must not be called while the graph is being walked; use
    /// [`SchedulerDag::stage_delete`] from inside a tick.
    pub fn delete(&mut self, key: SchedulerKey) -> Result<(), SchedulerError> {
        if !self.contains(key) {
            return Err(SchedulerError::NotRegistered(key.name()));
        }
        self.entries.retain(|entry| entry.key != key);
        self.edges.retain(|(before, after)| *before != key && *after != key);
        self.dirty = true;
        log::debug!("Deleted scheduler `{}`.", key.name());
        Ok(())
    }

    /// Requests the removal of `key` once the current walk ends.
    pub fn stage_delete(&mut self, key: SchedulerKey) -> Result<(), SchedulerError> {
        if !self.contains(key) {
            return Err(SchedulerError::NotRegistered(key.name()));
        }
        if !self.to_delete.contains(&key) {
            self.to_delete.push(key);
        }
        Ok(())
    }

    /// Deletes every scheduler staged with [`SchedulerDag::stage_delete`].
    pub fn sweep(&mut self) {
        for key in std::mem::take(&mut self.to_delete) {
            if let Err(error) = self.delete(key) {
                log::debug!("Skipping staged deletion: {error}");
            }
        }
    }

    /// Sets the error policy of every registered scheduler.
    pub fn set_error_policy_for_all(&self, policy: SchedulerErrorPolicy) {
        for entry in &self.entries {
            entry.scheduler.base().set_error_policy(policy);
        }
    }

    // --- Edges ---

    /// Requires `before` to run before `after`.
    ///
    /// Rejected with [`SchedulerError::WouldCycle`] if `after` already runs
    /// before `before`, directly or transitively.
    pub fn set_before(&mut self, before: SchedulerKey, after: SchedulerKey) -> Result<(), SchedulerError> {
        if self.edges.contains(&(before, after)) {
            return Ok(());
        }
        if has_path(self.edges.iter().copied(), after, before) {
            return Err(SchedulerError::WouldCycle {
                before: before.name(),
                after: after.name(),
            });
        }
        self.add_edge(before, after);
        Ok(())
    }

    /// Requires `after` to run after `before`.
    pub fn set_after(&mut self, after: SchedulerKey, before: SchedulerKey) -> Result<(), SchedulerError> {
        self.set_before(before, after)
    }

    pub(crate) fn add_edge(&mut self, before: SchedulerKey, after: SchedulerKey) {
        self.edges.push((before, after));
        self.dirty = true;
    }

    /// Removes the edge "`before` runs before `after`". Returns `false` and
    /// logs a warning if no such edge exists.
    pub fn remove_dependency_before(&mut self, before: SchedulerKey, after: SchedulerKey) -> bool {
        let count = self.edges.len();
        self.edges.retain(|edge| *edge != (before, after));
        if self.edges.len() == count {
            log::warn!(
                "No dependency `{}` before `{}` to remove.",
                before.name(),
                after.name()
            );
            return false;
        }
        self.dirty = true;
        true
    }

    /// Removes the edge "`after` runs after `before`".
    pub fn remove_dependency_after(&mut self, after: SchedulerKey, before: SchedulerKey) -> bool {
        self.remove_dependency_before(before, after)
    }

    /// Returns `true` if an edge "`before` runs before `after`" exists.
    pub fn has_dependency(&self, before: SchedulerKey, after: SchedulerKey) -> bool {
        self.edges.contains(&(before, after))
    }

    // --- Order ---

    /// Returns the schedulers in run order, re-sorting if anything changed.
    pub fn sorted(&mut self) -> Result<Vec<Rc<dyn Scheduler>>, SchedulerError> {
        if self.dirty {
            let order = topological_sort(self.keys(), self.edges.iter().copied())?;
            self.sorted = order
                .into_iter()
                .filter_map(|key| self.entry(key).map(|entry| entry.scheduler.clone()))
                .collect();
            self.dirty = false;
            log::trace!("Scheduler order recomputed: {:?}", self.order());
        }
        Ok(self.sorted.clone())
    }

    /// The run order by name, as of the last call to
    /// [`sorted`](SchedulerDag::sorted).
    pub fn order(&self) -> Vec<&'static str> {
        self.sorted.iter().map(|scheduler| scheduler.base().name()).collect()
    }
}
