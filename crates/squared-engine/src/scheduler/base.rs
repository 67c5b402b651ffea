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

//! State and behaviour shared by every scheduler.

use std::cell::{Cell, RefCell};

use squared_core::{FunctionContainer, FunctionId};

use super::{SchedulerErrorPolicy, System};
use crate::core::Core;
use crate::error::is_fatal;

#[derive(Debug, Clone, Copy)]
enum Deferred {
    Enable(FunctionId),
    Disable(FunctionId),
    Remove(FunctionId),
}

/// The system lists, error policy and run flags of a scheduler.
///
/// Every method takes `&self`: schedulers are shared while they run, and the
/// systems they run may reach back into them through the [`Core`] (to add a
/// system, disable another, or read scheduler state). A pass works on its own
/// copy of the enabled list:
///
/// - systems added during a pass are appended once it ends;
/// - enabling, disabling or removing during a pass is applied once it ends.
///
/// A [`FunctionId`] is never both enabled and disabled.
pub struct SchedulerBase {
    name: Cell<&'static str>,
    enabled: RefCell<FunctionContainer<System>>,
    disabled: RefCell<FunctionContainer<System>>,
    in_flight: RefCell<Vec<FunctionId>>,
    deferred: RefCell<Vec<Deferred>>,
    policy: Cell<SchedulerErrorPolicy>,
    should_run_systems: Cell<bool>,
    should_run_next_scheduler: Cell<bool>,
    running: Cell<bool>,
}

impl SchedulerBase {
    /// Creates an empty base with the default error policy.
    pub fn new() -> Self {
        Self {
            name: Cell::new("unregistered scheduler"),
            enabled: RefCell::default(),
            disabled: RefCell::default(),
            in_flight: RefCell::default(),
            deferred: RefCell::default(),
            policy: Cell::new(SchedulerErrorPolicy::default()),
            should_run_systems: Cell::new(true),
            should_run_next_scheduler: Cell::new(true),
            running: Cell::new(false),
        }
    }

    /// The name used in log messages, set when the scheduler is registered.
    pub fn name(&self) -> &'static str {
        self.name.get()
    }

    pub(crate) fn set_name(&self, name: &'static str) {
        self.name.set(name);
    }

    // --- Systems ---

    /// Adds an enabled system.
    ///
    /// Rejected with a warning if `id` is already enabled or disabled; the
    /// existing ID is returned either way.
    pub fn add_system(&self, id: FunctionId, system: System) -> FunctionId {
        if self.contains(id) {
            log::warn!("System {id} already exists in scheduler `{}`.", self.name());
            return id;
        }
        self.enabled.borrow_mut().add_function(id, system)
    }

    /// Removes a system whether it is enabled or disabled.
    pub fn remove_system(&self, id: FunctionId) -> bool {
        if self.running.get() {
            return self.defer(Deferred::Remove(id));
        }
        if self.disabled.borrow().contains(id) {
            return self.disabled.borrow_mut().delete_function(id).is_some();
        }
        self.enabled.borrow_mut().delete_function(id).is_some()
    }

    /// Moves a disabled system back to the enabled list.
    pub fn enable(&self, id: FunctionId) -> bool {
        if self.running.get() {
            return self.defer(Deferred::Enable(id));
        }
        Self::move_system(&self.disabled, &self.enabled, id, "enabled", self.name())
    }

    /// Moves an enabled system to the disabled list. It keeps its position
    /// relative to other disabled systems and is appended when re-enabled.
    pub fn disable(&self, id: FunctionId) -> bool {
        if self.running.get() {
            return self.defer(Deferred::Disable(id));
        }
        Self::move_system(&self.enabled, &self.disabled, id, "disabled", self.name())
    }

    fn defer(&self, action: Deferred) -> bool {
        let (Deferred::Enable(id) | Deferred::Disable(id) | Deferred::Remove(id)) = action;
        if !self.contains(id) {
            log::warn!("System {id} is unknown to scheduler `{}`.", self.name());
            return false;
        }
        self.deferred.borrow_mut().push(action);
        true
    }

    fn move_system(
        from: &RefCell<FunctionContainer<System>>,
        to: &RefCell<FunctionContainer<System>>,
        id: FunctionId,
        state: &str,
        name: &str,
    ) -> bool {
        if to.borrow().contains(id) {
            log::warn!("System {id} is already {state} in scheduler `{name}`.");
            return false;
        }
        let Some(system) = from.borrow_mut().delete_function(id) else {
            return false;
        };
        to.borrow_mut().add_function(id, system);
        true
    }

    /// Returns `true` if `id` is enabled (including while it runs).
    pub fn is_enabled(&self, id: FunctionId) -> bool {
        self.enabled.borrow().contains(id) || self.in_flight.borrow().contains(&id)
    }

    /// Returns `true` if `id` is disabled.
    pub fn is_disabled(&self, id: FunctionId) -> bool {
        self.disabled.borrow().contains(id)
    }

    /// Returns `true` if `id` is either enabled or disabled.
    pub fn contains(&self, id: FunctionId) -> bool {
        self.is_enabled(id) || self.is_disabled(id)
    }

    /// The enabled system IDs in run order.
    pub fn enabled_ids(&self) -> Vec<FunctionId> {
        let mut ids = self.in_flight.borrow().clone();
        ids.extend(self.enabled.borrow().ids());
        ids
    }

    /// The disabled system IDs.
    pub fn disabled_ids(&self) -> Vec<FunctionId> {
        self.disabled.borrow().ids().collect()
    }

    // --- Error policy and flags ---

    /// The current error policy.
    pub fn error_policy(&self) -> SchedulerErrorPolicy {
        self.policy.get()
    }

    /// Replaces the error policy.
    pub fn set_error_policy(&self, policy: SchedulerErrorPolicy) {
        self.policy.set(policy);
    }

    /// Whether the remaining systems of this run will execute.
    pub fn should_run_systems(&self) -> bool {
        self.should_run_systems.get()
    }

    /// Whether the schedulers after this one will execute this tick.
    pub fn should_run_next_scheduler(&self) -> bool {
        self.should_run_next_scheduler.get()
    }

    pub(crate) fn reset_flags(&self) {
        self.should_run_systems.set(true);
        self.should_run_next_scheduler.set(true);
    }

    // --- Running ---

    /// Runs every enabled system once, in insertion order, applying the
    /// error policy to failures.
    ///
    /// Returns an error under [`SchedulerErrorPolicy::Nothing`] or when a
    /// system fails with a fatal engine error.
    pub fn run_pass(&self, core: &mut Core) -> anyhow::Result<()> {
        if self.running.get() {
            log::warn!("Scheduler `{}` is already running, skipping nested pass.", self.name());
            return Ok(());
        }

        let mut systems = self.enabled.take();
        *self.in_flight.borrow_mut() = systems.ids().collect();
        self.running.set(true);

        let mut result = Ok(());
        for (id, system) in systems.iter_mut() {
            if !self.should_run_systems.get() {
                break;
            }
            if let Err(error) = self.run_system(id, system, core) {
                result = Err(error);
                break;
            }
        }

        self.running.set(false);
        self.in_flight.borrow_mut().clear();
        let added = self.enabled.replace(systems);
        self.enabled.borrow_mut().append(added);
        self.apply_deferred();
        result
    }

    fn run_system(&self, id: FunctionId, system: &mut System, core: &mut Core) -> anyhow::Result<()> {
        let Err(error) = system(core) else {
            return Ok(());
        };

        if is_fatal(&error) {
            self.should_run_systems.set(false);
            self.should_run_next_scheduler.set(false);
            return Err(error);
        }

        let policy = self.policy.get();
        match policy {
            SchedulerErrorPolicy::Nothing => return Err(error),
            SchedulerErrorPolicy::Silent => {
                log::debug!("System {id} failed in scheduler `{}`: {error:#}", self.name());
            }
            _ => {
                log::error!("System {id} failed in scheduler `{}`: {error:#}", self.name());
            }
        }
        if !policy.continues_scheduler() {
            self.should_run_systems.set(false);
        }
        if !policy.continues_tick() {
            self.should_run_next_scheduler.set(false);
        }
        Ok(())
    }

    fn apply_deferred(&self) {
        let deferred = self.deferred.take();
        for action in deferred {
            match action {
                Deferred::Enable(id) => self.enable(id),
                Deferred::Disable(id) => self.disable(id),
                Deferred::Remove(id) => self.remove_system(id),
            };
        }
    }
}

impl Default for SchedulerBase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{Scheduler, Update};

    #[derive(Default)]
    struct Trace(Vec<u32>);

    fn traced(value: u32) -> impl FnMut(&mut Core) -> anyhow::Result<()> {
        move |core: &mut Core| {
            core.get_resource_mut::<Trace>()?.0.push(value);
            Ok(())
        }
    }

    fn base_with_trace() -> (Core, SchedulerBase) {
        let mut core = Core::new();
        core.register_resource(Trace::default()).unwrap();
        (core, SchedulerBase::new())
    }

    fn trace(core: &Core) -> Vec<u32> {
        core.get_resource::<Trace>().unwrap().0.clone()
    }

    #[test]
    fn systems_run_in_insertion_order() {
        let (mut core, base) = base_with_trace();
        base.add_system(FunctionId::from_raw(2), Box::new(traced(2)));
        base.add_system(FunctionId::from_raw(1), Box::new(traced(1)));

        base.run_pass(&mut core).unwrap();
        assert_eq!(trace(&core), vec![2, 1]);
    }

    #[test]
    fn enabled_and_disabled_stay_disjoint() {
        let (mut core, base) = base_with_trace();
        let id = FunctionId::from_raw(1);
        base.add_system(id, Box::new(traced(1)));

        assert!(base.disable(id));
        assert!(!base.disable(id));
        assert!(base.is_disabled(id) && !base.is_enabled(id));

        // Re-adding a disabled system is rejected.
        base.add_system(id, Box::new(traced(9)));
        assert_eq!(base.disabled_ids(), vec![id]);
        assert!(base.enabled_ids().is_empty());

        base.run_pass(&mut core).unwrap();
        assert!(trace(&core).is_empty());

        assert!(base.enable(id));
        base.run_pass(&mut core).unwrap();
        assert_eq!(trace(&core), vec![1]);
    }

    #[test]
    fn policies_update_flags() {
        use SchedulerErrorPolicy::*;
        for (policy, systems, next) in [
            (Silent, true, true),
            (LogAndContinue, true, true),
            (LogAndFinishScheduler, true, false),
            (LogAndStop, false, false),
        ] {
            let (mut core, base) = base_with_trace();
            base.set_error_policy(policy);
            base.add_system(
                FunctionId::from_raw(1),
                Box::new(|_: &mut Core| -> anyhow::Result<()> { anyhow::bail!("boom") }),
            );
            base.add_system(FunctionId::from_raw(2), Box::new(traced(2)));

            base.run_pass(&mut core).unwrap();
            assert_eq!(base.should_run_systems(), systems, "{policy:?}");
            assert_eq!(base.should_run_next_scheduler(), next, "{policy:?}");
            assert_eq!(trace(&core).len(), usize::from(systems), "{policy:?}");
        }
    }

    #[test]
    fn nothing_policy_returns_the_error() {
        let (mut core, base) = base_with_trace();
        base.set_error_policy(SchedulerErrorPolicy::Nothing);
        base.add_system(
            FunctionId::from_raw(1),
            Box::new(|_: &mut Core| -> anyhow::Result<()> { anyhow::bail!("boom") }),
        );
        base.add_system(FunctionId::from_raw(2), Box::new(traced(2)));

        let error = base.run_pass(&mut core).unwrap_err();
        assert_eq!(error.to_string(), "boom");
        assert!(trace(&core).is_empty());
        // The systems are back in place for the next pass.
        assert_eq!(base.enabled_ids().len(), 2);
    }

    #[test]
    fn fatal_errors_bypass_the_policy() {
        struct Missing;
        let (mut core, base) = base_with_trace();
        base.set_error_policy(SchedulerErrorPolicy::Silent);
        base.add_system(
            FunctionId::from_raw(1),
            Box::new(|core: &mut Core| -> anyhow::Result<()> {
                core.get_resource::<Missing>()?;
                Ok(())
            }),
        );

        assert!(base.run_pass(&mut core).is_err());
        assert!(!base.should_run_next_scheduler());
    }

    #[test]
    fn unknown_ids_are_rejected_during_a_pass() {
        let mut core = Core::new();
        let handle = core.shared_scheduler::<Update>().unwrap();
        let update = handle.base();
        for id in update.enabled_ids() {
            update.remove_system(id);
        }
        update.add_system(
            FunctionId::from_raw(1),
            Box::new(|core: &mut Core| -> anyhow::Result<()> {
                let base = core.get_scheduler::<Update>()?.base();
                let unknown = FunctionId::from_raw(99);
                anyhow::ensure!(!base.remove_system(unknown), "remove accepted");
                anyhow::ensure!(!base.enable(unknown), "enable accepted");
                anyhow::ensure!(!base.disable(unknown), "disable accepted");
                anyhow::ensure!(base.disable(FunctionId::from_raw(1)), "disable rejected");
                Ok(())
            }),
        );
        update.set_error_policy(SchedulerErrorPolicy::Nothing);

        update.run_pass(&mut core).unwrap();
        assert!(update.is_disabled(FunctionId::from_raw(1)));
    }

    #[test]
    fn changes_during_a_pass_apply_afterwards() {
        // --- 1. SETUP ---
        let mut core = Core::new();
        core.register_resource(Trace::default()).unwrap();
        let handle = core.shared_scheduler::<Update>().unwrap();
        let update = handle.base();
        for id in update.enabled_ids() {
            update.remove_system(id);
        }
        let first = FunctionId::from_raw(1);
        let second = FunctionId::from_raw(2);
        update.add_system(
            first,
            Box::new(move |core: &mut Core| -> anyhow::Result<()> {
                core.get_resource_mut::<Trace>()?.0.push(1);
                let base = core.get_scheduler::<Update>()?.base();
                base.disable(second);
                base.add_system(FunctionId::from_raw(3), Box::new(traced(3)));
                Ok(())
            }),
        );
        update.add_system(second, Box::new(traced(2)));

        // --- 2. ACTION ---
        update.run_pass(&mut core).unwrap();

        // --- 3. ASSERT ---
        assert_eq!(trace(&core), vec![1, 2]);
        assert!(update.is_disabled(second));
        assert_eq!(update.enabled_ids(), vec![first, FunctionId::from_raw(3)]);
    }
}
