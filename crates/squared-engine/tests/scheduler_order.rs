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

//! Scheduler ordering through the dependency graph.

use squared_engine::{Core, Scheduler, SchedulerBase, SchedulerError};

#[derive(Default)]
struct SchedulerA {
    base: SchedulerBase,
}

impl Scheduler for SchedulerA {
    fn base(&self) -> &SchedulerBase {
        &self.base
    }
}

#[derive(Default)]
struct SchedulerB {
    base: SchedulerBase,
}

impl Scheduler for SchedulerB {
    fn base(&self) -> &SchedulerBase {
        &self.base
    }
}

#[derive(Default)]
struct Trace(Vec<u32>);

fn core_with_two_schedulers() -> Core {
    let mut core = Core::new();
    core.register_resource(Trace::default()).unwrap();
    core.register_scheduler(SchedulerA::default()).unwrap();
    core.register_scheduler(SchedulerB::default()).unwrap();
    core.register_system_in::<SchedulerA, _>(|core: &mut Core| {
        core.get_resource_mut::<Trace>()?.0.push(1);
        Ok(())
    })
    .unwrap();
    core.register_system_in::<SchedulerB, _>(|core: &mut Core| {
        core.get_resource_mut::<Trace>()?.0.push(2);
        Ok(())
    })
    .unwrap();
    core
}

#[test]
fn test_edge_a_before_b() {
    // --- 1. ARRANGE ---
    let mut core = core_with_two_schedulers();
    core.set_scheduler_before::<SchedulerA, SchedulerB>().unwrap();

    // --- 2. ACT ---
    core.run_systems().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(core.get_resource::<Trace>().unwrap().0, vec![1, 2]);
}

#[test]
fn test_edge_b_before_a() {
    let mut core = core_with_two_schedulers();
    core.set_scheduler_before::<SchedulerB, SchedulerA>().unwrap();

    core.run_systems().unwrap();

    assert_eq!(core.get_resource::<Trace>().unwrap().0, vec![2, 1]);
}

#[test]
fn test_reversing_an_edge() {
    let mut core = core_with_two_schedulers();
    core.set_scheduler_after::<SchedulerA, SchedulerB>().unwrap();
    core.run_systems().unwrap();
    assert_eq!(core.get_resource::<Trace>().unwrap().0, vec![2, 1]);

    assert!(core.remove_dependency_after::<SchedulerA, SchedulerB>());
    core.set_scheduler_before::<SchedulerA, SchedulerB>().unwrap();
    core.get_resource_mut::<Trace>().unwrap().0.clear();
    core.run_systems().unwrap();
    assert_eq!(core.get_resource::<Trace>().unwrap().0, vec![1, 2]);
}

#[test]
fn test_cycle_is_rejected_and_graph_unchanged() {
    let mut core = core_with_two_schedulers();
    core.set_scheduler_before::<SchedulerA, SchedulerB>().unwrap();

    let error = core.set_scheduler_before::<SchedulerB, SchedulerA>().unwrap_err();
    assert!(matches!(error, SchedulerError::WouldCycle { .. }));

    core.run_systems().unwrap();
    assert_eq!(core.get_resource::<Trace>().unwrap().0, vec![1, 2]);
}
