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

//! Immediate and scheduler-bound event delivery.

use std::sync::atomic::{AtomicU32, Ordering};
use std::collections::VecDeque;
use std::sync::Arc;

use squared_engine::{Core, EventManager, EventPlugin, FixedTimeUpdate, Time, Update};

/// Replays scripted `Time::elapsed_time` values, one per tick, then zeros.
struct Clock(VecDeque<f32>);

fn scripted_clock(core: &mut Core) -> anyhow::Result<()> {
    let elapsed = core.get_resource_mut::<Clock>()?.0.pop_front().unwrap_or(0.0);
    core.get_resource_mut::<Time>()?.elapsed_time = elapsed;
    Ok(())
}

/// Registers the clock after the built-in time update of `Update`, with a
/// fixed step of a quarter second.
fn use_scripted_clock(core: &mut Core, elapsed: &[f32]) {
    core.get_scheduler::<FixedTimeUpdate>().unwrap().set_tick_rate(0.25);
    core.register_resource(Clock(elapsed.iter().copied().collect())).unwrap();
    core.register_system(scripted_clock).unwrap();
}

#[derive(Debug, Clone)]
struct Score {
    value: u32,
}

#[derive(Default)]
struct Total(u32);

#[test]
fn test_immediate_callback_until_unregistered() {
    // --- 1. ARRANGE ---
    let seen = Arc::new(AtomicU32::new(0));
    let mut manager = EventManager::new();
    let observer = seen.clone();
    let id = manager.register_callback::<Score, _>(move |score| {
        observer.store(score.value, Ordering::SeqCst);
    });

    // --- 2. ACT & ASSERT ---
    manager.push_event(Score { value: 42 });
    assert_eq!(seen.load(Ordering::SeqCst), 42);

    assert!(manager.unregister_callback::<Score>(id));
    manager.push_event(Score { value: 7 });
    assert_eq!(seen.load(Ordering::SeqCst), 42);
}

#[test]
fn test_scheduled_callbacks_run_during_their_scheduler() {
    // --- 1. ARRANGE ---
    let mut core = Core::new();
    core.add_plugins::<(EventPlugin,)>().unwrap();
    core.register_resource(Total::default()).unwrap();
    let manager = core.get_resource_mut::<EventManager>().unwrap();
    manager.register_scheduled_callback::<Score, Update, _>(|core: &mut Core, score: &Score| {
        core.get_resource_mut::<Total>()?.0 += score.value;
        Ok(())
    });

    // --- 2. ACT ---
    manager.push_event(Score { value: 1 });
    manager.push_event(Score { value: 2 });
    assert_eq!(core.get_resource::<Total>().unwrap().0, 0);
    core.run_systems().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(core.get_resource::<Total>().unwrap().0, 3);
    core.run_systems().unwrap();
    assert_eq!(core.get_resource::<Total>().unwrap().0, 3);
}

#[test]
fn test_events_fan_out_to_every_bound_scheduler() {
    let mut core = Core::new();
    core.add_plugins::<(EventPlugin,)>().unwrap();
    core.register_resource(Total::default()).unwrap();
    use_scripted_clock(&mut core, &[0.0, 0.25]);
    let manager = core.get_resource_mut::<EventManager>().unwrap();
    manager.register_scheduled_callback::<Score, Update, _>(|core: &mut Core, score: &Score| {
        core.get_resource_mut::<Total>()?.0 += score.value;
        Ok(())
    });
    manager.register_scheduled_callback::<Score, FixedTimeUpdate, _>(|core: &mut Core, score: &Score| {
        core.get_resource_mut::<Total>()?.0 += 10 * score.value;
        Ok(())
    });

    manager.push_event(Score { value: 1 });
    assert_eq!(manager.pending::<Update>(), 1);
    assert_eq!(manager.pending::<FixedTimeUpdate>(), 1);

    // FixedTimeUpdate only drains on ticks where it runs.
    core.run_systems().unwrap();
    assert_eq!(core.get_resource::<Total>().unwrap().0, 1);
    assert_eq!(
        core.get_resource::<EventManager>().unwrap().pending::<FixedTimeUpdate>(),
        1
    );

    core.run_systems().unwrap();
    assert_eq!(core.get_resource::<Total>().unwrap().0, 11);
}

#[test]
fn test_worker_threads_feed_the_main_thread() {
    // --- 1. ARRANGE ---
    let mut core = Core::new();
    core.add_plugins::<(EventPlugin,)>().unwrap();
    core.register_resource(Total::default()).unwrap();
    let manager = core.get_resource_mut::<EventManager>().unwrap();
    manager.register_scheduled_callback::<Score, Update, _>(|core: &mut Core, score: &Score| {
        core.get_resource_mut::<Total>()?.0 += score.value;
        Ok(())
    });
    let sender = manager.sender();

    // --- 2. ACT ---
    let workers: Vec<_> = (1..=10)
        .map(|value| {
            let sender = sender.clone();
            std::thread::spawn(move || sender.push_event(Score { value }))
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    core.run_systems().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(core.get_resource::<Total>().unwrap().0, 55);
}
