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

use std::cell::Cell;

use super::fixed_time_update::{checked_tick_rate, split_ticks, DEFAULT_TICK_RATE};
use super::{Scheduler, SchedulerBase};
use crate::core::Core;
use crate::time::Time;

/// Leftover time below this is dropped instead of getting its own run.
pub const REMAINDER_THRESHOLD: f32 = 1e-4;

/// Subdivides each frame into steps of at most `tick_rate` seconds.
///
/// With `elapsed = n * tick_rate + r`, systems run `n` times with
/// [`current_delta`](RelativeTimeUpdate::current_delta) equal to the tick
/// rate, then once more with `r` if `r` exceeds [`REMAINDER_THRESHOLD`].
/// Nothing carries over between ticks.
pub struct RelativeTimeUpdate {
    base: SchedulerBase,
    tick_rate: Cell<f32>,
    current_delta: Cell<f32>,
}

impl RelativeTimeUpdate {
    /// Creates a scheduler whose steps are at most `tick_rate` seconds.
    ///
    /// An invalid rate falls back to [`DEFAULT_TICK_RATE`] with a warning.
    pub fn new(tick_rate: f32) -> Self {
        let tick_rate = checked_tick_rate(tick_rate, "RelativeTimeUpdate").unwrap_or(DEFAULT_TICK_RATE);
        Self {
            base: SchedulerBase::new(),
            tick_rate: Cell::new(tick_rate),
            current_delta: Cell::new(0.0),
        }
    }

    /// The target step length in seconds.
    pub fn tick_rate(&self) -> f32 {
        self.tick_rate.get()
    }

    /// Changes the target step length.
    pub fn set_tick_rate(&self, tick_rate: f32) {
        if let Some(tick_rate) = checked_tick_rate(tick_rate, "RelativeTimeUpdate") {
            self.tick_rate.set(tick_rate);
        }
    }

    /// The length of the step being run, for systems to scale by.
    pub fn current_delta(&self) -> f32 {
        self.current_delta.get()
    }

    fn step(&self, core: &mut Core, delta: f32) -> anyhow::Result<()> {
        self.current_delta.set(delta);
        self.base.run_pass(core)
    }
}

impl Default for RelativeTimeUpdate {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE)
    }
}

impl Scheduler for RelativeTimeUpdate {
    fn base(&self) -> &SchedulerBase {
        &self.base
    }

    fn run_systems(&self, core: &mut Core) -> anyhow::Result<()> {
        let elapsed = core.get_resource::<Time>()?.elapsed_time;
        let tick_rate = self.tick_rate.get();
        let (ticks, remainder) = split_ticks(elapsed, tick_rate);

        for _ in 0..ticks {
            if !self.base.should_run_systems() {
                return Ok(());
            }
            self.step(core, tick_rate)?;
        }
        if remainder > REMAINDER_THRESHOLD && self.base.should_run_systems() {
            self.step(core, remainder)?;
        }
        Ok(())
    }
}
