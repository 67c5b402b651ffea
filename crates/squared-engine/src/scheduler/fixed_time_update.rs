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

use super::{Scheduler, SchedulerBase};
use crate::core::Core;
use crate::time::Time;

/// The tick rate used when none is configured: 50 runs per second.
pub const DEFAULT_TICK_RATE: f32 = 1.0 / 50.0;

/// Absorbs float error so that a buffer holding exactly `n * tick_rate`
/// yields `n` runs.
pub(crate) const TICK_EPSILON: f32 = 1e-5;

/// Returns `tick_rate` if it is a positive, finite number of seconds, and
/// warns on behalf of `scheduler` otherwise.
pub(crate) fn checked_tick_rate(tick_rate: f32, scheduler: &str) -> Option<f32> {
    if tick_rate.is_finite() && tick_rate > 0.0 {
        return Some(tick_rate);
    }
    log::warn!("Ignoring invalid tick rate {tick_rate} for {scheduler}.");
    None
}

/// Returns `(runs, leftover)` for `time` seconds at `tick_rate`.
pub(crate) fn split_ticks(time: f32, tick_rate: f32) -> (u32, f32) {
    if tick_rate <= 0.0 || time <= 0.0 {
        return (0, time.max(0.0));
    }
    let ticks = ((time + TICK_EPSILON) / tick_rate).floor();
    let leftover = (time - ticks * tick_rate).max(0.0);
    (ticks as u32, leftover)
}

/// Runs its systems at a fixed rate regardless of the frame rate.
///
/// Each tick adds [`Time::elapsed_time`] to a buffer, runs every system
/// `floor(buffer / tick_rate)` times and keeps the leftover for later ticks.
/// Systems should advance their simulation by [`FixedTimeUpdate::tick_rate`].
pub struct FixedTimeUpdate {
    base: SchedulerBase,
    tick_rate: Cell<f32>,
    buffered_time: Cell<f32>,
}

impl FixedTimeUpdate {
    /// Creates a scheduler running `1 / tick_rate` times per second.
    ///
    /// An invalid rate falls back to [`DEFAULT_TICK_RATE`] with a warning.
    pub fn new(tick_rate: f32) -> Self {
        let tick_rate = checked_tick_rate(tick_rate, "FixedTimeUpdate").unwrap_or(DEFAULT_TICK_RATE);
        Self {
            base: SchedulerBase::new(),
            tick_rate: Cell::new(tick_rate),
            buffered_time: Cell::new(0.0),
        }
    }

    /// Seconds between two runs.
    pub fn tick_rate(&self) -> f32 {
        self.tick_rate.get()
    }

    /// Changes the seconds between two runs.
    pub fn set_tick_rate(&self, tick_rate: f32) {
        if let Some(tick_rate) = checked_tick_rate(tick_rate, "FixedTimeUpdate") {
            self.tick_rate.set(tick_rate);
        }
    }

    /// Time carried over to the next tick.
    pub fn buffered_time(&self) -> f32 {
        self.buffered_time.get()
    }
}

impl Default for FixedTimeUpdate {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE)
    }
}

impl Scheduler for FixedTimeUpdate {
    fn base(&self) -> &SchedulerBase {
        &self.base
    }

    fn run_systems(&self, core: &mut Core) -> anyhow::Result<()> {
        let elapsed = core.get_resource::<Time>()?.elapsed_time;
        let (ticks, leftover) = split_ticks(self.buffered_time.get() + elapsed, self.tick_rate.get());
        self.buffered_time.set(leftover);

        for _ in 0..ticks {
            if !self.base.should_run_systems() {
                break;
            }
            self.base.run_pass(core)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_counts_whole_ticks() {
        assert_eq!(split_ticks(0.1, 0.2).0, 0);
        assert_eq!(split_ticks(0.2, 0.2).0, 1);
        assert_eq!(split_ticks(0.4, 0.2).0, 2);
        assert_eq!(split_ticks(0.5, 0.2).0, 2);
    }

    #[test]
    fn split_keeps_the_leftover() {
        let (ticks, leftover) = split_ticks(0.42, 0.2);
        assert_eq!(ticks, 2);
        assert!((leftover - 0.02).abs() < 1e-5);
        assert_eq!(split_ticks(0.0, 0.2), (0, 0.0));
    }

    #[test]
    fn invalid_rate_never_runs() {
        assert_eq!(split_ticks(1.0, 0.0).0, 0);
        let scheduler = FixedTimeUpdate::new(0.5);
        scheduler.set_tick_rate(-1.0);
        assert_eq!(scheduler.tick_rate(), 0.5);
        assert_eq!(FixedTimeUpdate::new(0.0).tick_rate(), DEFAULT_TICK_RATE);
        assert_eq!(FixedTimeUpdate::new(f32::NAN).tick_rate(), DEFAULT_TICK_RATE);
    }
}
