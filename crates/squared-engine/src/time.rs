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

//! Frame timing.

use std::time::Instant;

use crate::core::Core;

/// Seconds elapsed between the last two calls to [`Time::update`].
///
/// The core registers this resource and refreshes it at the start of
/// `Startup` and `Update`. Tests drive time-based schedulers deterministically
/// by overwriting `elapsed_time` from an `Update` system registered after the
/// built-in one.
#[derive(Debug, Clone, Copy)]
pub struct Time {
    /// Seconds since the previous update.
    pub elapsed_time: f32,
    last_update: Instant,
}

impl Time {
    /// Starts the clock now with no elapsed time.
    pub fn new() -> Self {
        Self {
            elapsed_time: 0.0,
            last_update: Instant::now(),
        }
    }

    /// Recomputes `elapsed_time` from the monotonic clock.
    pub fn update(&mut self) {
        let now = Instant::now();
        self.elapsed_time = now.duration_since(self.last_update).as_secs_f32();
        self.last_update = now;
    }

    /// When the clock was last updated.
    pub fn last_update(&self) -> Instant {
        self.last_update
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

/// System refreshing the [`Time`] resource.
pub fn update_time(core: &mut Core) -> anyhow::Result<()> {
    core.get_resource_mut::<Time>()?.update();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn update_measures_the_gap() {
        let mut time = Time::new();
        let before = time.last_update();
        std::thread::sleep(Duration::from_millis(5));
        time.update();

        assert!(time.elapsed_time >= 0.005);
        assert!(time.last_update() > before);
    }
}
