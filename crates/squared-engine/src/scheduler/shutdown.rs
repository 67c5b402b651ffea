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

use super::{Scheduler, SchedulerBase};
use crate::core::Core;

/// Runs its systems once, on the tick where the core has been asked to stop.
///
/// It stays idle while the core is running and while no stop was requested,
/// so driving the core manually with [`Core::run_systems`] never fires it.
/// After firing it removes itself through the post-tick sweep.
#[derive(Default)]
pub struct Shutdown {
    base: SchedulerBase,
}

impl Shutdown {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for Shutdown {
    fn base(&self) -> &SchedulerBase {
        &self.base
    }

    fn run_systems(&self, core: &mut Core) -> anyhow::Result<()> {
        if core.is_running() || !core.stop_requested() {
            return Ok(());
        }
        log::debug!("Running shutdown systems.");
        core.delete_scheduler::<Shutdown>()?;
        self.base.run_pass(core)
    }
}
