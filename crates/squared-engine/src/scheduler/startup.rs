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

/// Runs its systems on the first tick only, then removes itself.
///
/// The removal is requested at the start of the run and carried out by the
/// post-tick sweep, so the scheduler is never dropped while it runs.
#[derive(Default)]
pub struct Startup {
    base: SchedulerBase,
}

impl Startup {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for Startup {
    fn base(&self) -> &SchedulerBase {
        &self.base
    }

    fn run_systems(&self, core: &mut Core) -> anyhow::Result<()> {
        core.delete_scheduler::<Startup>()?;
        self.base.run_pass(core)
    }
}
