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

use serde::{Deserialize, Serialize};

/// What a scheduler does when one of its systems returns an error.
///
/// | Policy | Logged at | Next systems run | Next schedulers run |
/// |---|---|---|---|
/// | `Nothing` | not logged, error returned | no | no |
/// | `Silent` | debug | yes | yes |
/// | `LogAndContinue` | error | yes | yes |
/// | `LogAndFinishScheduler` | error | yes | no |
/// | `LogAndStop` | error | no | no |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchedulerErrorPolicy {
    /// Return the error from the tick and let the caller decide.
    Nothing,
    /// Swallow the error, logging it at debug level.
    Silent,
    /// Log the error and carry on.
    #[default]
    LogAndContinue,
    /// Log the error, finish this scheduler, then end the tick.
    LogAndFinishScheduler,
    /// Log the error and end the tick immediately.
    LogAndStop,
}

impl SchedulerErrorPolicy {
    /// Whether later systems of the same scheduler still run after a failure.
    pub fn continues_scheduler(self) -> bool {
        !matches!(self, Self::Nothing | Self::LogAndStop)
    }

    /// Whether later schedulers of the tick still run after a failure.
    pub fn continues_tick(self) -> bool {
        matches!(self, Self::Silent | Self::LogAndContinue)
    }
}
