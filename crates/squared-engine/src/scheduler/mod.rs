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

//! Schedulers decide when systems run.
//!
//! A scheduler owns an ordered list of systems and a policy for system
//! failures. The [`SchedulerDag`] orders scheduler types with "runs before"
//! edges and walks them once per tick. The built-in schedulers are
//! [`Startup`], [`Update`], [`FixedTimeUpdate`], [`RelativeTimeUpdate`] and
//! [`Shutdown`].

mod base;
mod dag;
mod fixed_time_update;
mod policy;
mod relative_time_update;
mod shutdown;
mod startup;
mod system;
mod update;

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

pub use self::base::SchedulerBase;
pub use self::dag::SchedulerDag;
pub use self::fixed_time_update::{FixedTimeUpdate, DEFAULT_TICK_RATE};
pub use self::policy::SchedulerErrorPolicy;
pub use self::relative_time_update::{RelativeTimeUpdate, REMAINDER_THRESHOLD};
pub use self::shutdown::Shutdown;
pub use self::startup::Startup;
pub use self::system::{System, SystemSet};
pub use self::update::Update;

use crate::core::Core;

/// A typed container of systems with its own invocation rule.
///
/// Implementors embed a [`SchedulerBase`] and decide in
/// [`run_systems`](Scheduler::run_systems) how many passes to make over it.
/// Methods take `&self`; state that changes while running lives in `Cell`s.
pub trait Scheduler: 'static {
    /// The shared system lists, policy and flags.
    fn base(&self) -> &SchedulerBase;

    /// Runs the scheduler once for the current tick. The default makes a
    /// single pass over the enabled systems.
    fn run_systems(&self, core: &mut Core) -> anyhow::Result<()> {
        self.base().run_pass(core)
    }
}

/// Identifies a scheduler type.
#[derive(Clone, Copy)]
pub struct SchedulerKey {
    id: TypeId,
    name: &'static str,
}

impl SchedulerKey {
    /// The key of scheduler type `S`.
    pub fn of<S: Scheduler>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: type_name::<S>(),
        }
    }

    /// The scheduler's type name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for SchedulerKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SchedulerKey {}

impl Hash for SchedulerKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for SchedulerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
