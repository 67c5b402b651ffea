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

//! # Squared Engine
//!
//! The runtime of the engine: an entity-component [`Registry`] with
//! lifecycle hooks, typed resources, a dependency graph of schedulers with
//! per-scheduler error policies, plugins and an event manager, all owned by
//! the [`Core`] facade.
//!
//! The core is single-threaded. Worker threads talk to it through
//! [`EventSender`] handles.

#![warn(missing_docs)]

pub mod config;
pub mod core;
pub mod ecs;
pub mod error;
pub mod event;
pub mod plugin;
pub mod resource;
pub mod scheduler;
pub mod time;

pub use crate::config::CoreConfig;
pub use crate::core::{remove_temporary_components, Core};
pub use crate::ecs::{Component, ComponentSet, Entity, Registry};
pub use crate::error::{EcsError, PluginError, ResourceError, SchedulerError};
pub use crate::event::{process_events, EventManager, EventPlugin, EventSender};
pub use crate::plugin::{Plugin, PluginSet};
pub use crate::resource::ResourceStore;
pub use crate::scheduler::{
    FixedTimeUpdate, RelativeTimeUpdate, Scheduler, SchedulerBase, SchedulerErrorPolicy, Shutdown,
    Startup, Update,
};
pub use crate::time::{update_time, Time};
