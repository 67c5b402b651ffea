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

//! Error types raised by the engine runtime.
//!
//! Systems, hooks and plugins report failures as [`anyhow::Error`]; the typed
//! errors below are what the engine itself produces and what callers match
//! on after a `downcast_ref`.

use squared_core::graph::CycleError;

use crate::ecs::Entity;

/// Problems with scheduler registration and ordering.
///
/// A `SchedulerError` returned by a system is fatal: it bypasses the error
/// policy of the running scheduler and aborts the tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// The scheduler type has not been registered with the core.
    #[error("scheduler `{0}` is not registered")]
    NotRegistered(&'static str),
    /// A scheduler of this type already exists.
    #[error("scheduler `{0}` is already registered")]
    AlreadyRegistered(&'static str),
    /// The ordering graph contains a cycle.
    #[error("the scheduler graph contains a cycle")]
    Cycle,
    /// Adding the requested edge would close a cycle.
    #[error("running `{before}` before `{after}` would create a cycle")]
    WouldCycle {
        /// The scheduler asked to run first.
        before: &'static str,
        /// The scheduler asked to run second.
        after: &'static str,
    },
}

impl From<CycleError> for SchedulerError {
    fn from(_: CycleError) -> Self {
        SchedulerError::Cycle
    }
}

/// Problems with the resource store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    /// No resource of the requested type exists. Fatal when returned by a system.
    #[error("missing resource `{0}`")]
    Missing(&'static str),
    /// A resource of this type is already registered.
    #[error("resource `{0}` is already registered")]
    AlreadyRegistered(&'static str),
}

/// Problems with entity and component operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// The handle is null, destroyed, or from an older generation.
    #[error("invalid entity {0}")]
    InvalidEntity(Entity),
    /// A construct hook removed the component it was notified about.
    #[error("component `{component}` was removed from {entity} by a construct hook")]
    ComponentRemovedByHook {
        /// The entity the component was emplaced on.
        entity: Entity,
        /// The component type name.
        component: &'static str,
    },
}

/// A plugin failed to bind.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// The plugin's `bind` returned an error.
    #[error("failed to bind plugin `{plugin}`")]
    Bind {
        /// The plugin type name.
        plugin: &'static str,
        /// What went wrong.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

/// Returns `true` for errors that must abort the tick regardless of the
/// scheduler's error policy.
pub(crate) fn is_fatal(error: &anyhow::Error) -> bool {
    error.downcast_ref::<SchedulerError>().is_some()
        || matches!(
            error.downcast_ref::<ResourceError>(),
            Some(ResourceError::Missing(_))
        )
}
