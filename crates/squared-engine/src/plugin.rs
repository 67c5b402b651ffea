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

//! Plugins extend the core with resources, schedulers, systems and hooks.

use std::any::Any;

use crate::core::Core;
use crate::error::PluginError;

/// A unit of engine extension.
///
/// The core binds each plugin type once. `bind` may register resources,
/// schedulers, systems and scheduler edges, attach component hooks, and pull
/// in other plugins with [`Core::require_plugins`]. The plugin is recorded as
/// present before `bind` runs, so mutually requiring plugins terminate.
pub trait Plugin: Any {
    /// Installs the plugin into `core`.
    fn bind(&mut self, core: &mut Core) -> anyhow::Result<()>;
}

/// A tuple of default-constructible plugins added together, in order.
pub trait PluginSet {
    /// Adds each plugin of the set to `core`.
    fn add_to(core: &mut Core) -> Result<(), PluginError>;
}

macro_rules! impl_plugin_set {
    ($($P:ident),*) => {
        impl<$($P: Plugin + Default),*> PluginSet for ($($P,)*) {
            fn add_to(core: &mut Core) -> Result<(), PluginError> {
                $(core.add_plugin($P::default())?;)*
                Ok(())
            }
        }
    };
}

impl_plugin_set!(A);
impl_plugin_set!(A, B);
impl_plugin_set!(A, B, C);
impl_plugin_set!(A, B, C, D);
impl_plugin_set!(A, B, C, D, E);
impl_plugin_set!(A, B, C, D, E, F);
