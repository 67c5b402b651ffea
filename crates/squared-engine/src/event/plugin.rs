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

use super::manager::{process_events, EventManager};
use crate::core::Core;
use crate::plugin::Plugin;
use crate::scheduler::{FixedTimeUpdate, RelativeTimeUpdate, Update};

/// Installs an [`EventManager`] resource and drains its queues in
/// [`Update`], [`FixedTimeUpdate`] and [`RelativeTimeUpdate`].
///
/// Callbacks bound to any other scheduler are delivered once
/// `process_events::<S>` is registered in that scheduler.
#[derive(Debug, Default)]
pub struct EventPlugin;

impl Plugin for EventPlugin {
    fn bind(&mut self, core: &mut Core) -> anyhow::Result<()> {
        if !core.has_resource::<EventManager>() {
            core.register_resource(EventManager::new())?;
        }
        core.register_system_in::<Update, _>(process_events::<Update>)?;
        core.register_system_in::<FixedTimeUpdate, _>(process_events::<FixedTimeUpdate>)?;
        core.register_system_in::<RelativeTimeUpdate, _>(process_events::<RelativeTimeUpdate>)?;
        log::debug!("Event processing installed.");
        Ok(())
    }
}
