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

//! Core configuration.

use serde::{Deserialize, Serialize};
use squared_core::logging::LogConfig;

use crate::scheduler::{SchedulerErrorPolicy, DEFAULT_TICK_RATE};

/// Settings applied when a [`Core`](crate::Core) is built.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use squared_engine::CoreConfig;
///
/// let config = CoreConfig::from_json(r#"{ "fixed_tick_rate": 0.01 }"#).unwrap();
/// assert_eq!(config.fixed_tick_rate, 0.01);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Error policy of the built-in schedulers.
    pub error_policy: SchedulerErrorPolicy,
    /// Seconds between two `FixedTimeUpdate` runs.
    pub fixed_tick_rate: f32,
    /// Target step of `RelativeTimeUpdate`.
    pub relative_tick_rate: f32,
    /// When set, the core installs the global logger with these settings.
    pub log: Option<LogConfig>,
}

impl CoreConfig {
    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            error_policy: SchedulerErrorPolicy::default(),
            fixed_tick_rate: DEFAULT_TICK_RATE,
            relative_tick_rate: DEFAULT_TICK_RATE,
            log: None,
        }
    }
}
