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

//! # Squared Core
//!
//! Foundational crate containing the engine-agnostic building blocks the
//! runtime is assembled from: ordered callable storage with stable IDs,
//! dependency ordering, thread-safe event channels and logging setup.

#![warn(missing_docs)]

pub mod event;
pub mod function;
pub mod graph;
pub mod logging;

pub use event::EventBus;
pub use function::{FunctionContainer, FunctionId};

#[doc(hidden)]
pub use log as __log;
