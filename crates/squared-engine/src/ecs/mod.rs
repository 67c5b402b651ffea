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

//! The entity-component half of the engine.
//!
//! Entities are 32-bit handles, components are plain Rust values stored in
//! one [`SparseSet`] per type, and the [`Registry`] owns both. Component
//! lifecycle hooks let plugins attach native state to components as they are
//! constructed and tear it down before they are destroyed.

mod component;
mod entity;
mod registry;
mod sparse_set;
mod view;

pub use self::component::Component;
pub use self::entity::Entity;
pub use self::registry::{Hook, Registry};
pub use self::sparse_set::SparseSet;
pub use self::view::{ComponentSet, View};
