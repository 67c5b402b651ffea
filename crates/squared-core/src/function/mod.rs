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

//! Ordered storage for callables addressed by a stable [`FunctionId`].
//!
//! The engine keeps systems, component hooks and event callbacks in
//! [`FunctionContainer`]s. Each entry carries an identifier derived from the
//! callable's type, which is what allows a caller to unregister a callback
//! later and what makes a second add of the same callable a no-op.

mod container;
mod id;

pub use self::container::FunctionContainer;
pub use self::id::FunctionId;
