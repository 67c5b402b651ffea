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

//! Defines the entity handle.

use std::fmt;

use serde::{Deserialize, Serialize};

const INDEX_BITS: u32 = 20;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;
const VERSION_MASK: u32 = 0xFFF;

/// A 32-bit handle identifying an entity in a [`Registry`](super::Registry).
///
/// The low 20 bits hold the slot index and the high 12 bits a version that is
/// bumped whenever the slot is recycled, so a stale handle never compares
/// equal to the handle that reuses its index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(u32);

impl Entity {
    /// The "no entity" value.
    pub const NULL: Entity = Entity(u32::MAX);

    /// The largest index a live entity can use. The all-ones index is
    /// reserved for [`Entity::NULL`].
    pub const MAX_INDEX: u32 = INDEX_MASK - 1;

    pub(crate) fn new(index: u32, version: u16) -> Self {
        debug_assert!(index <= Self::MAX_INDEX);
        Self((index & INDEX_MASK) | ((u32::from(version) & VERSION_MASK) << INDEX_BITS))
    }

    /// Returns the slot index.
    pub fn index(self) -> u32 {
        self.0 & INDEX_MASK
    }

    /// Returns the recycling version.
    pub fn version(self) -> u16 {
        (self.0 >> INDEX_BITS) as u16
    }

    /// Returns `true` for [`Entity::NULL`].
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    /// Returns the raw 32-bit value.
    pub fn to_bits(self) -> u32 {
        self.0
    }

    /// Rebuilds a handle from [`Entity::to_bits`].
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The version the slot takes after this entity is destroyed.
    ///
    /// Versions wrap modulo `0xFFF`, so a live handle never equals `NULL`.
    pub(crate) fn next_version(self) -> u16 {
        ((u32::from(self.version()) + 1) % VERSION_MASK) as u16
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("Entity(null)")
        } else {
            write!(f, "Entity({}v{})", self.index(), self.version())
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
