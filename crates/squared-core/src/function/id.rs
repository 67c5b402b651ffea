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

use std::any::TypeId;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A stable identifier for a stored callable.
///
/// Identifiers are derived from the callable's [`TypeId`]. Every closure
/// expression and every free function has its own type in Rust, so two
/// different closures never collide, while adding the same free function
/// twice produces the same ID. Callables that are erased to plain function
/// pointers share one type; use [`FunctionId::from_ptr`] for those.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(u64);

impl FunctionId {
    /// Derives the identifier of the callable type `F`.
    pub fn of<F: ?Sized + 'static>() -> Self {
        let mut hasher = DefaultHasher::new();
        TypeId::of::<F>().hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Derives the identifier of the type of `callable`.
    pub fn of_val<F: 'static>(_callable: &F) -> Self {
        Self::of::<F>()
    }

    /// Derives an identifier from a function pointer address.
    pub fn from_ptr(address: usize) -> Self {
        let mut hasher = DefaultHasher::new();
        address.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Wraps a raw identifier value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_function() -> u8 {
        1
    }

    fn other_free_function() -> u8 {
        2
    }

    #[test]
    fn same_free_function_has_same_id() {
        assert_eq!(FunctionId::of_val(&free_function), FunctionId::of_val(&free_function));
        assert_ne!(
            FunctionId::of_val(&free_function),
            FunctionId::of_val(&other_free_function)
        );
    }

    #[test]
    fn distinct_closures_have_distinct_ids() {
        let a = || 1;
        let b = || 1;
        assert_ne!(FunctionId::of_val(&a), FunctionId::of_val(&b));
    }

    #[test]
    fn pointer_ids_follow_the_address() {
        let first = (free_function as fn() -> u8) as usize;
        let second = (other_free_function as fn() -> u8) as usize;
        assert_eq!(FunctionId::from_ptr(first), FunctionId::from_ptr(first));
        assert_ne!(FunctionId::from_ptr(first), FunctionId::from_ptr(second));
    }

    #[test]
    fn raw_round_trips() {
        let id = FunctionId::from_raw(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.to_string(), "0x000000000000002a");
    }
}
