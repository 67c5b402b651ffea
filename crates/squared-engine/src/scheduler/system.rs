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

use squared_core::FunctionId;

use crate::core::Core;

/// A stored system.
pub type System = Box<dyn FnMut(&mut Core) -> anyhow::Result<()>>;

/// A tuple of systems registered together, in tuple order.
///
/// Implemented for tuples of one to eight callables. Each element gets the
/// [`FunctionId`] of its own type.
pub trait SystemSet {
    /// Converts the tuple into identified, boxed systems.
    fn into_systems(self) -> Vec<(FunctionId, System)>;
}

macro_rules! impl_system_set {
    ($($F:ident),*) => {
        impl<$($F),*> SystemSet for ($($F,)*)
        where
            $($F: FnMut(&mut Core) -> anyhow::Result<()> + 'static),*
        {
            #[allow(non_snake_case)]
            fn into_systems(self) -> Vec<(FunctionId, System)> {
                let ($($F,)*) = self;
                vec![$((FunctionId::of::<$F>(), Box::new($F) as System)),*]
            }
        }
    };
}

impl_system_set!(A);
impl_system_set!(A, B);
impl_system_set!(A, B, C);
impl_system_set!(A, B, C, D);
impl_system_set!(A, B, C, D, E);
impl_system_set!(A, B, C, D, E, F);
impl_system_set!(A, B, C, D, E, F, G);
impl_system_set!(A, B, C, D, E, F, G, H);
