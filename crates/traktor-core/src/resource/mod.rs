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

//! Provides the foundational traits and primitive types for Traktor's resource system.
//!
//! This module defines the "common language" shared by everything that loads,
//! caches or consumes engine resources (meshes, shaders, sounds, effects...).
//!
//! The key components are:
//! - The [`Resource`] trait: a marker for every type the system may hold.
//! - [`ResourceId`]: a stable identifier, independent of storage location.
//! - [`ResourceHandle`]: a shareable slot holding at most one live instance.
//! - [`ResourceCache`]: the keyed container contract implemented by storage crates.
//! - [`Proxy`] / [`IdProxy`]: typed consumer references to a handle.
//! - [`InvalidationQueue`]: the channel through which hot-reload sources speak.

mod cache;
mod error;
mod handle;
mod id;
mod invalidation;
mod proxy;

pub use cache::*;
pub use error::*;
pub use handle::*;
pub use id::*;
pub use invalidation::*;
pub use proxy::*;

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A marker trait for types that can be managed by the resource system.
///
/// The supertraits enforce the guarantees the system relies on:
/// - `Send` + `Sync`: resources are shared between consumers and may be
///   produced on background loader threads.
/// - `Any` (hence `'static`): handles store resources type-erased and recover
///   the concrete type at the typed boundary.
///
/// # Examples
///
/// ```
/// use traktor_core::resource::Resource;
///
/// struct Mesh {
///     vertex_count: u32,
/// }
///
/// impl Resource for Mesh {}
/// ```
pub trait Resource: Any + Send + Sync {}

/// A type-erased live resource instance, shared between a handle and its readers.
pub type ResourceObject = Arc<dyn Any + Send + Sync>;

/// Identifies the concrete type a handle is allowed to hold.
#[derive(Clone, Copy)]
pub struct ResourceType {
    id: TypeId,
    name: &'static str,
}

impl ResourceType {
    /// Returns the descriptor of the resource type `R`.
    pub fn of<R: Resource>() -> Self {
        Self {
            id: TypeId::of::<R>(),
            name: std::any::type_name::<R>(),
        }
    }

    /// The `TypeId` of the concrete type.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// The fully qualified name of the concrete type, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if `object` is an instance of this type.
    pub fn matches(&self, object: &ResourceObject) -> bool {
        (**object).type_id() == self.id
    }
}

impl PartialEq for ResourceType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ResourceType {}

impl Hash for ResourceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
