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

//! Groups of resources bound up front.

use traktor_core::resource::{HandleLease, Resource, ResourceHandle, ResourceId, ResourceType};

/// A list of typed identifiers to load together, e.g. everything a level needs.
#[derive(Debug, Clone, Default)]
pub struct ResourceBundle {
    entries: Vec<(ResourceId, ResourceType)>,
}

impl ResourceBundle {
    /// Creates an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds resource `id` of type `R`.
    pub fn with<R: Resource>(mut self, id: ResourceId) -> Self {
        self.push::<R>(id);
        self
    }

    /// Adds resource `id` of type `R`.
    pub fn push<R: Resource>(&mut self, id: ResourceId) {
        self.entries.push((id, ResourceType::of::<R>()));
    }

    /// The bundled identifiers with their types.
    pub fn entries(&self) -> &[(ResourceId, ResourceType)] {
        &self.entries
    }

    /// Number of bundled resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the bundle is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The result of preloading a [`ResourceBundle`].
///
/// Holds a lease on every bundled handle; uncached resources stay alive until
/// this value is dropped.
#[derive(Debug, Default)]
pub struct PreloadedBundle {
    leases: Vec<(ResourceId, HandleLease)>,
}

impl PreloadedBundle {
    pub(crate) fn push(&mut self, id: ResourceId, lease: HandleLease) {
        self.leases.push((id, lease));
    }

    /// Number of held resources.
    pub fn len(&self) -> usize {
        self.leases.len()
    }

    /// Returns `true` if nothing is held.
    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }

    /// The held handle for `id`, if it was part of the bundle.
    pub fn get(&self, id: &ResourceId) -> Option<&ResourceHandle> {
        self.leases
            .iter()
            .find(|(held, _)| held == id)
            .map(|(_, lease)| lease.handle())
    }

    /// Iterates over the held handles.
    pub fn handles(&self) -> impl Iterator<Item = (ResourceId, &ResourceHandle)> {
        self.leases.iter().map(|(id, lease)| (*id, lease.handle()))
    }
}
