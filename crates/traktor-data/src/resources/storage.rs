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

//! A single-tier, thread-safe resource cache.

use parking_lot::RwLock;
use std::collections::HashMap;
use traktor_core::resource::{ResourceCache, ResourceHandle, ResourceId};

/// A central, in-memory cache mapping a [`ResourceId`] to its [`ResourceHandle`].
///
/// Holds at most one handle per identifier. Subsequent lookups of the same
/// identifier return the same handle, so the resource behind it is loaded
/// once and shared by every consumer.
#[derive(Default)]
pub struct ResourceStorage {
    storage: RwLock<HashMap<ResourceId, ResourceHandle>>,
}

impl ResourceStorage {
    /// Creates a new, empty storage.
    pub fn new() -> Self {
        Self {
            storage: RwLock::new(HashMap::new()),
        }
    }

    /// Checks if a handle is mapped to `id`.
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.storage.read().contains_key(id)
    }

    /// Number of mapped identifiers.
    pub fn len(&self) -> usize {
        self.storage.read().len()
    }

    /// Returns `true` if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.storage.read().is_empty()
    }
}

impl ResourceCache for ResourceStorage {
    fn put(&self, id: ResourceId, handle: ResourceHandle) {
        log::trace!("Caching {} {id}.", handle.resource_type());
        self.storage.write().insert(id, handle);
    }

    fn get(&self, id: &ResourceId) -> Option<ResourceHandle> {
        self.storage.read().get(id).cloned()
    }

    fn flush(&self, id: &ResourceId) {
        if self.storage.write().remove(id).is_some() {
            log::trace!("Flushed {id} from cache.");
        }
    }

    fn flush_all(&self) {
        let flushed = std::mem::take(&mut *self.storage.write());
        log::trace!("Flushed {} resources from cache.", flushed.len());
    }

    fn entries(&self) -> Vec<(ResourceId, ResourceHandle)> {
        self.storage
            .read()
            .iter()
            .map(|(id, handle)| (*id, handle.clone()))
            .collect()
    }
}

impl std::fmt::Debug for ResourceStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStorage")
            .field("len", &self.len())
            .finish()
    }
}
