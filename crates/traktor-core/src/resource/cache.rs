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

use super::{ResourceHandle, ResourceId};
use std::sync::Arc;

/// A keyed container mapping resource identifiers to handles.
///
/// Caches are shared behind `Arc<dyn ResourceCache>` (one cache may be a tier
/// of several composite caches), so every operation takes `&self` and
/// implementations synchronise internally.
///
/// Absence is never an error: lookups return `None` and flushing a missing
/// identifier is a no-op.
pub trait ResourceCache: Send + Sync {
    /// Maps `id` to `handle`, overwriting any existing mapping.
    fn put(&self, id: ResourceId, handle: ResourceHandle);

    /// Returns the handle mapped to `id`.
    ///
    /// After `put(id, h)` this returns `h` itself (same slot) until another
    /// `put` or `flush` touches `id`.
    fn get(&self, id: &ResourceId) -> Option<ResourceHandle>;

    /// Removes the mapping for `id`, if present.
    fn flush(&self, id: &ResourceId);

    /// Removes every mapping.
    fn flush_all(&self);

    /// A snapshot of every `(id, handle)` pair visible through [`ResourceCache::get`].
    fn entries(&self) -> Vec<(ResourceId, ResourceHandle)>;

    /// Returns `true` if `other` is one of this cache's tiers, at any depth.
    ///
    /// Single-tier caches reference nothing.
    fn references(&self, _other: &Arc<dyn ResourceCache>) -> bool {
        false
    }
}

/// Returns `true` if both values point at the same cache instance.
pub fn same_cache(a: &Arc<dyn ResourceCache>, b: &Arc<dyn ResourceCache>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Returns `true` if `a` and `b` are the same cache or one contains the other.
pub fn caches_overlap(a: &Arc<dyn ResourceCache>, b: &Arc<dyn ResourceCache>) -> bool {
    same_cache(a, b) || a.references(b) || b.references(a)
}
