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

//! Primary/secondary cache tiering.

use std::collections::HashSet;
use std::sync::Arc;
use traktor_core::resource::{
    caches_overlap, same_cache, CacheConfigError, ResourceCache, ResourceHandle, ResourceId,
};

/// Composes two caches into one logical tier with asymmetric read/write policy.
///
/// - `put` always targets the primary cache.
/// - `get` probes the primary first, then the secondary; the primary wins.
/// - `flush` and `flush_all` only affect the primary.
///
/// The secondary's lifetime belongs to someone else. A host keeps one
/// long-lived cache for resources shared across levels and gives each level
/// a `DualResourceCache` whose primary is that level's own cache: unloading
/// the level flushes its primary without evicting the shared resources.
///
/// Unset tiers behave as empty caches.
#[derive(Default)]
pub struct DualResourceCache {
    primary: Option<Arc<dyn ResourceCache>>,
    secondary: Option<Arc<dyn ResourceCache>>,
}

impl DualResourceCache {
    /// Creates a dual cache over `primary` and `secondary`.
    ///
    /// # Errors
    /// Returns [`CacheConfigError::OverlappingTiers`] if both tiers are the same
    /// cache or one contains the other.
    pub fn new(
        primary: Arc<dyn ResourceCache>,
        secondary: Arc<dyn ResourceCache>,
    ) -> Result<Self, CacheConfigError> {
        let mut cache = Self::default();
        cache.set_primary_cache(primary)?;
        cache.set_secondary_cache(secondary)?;
        Ok(cache)
    }

    /// Replaces the primary tier.
    ///
    /// # Errors
    /// Returns [`CacheConfigError::OverlappingTiers`] if `cache` overlaps the
    /// current secondary tier. The configuration is left unchanged.
    pub fn set_primary_cache(
        &mut self,
        cache: Arc<dyn ResourceCache>,
    ) -> Result<(), CacheConfigError> {
        if let Some(secondary) = &self.secondary {
            if caches_overlap(&cache, secondary) {
                return Err(CacheConfigError::OverlappingTiers);
            }
        }
        self.primary = Some(cache);
        Ok(())
    }

    /// Replaces the secondary tier.
    ///
    /// # Errors
    /// Returns [`CacheConfigError::OverlappingTiers`] if `cache` overlaps the
    /// current primary tier. The configuration is left unchanged.
    pub fn set_secondary_cache(
        &mut self,
        cache: Arc<dyn ResourceCache>,
    ) -> Result<(), CacheConfigError> {
        if let Some(primary) = &self.primary {
            if caches_overlap(primary, &cache) {
                return Err(CacheConfigError::OverlappingTiers);
            }
        }
        self.secondary = Some(cache);
        Ok(())
    }

    /// The primary tier, if set.
    pub fn primary_cache(&self) -> Option<&Arc<dyn ResourceCache>> {
        self.primary.as_ref()
    }

    /// The secondary tier, if set.
    pub fn secondary_cache(&self) -> Option<&Arc<dyn ResourceCache>> {
        self.secondary.as_ref()
    }
}

impl ResourceCache for DualResourceCache {
    fn put(&self, id: ResourceId, handle: ResourceHandle) {
        match &self.primary {
            Some(primary) => primary.put(id, handle),
            None => log::warn!("DualResourceCache has no primary cache, dropping {id}."),
        }
    }

    fn get(&self, id: &ResourceId) -> Option<ResourceHandle> {
        // Primary is authoritative so an override always shadows a stale secondary entry.
        self.primary
            .as_ref()
            .and_then(|primary| primary.get(id))
            .or_else(|| self.secondary.as_ref().and_then(|secondary| secondary.get(id)))
    }

    fn flush(&self, id: &ResourceId) {
        if let Some(primary) = &self.primary {
            primary.flush(id);
        }
    }

    fn flush_all(&self) {
        if let Some(primary) = &self.primary {
            primary.flush_all();
        }
    }

    fn entries(&self) -> Vec<(ResourceId, ResourceHandle)> {
        let mut entries = self
            .primary
            .as_ref()
            .map(|primary| primary.entries())
            .unwrap_or_default();
        if let Some(secondary) = &self.secondary {
            let shadowed: HashSet<ResourceId> = entries.iter().map(|(id, _)| *id).collect();
            entries.extend(
                secondary
                    .entries()
                    .into_iter()
                    .filter(|(id, _)| !shadowed.contains(id)),
            );
        }
        entries
    }

    fn references(&self, other: &Arc<dyn ResourceCache>) -> bool {
        [&self.primary, &self.secondary]
            .into_iter()
            .flatten()
            .any(|tier| same_cache(tier, other) || tier.references(other))
    }
}

impl std::fmt::Debug for DualResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualResourceCache")
            .field("primary", &self.primary.is_some())
            .field("secondary", &self.secondary.is_some())
            .finish()
    }
}
