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

//! The ResourceManager resolves identifiers into live, typed resources.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::Level;
use parking_lot::{ReentrantMutex, RwLock};
use traktor_core::resource::{
    HandleLease, IdProxy, InvalidationEvent, InvalidationQueue, InvalidationSender, Proxy,
    Resource, ResourceCache, ResourceError, ResourceHandle, ResourceId, ResourceObject,
    ResourceType, Retention,
};
use traktor_data::resources::ResourceStorage;

use super::bundle::{PreloadedBundle, ResourceBundle};
use super::config::ResourceManagerConfig;
use super::factory::{AnyResourceFactory, ResourceFactory, ResourceFactoryRegistry};

/// A snapshot of the manager's cache contents and activity counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceManagerStatistics {
    /// Loaded handles with [`Retention::Cached`].
    pub resident_count: usize,
    /// Loaded handles with [`Retention::Uncached`].
    pub exclusive_count: usize,
    /// Mapped handles currently holding no object.
    pub empty_count: usize,
    /// Objects created on a miss or for a flushed handle.
    pub loads: u64,
    /// Binds served without calling a factory.
    pub hits: u64,
    /// Objects re-created in place.
    pub reloads: u64,
    /// Factory calls that returned an error.
    pub failures: u64,
}

#[derive(Default)]
struct Counters {
    loads: AtomicU64,
    hits: AtomicU64,
    reloads: AtomicU64,
    failures: AtomicU64,
}

/// The public-facing façade of the resource system.
///
/// Resolves a [`ResourceId`] into a [`Proxy`] by probing the cache, invoking
/// the factory registered for the requested type on a miss, and caching the
/// resulting handle. Concurrent binds of the same identifier create the object
/// once. Factories may bind their own dependencies from inside `create`.
pub struct ResourceManager {
    config: ResourceManagerConfig,
    cache: Arc<dyn ResourceCache>,
    factories: RwLock<ResourceFactoryRegistry>,
    /// Serializes factory calls; re-entrant so factories can bind dependencies.
    load_lock: ReentrantMutex<()>,
    invalidations: InvalidationQueue,
    counters: Counters,
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new(ResourceManagerConfig::default())
    }
}

impl ResourceManager {
    /// Creates a manager backed by its own [`ResourceStorage`].
    pub fn new(config: ResourceManagerConfig) -> Self {
        Self::with_cache(Arc::new(ResourceStorage::new()), config)
    }

    /// Creates a manager over an existing cache, e.g. a level's
    /// `DualResourceCache` layered on a shared storage.
    pub fn with_cache(cache: Arc<dyn ResourceCache>, config: ResourceManagerConfig) -> Self {
        Self {
            config,
            cache,
            factories: RwLock::new(ResourceFactoryRegistry::default()),
            load_lock: ReentrantMutex::new(()),
            invalidations: InvalidationQueue::new(),
            counters: Counters::default(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &ResourceManagerConfig {
        &self.config
    }

    /// The cache this manager resolves through.
    pub fn cache(&self) -> &Arc<dyn ResourceCache> {
        &self.cache
    }

    /// Registers the factory producing resources of type `R`.
    ///
    /// A previously registered factory for `R` is replaced.
    pub fn add_factory<R: Resource>(&self, factory: impl ResourceFactory<R> + 'static) {
        let replaced = self.factories.write().register::<R>(factory);
        if replaced {
            log::warn!(
                "Replaced the factory for resource type {}.",
                ResourceType::of::<R>()
            );
        } else {
            log::debug!("Registered factory for resource type {}.", ResourceType::of::<R>());
        }
    }

    /// Unregisters the factory for `R`. Returns `true` if one was registered.
    ///
    /// Resources already created stay valid; they just cannot be reloaded.
    pub fn remove_factory<R: Resource>(&self) -> bool {
        self.factories
            .write()
            .unregister(&ResourceType::of::<R>())
    }

    /// Returns `true` if a factory for `R` is registered.
    pub fn has_factory<R: Resource>(&self) -> bool {
        self.factories.read().contains(&ResourceType::of::<R>())
    }

    /// Resolves `id` into a typed proxy, creating the resource if needed.
    ///
    /// # Errors
    /// - [`ResourceError::NullId`] for the null identifier.
    /// - [`ResourceError::TypeMismatch`] if `id` is already bound to another type.
    /// - [`ResourceError::NoFactory`] on a miss with no factory for `R`.
    /// - [`ResourceError::CreationFailed`] if the factory fails. The handle is left empty.
    pub fn bind<R: Resource>(&self, id: &ResourceId) -> Result<Proxy<R>, ResourceError> {
        let lease = self.resolve(id, ResourceType::of::<R>())?;
        Ok(Proxy::from_lease(*id, lease))
    }

    /// Binds a proxy that carries its own identifier.
    pub fn bind_id_proxy<R: Resource>(&self, proxy: &mut IdProxy<R>) -> Result<(), ResourceError> {
        let bound = self.bind::<R>(&proxy.id())?;
        proxy.attach(bound);
        Ok(())
    }

    /// Binds every resource of `bundle` up front.
    ///
    /// Stops at the first failure; resources created before it stay cached.
    pub fn preload(&self, bundle: &ResourceBundle) -> Result<PreloadedBundle, ResourceError> {
        let mut preloaded = PreloadedBundle::default();
        for (id, resource_type) in bundle.entries() {
            let lease = self.resolve(id, *resource_type)?;
            preloaded.push(*id, lease);
        }
        log::log!(self.log_level(), "Preloaded {} resources.", preloaded.len());
        Ok(preloaded)
    }

    /// Re-creates the object of an existing handle in place.
    ///
    /// The factory receives the current object. With `flushed_only`, handles
    /// that still hold an object are left alone. Uncached handles nobody holds
    /// are skipped. Returns `true` if the handle received a new object.
    pub fn reload(&self, id: &ResourceId, flushed_only: bool) -> bool {
        match self.cache.get(id) {
            Some(handle) => self.reload_handle(id, &handle, flushed_only),
            None => false,
        }
    }

    /// Reloads every cached handle of type `R`. Returns the number reloaded.
    pub fn reload_type<R: Resource>(&self, flushed_only: bool) -> usize {
        self.handles_of(ResourceType::of::<R>())
            .filter(|(id, handle)| self.reload_handle(id, handle, flushed_only))
            .count()
    }

    /// Flushes the object of every loaded handle of type `R`.
    ///
    /// Handles stay mapped, so live proxies observe the flush and a later
    /// bind or `reload_type::<R>(true)` brings the objects back.
    pub fn unload_type<R: Resource>(&self) -> usize {
        let mut unloaded = 0;
        for (_, handle) in self.handles_of(ResourceType::of::<R>()) {
            if handle.is_loaded() {
                handle.flush();
                unloaded += 1;
            }
        }
        log::log!(
            self.log_level(),
            "Unloaded {unloaded} resources of type {}.",
            ResourceType::of::<R>()
        );
        unloaded
    }

    /// Drops cached handles no consumer holds. Returns the number unloaded.
    ///
    /// A handle's object is only flushed once the cache really forgot it, so
    /// entries served from the secondary tier of a dual cache stay intact.
    /// A handle leased by a concurrent bind in the meantime is mapped again
    /// and keeps its object.
    pub fn unload_unused(&self) -> usize {
        // No handle can be created for an id while its mapping is briefly gone.
        let _guard = self.load_lock.lock();
        let mut unloaded = 0;
        for (id, handle) in self.cache.entries() {
            if handle.retention() != Retention::Cached || handle.lease_count() > 0 {
                continue;
            }
            self.cache.flush(&id);
            if let Some(still_mapped) = self.cache.get(&id) {
                if still_mapped.ptr_eq(&handle) {
                    continue;
                }
            }
            if handle.flush_if_unused() {
                unloaded += 1;
            } else {
                log::trace!("{id} was bound while unloading, keeping it.");
                self.cache.put(id, handle);
            }
        }
        if unloaded > 0 {
            log::log!(self.log_level(), "Unloaded {unloaded} unused resources.");
        }
        unloaded
    }

    /// Removes `id` from the cache. Live proxies keep their handle.
    pub fn flush(&self, id: &ResourceId) {
        self.cache.flush(id);
    }

    /// Removes every mapping from the cache.
    pub fn flush_all(&self) {
        self.cache.flush_all();
    }

    /// A sender through which any thread can request invalidations.
    pub fn invalidation_sender(&self) -> InvalidationSender {
        self.invalidations.sender()
    }

    /// Handles pending invalidation events. Returns the number handled.
    ///
    /// At most `max_invalidations_per_update` events are taken per call; the
    /// rest wait for the next one.
    pub fn process_invalidations(&self) -> usize {
        let budget = match self.config.max_invalidations_per_update {
            0 => usize::MAX,
            max => max,
        };
        let mut handled = 0;
        while handled < budget {
            let Some(event) = self.invalidations.try_next() else {
                break;
            };
            self.apply_invalidation(event);
            handled += 1;
        }
        handled
    }

    /// A snapshot of the cache contents and counters.
    pub fn statistics(&self) -> ResourceManagerStatistics {
        let mut stats = ResourceManagerStatistics {
            loads: self.counters.loads.load(Ordering::Relaxed),
            hits: self.counters.hits.load(Ordering::Relaxed),
            reloads: self.counters.reloads.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            ..Default::default()
        };
        for (_, handle) in self.cache.entries() {
            match (handle.is_loaded(), handle.retention()) {
                (false, _) => stats.empty_count += 1,
                (true, Retention::Cached) => stats.resident_count += 1,
                (true, Retention::Uncached) => stats.exclusive_count += 1,
            }
        }
        stats
    }

    fn log_level(&self) -> Level {
        if self.config.verbose {
            Level::Info
        } else {
            Level::Debug
        }
    }

    fn apply_invalidation(&self, event: InvalidationEvent) {
        log::log!(self.log_level(), "Applying invalidation {event:?}.");
        match event {
            InvalidationEvent::Modified(id) => {
                self.reload(&id, false);
            }
            InvalidationEvent::Flush(id) => {
                if let Some(handle) = self.cache.get(&id) {
                    handle.flush();
                }
            }
            InvalidationEvent::Evict(id) => self.cache.flush(&id),
            InvalidationEvent::EvictAll => self.cache.flush_all(),
        }
    }

    fn resolve(
        &self,
        id: &ResourceId,
        resource_type: ResourceType,
    ) -> Result<HandleLease, ResourceError> {
        if id.is_null() {
            return Err(ResourceError::NullId);
        }

        if let Some(lease) = self.lookup(id, resource_type)? {
            if lease.handle().is_loaded() {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(lease);
            }
        }

        let _guard = self.load_lock.lock();

        // Another thread may have created the object while we waited.
        match self.lookup(id, resource_type)? {
            Some(lease) if lease.handle().is_loaded() => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Ok(lease)
            }
            Some(lease) => {
                let factory = self.factory(resource_type)?;
                let object = self.create(factory.as_ref(), id, resource_type, None)?;
                lease.handle().replace_object(object);
                self.counters.loads.fetch_add(1, Ordering::Relaxed);
                Ok(lease)
            }
            None => {
                let factory = self.factory(resource_type)?;
                let handle = ResourceHandle::new(resource_type, factory.retention());
                let lease = handle.acquire();
                let object = self.create(factory.as_ref(), id, resource_type, None)?;
                handle.replace_object(object);
                self.cache.put(*id, handle);
                self.counters.loads.fetch_add(1, Ordering::Relaxed);
                Ok(lease)
            }
        }
    }

    fn lookup(
        &self,
        id: &ResourceId,
        resource_type: ResourceType,
    ) -> Result<Option<HandleLease>, ResourceError> {
        match self.cache.get(id) {
            Some(handle) if handle.resource_type() != resource_type => {
                Err(ResourceError::TypeMismatch {
                    id: *id,
                    expected: resource_type.name(),
                    found: handle.resource_type().name(),
                })
            }
            Some(handle) => Ok(Some(handle.acquire())),
            None => Ok(None),
        }
    }

    fn factory(
        &self,
        resource_type: ResourceType,
    ) -> Result<Arc<dyn AnyResourceFactory>, ResourceError> {
        self.factories
            .read()
            .get(&resource_type)
            .ok_or(ResourceError::NoFactory {
                resource_type: resource_type.name(),
            })
    }

    fn create(
        &self,
        factory: &dyn AnyResourceFactory,
        id: &ResourceId,
        resource_type: ResourceType,
        current: Option<&ResourceObject>,
    ) -> Result<ResourceObject, ResourceError> {
        log::log!(self.log_level(), "Creating {resource_type} {id}.");
        factory.create_any(self, id, current).map_err(|source| {
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
            log::error!("Factory failed to create {resource_type} {id}: {source}");
            ResourceError::CreationFailed {
                id: *id,
                resource_type: resource_type.name(),
                source,
            }
        })
    }

    fn reload_handle(&self, id: &ResourceId, handle: &ResourceHandle, flushed_only: bool) -> bool {
        if flushed_only && handle.is_loaded() {
            return false;
        }
        if handle.retention() == Retention::Uncached && handle.lease_count() == 0 {
            return false;
        }
        let resource_type = handle.resource_type();
        let Ok(factory) = self.factory(resource_type) else {
            log::warn!("No factory registered for {resource_type}, cannot reload {id}.");
            return false;
        };

        let _guard = self.load_lock.lock();
        // Another reload may have refilled or released the handle while we waited.
        if flushed_only && handle.is_loaded() {
            return false;
        }
        if handle.retention() == Retention::Uncached && handle.lease_count() == 0 {
            return false;
        }
        // Keeps an uncached object alive for the duration of the reload.
        let _lease = handle.acquire();
        let current = handle.get();
        match self.create(factory.as_ref(), id, resource_type, current.as_ref()) {
            Ok(object) => {
                handle.replace_object(object);
                self.counters.reloads.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => false,
        }
    }

    fn handles_of(
        &self,
        resource_type: ResourceType,
    ) -> impl Iterator<Item = (ResourceId, ResourceHandle)> {
        self.cache
            .entries()
            .into_iter()
            .filter(move |(_, handle)| handle.resource_type() == resource_type)
    }
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("config", &self.config)
            .field("pending_invalidations", &self.invalidations.len())
            .finish()
    }
}
