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

use anyhow::Result;
use parking_lot::Mutex;
use std::error::Error;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;
use tempfile::tempdir;
use traktor_agents::resource_agent::{
    factory_fn, ResourceBundle, ResourceManager, ResourceManagerConfig,
};
use traktor_core::resource::{
    HandleLease, InvalidationEvent, Proxy, Resource, ResourceCache, ResourceError,
    ResourceHandle, ResourceId,
};
use traktor_data::resources::ResourceStorage;

// --- Test Setup: Dummy resources and factories ---
#[derive(Debug, PartialEq)]
struct Mesh {
    vertex_count: u32,
}
impl Resource for Mesh {}

#[derive(Debug)]
struct Effect {
    name: String,
}
impl Resource for Effect {}

struct Material {
    albedo: Proxy<Mesh>,
}
impl Resource for Material {}

/// A manager with a counting Mesh factory (cached) and Effect factory (uncached).
fn manager_with_counters() -> (ResourceManager, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let manager = ResourceManager::default();
    let mesh_calls = Arc::new(AtomicUsize::new(0));
    let effect_calls = Arc::new(AtomicUsize::new(0));

    let calls = mesh_calls.clone();
    manager.add_factory::<Mesh>(factory_fn(
        move |_: &ResourceManager, _: &ResourceId, _: Option<&Mesh>| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Mesh { vertex_count: 36 })
        },
    ));

    let calls = effect_calls.clone();
    manager.add_factory::<Effect>(
        factory_fn(move |_: &ResourceManager, id: &ResourceId, _: Option<&Effect>| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Effect {
                name: id.to_string(),
            })
        })
        .uncached(),
    );

    (manager, mesh_calls, effect_calls)
}

/// A cache whose `flush` lets a consumer lease the handle first, the way a
/// bind running on another thread would between the unused check and the flush.
#[derive(Default)]
struct LeaseOnFlushCache {
    inner: ResourceStorage,
    leased: Mutex<Vec<HandleLease>>,
}

impl ResourceCache for LeaseOnFlushCache {
    fn put(&self, id: ResourceId, handle: ResourceHandle) {
        self.inner.put(id, handle);
    }

    fn get(&self, id: &ResourceId) -> Option<ResourceHandle> {
        self.inner.get(id)
    }

    fn flush(&self, id: &ResourceId) {
        if let Some(handle) = self.inner.get(id) {
            self.leased.lock().push(handle.acquire());
        }
        self.inner.flush(id);
    }

    fn flush_all(&self) {
        self.inner.flush_all();
    }

    fn entries(&self) -> Vec<(ResourceId, ResourceHandle)> {
        self.inner.entries()
    }
}
// ---

#[test]
fn test_cached_resource_is_created_once_until_flushed() -> Result<()> {
    // --- 1. Setup ---
    let (manager, mesh_calls, _) = manager_with_counters();
    let id = ResourceId::from_name("mesh:42");

    // --- 2. Bind twice, dropping the first proxy in between ---
    let first = manager.bind::<Mesh>(&id)?;
    assert_eq!(first.get().unwrap().vertex_count, 36);
    drop(first);
    let second = manager.bind::<Mesh>(&id)?;

    // --- 3. Assert: cached objects survive without holders ---
    assert_eq!(mesh_calls.load(Ordering::SeqCst), 1);
    assert!(second.get().is_some());

    // --- 4. Flush and bind again ---
    manager.flush(&id);
    let third = manager.bind::<Mesh>(&id)?;

    assert_eq!(mesh_calls.load(Ordering::SeqCst), 2);
    assert!(!third.handle().ptr_eq(second.handle()));
    assert!(second.get().is_some(), "old holders keep the flushed handle");
    Ok(())
}

#[test]
fn test_uncached_resource_is_released_then_recreated() -> Result<()> {
    // --- 1. Setup ---
    let (manager, _, effect_calls) = manager_with_counters();
    let id = ResourceId::from_name("tempfx:7");

    // --- 2. Two consumers share one object ---
    let a = manager.bind::<Effect>(&id)?;
    let b = manager.bind::<Effect>(&id)?;
    assert!(a.handle().ptr_eq(b.handle()));
    assert_eq!(a.get().unwrap().name, id.to_string());
    assert_eq!(effect_calls.load(Ordering::SeqCst), 1);

    let handle = manager.cache().get(&id).expect("handle is cached");
    assert!(handle.in_use());

    // --- 3. Both release ---
    drop(a);
    assert!(handle.get().is_some(), "one holder left");
    drop(b);

    // --- 4. Assert: object gone, handle still resolvable ---
    assert!(handle.get().is_none());
    assert!(!handle.in_use());
    assert!(manager.cache().get(&id).unwrap().ptr_eq(&handle));

    // --- 5. Rebinding re-creates into the same handle ---
    let again = manager.bind::<Effect>(&id)?;
    assert!(again.handle().ptr_eq(&handle));
    assert!(again.get().is_some());
    assert!(handle.in_use());
    assert_eq!(effect_calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn test_concurrent_binds_create_once() {
    // --- 1. Setup: a slow factory ---
    let manager = ResourceManager::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    manager.add_factory::<Mesh>(factory_fn(
        move |_: &ResourceManager, _: &ResourceId, _: Option<&Mesh>| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            Ok(Mesh { vertex_count: 3 })
        },
    ));
    let id = ResourceId::from_name("mesh:contended");
    let barrier = Barrier::new(8);

    // --- 2. Bind from eight threads at once ---
    let (manager, barrier, id) = (&manager, &barrier, &id);
    let proxies: Vec<Proxy<Mesh>> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(move || {
                    barrier.wait();
                    manager.bind::<Mesh>(id).unwrap()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    // --- 3. Assert ---
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(proxies
        .iter()
        .all(|proxy| proxy.handle().ptr_eq(proxies[0].handle())));
    assert_eq!(proxies[0].handle().lease_count(), 8);
}

#[test]
fn test_factories_bind_dependencies_recursively() -> Result<()> {
    // --- 1. Setup: materials depend on meshes ---
    let (manager, mesh_calls, _) = manager_with_counters();
    let albedo_id = ResourceId::from_name("mesh:albedo");
    manager.add_factory::<Material>(factory_fn(
        move |manager: &ResourceManager, _: &ResourceId, _: Option<&Material>| {
            let albedo = manager.bind::<Mesh>(&albedo_id)?;
            Ok(Material { albedo })
        },
    ));

    // --- 2. Bind the material ---
    let material = manager.bind::<Material>(&ResourceId::from_name("material:rock"))?;

    // --- 3. Assert: the dependency was created and is shared ---
    let albedo = material.get().unwrap().albedo.get().unwrap();
    assert_eq!(albedo.vertex_count, 36);
    assert_eq!(mesh_calls.load(Ordering::SeqCst), 1);

    let direct = manager.bind::<Mesh>(&albedo_id)?;
    assert!(Arc::ptr_eq(&direct.get().unwrap(), &albedo));
    assert_eq!(mesh_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_hot_reload_through_invalidation_queue() -> Result<()> {
    // --- 1. Setup: the factory reads a "file version" ---
    let manager = ResourceManager::default();
    let version = Arc::new(AtomicU32::new(1));
    let source = version.clone();
    manager.add_factory::<Mesh>(factory_fn(
        move |_: &ResourceManager, _: &ResourceId, current: Option<&Mesh>| {
            if let Some(current) = current {
                assert_eq!(current.vertex_count, 1, "reload sees the live object");
            }
            Ok(Mesh {
                vertex_count: source.load(Ordering::SeqCst),
            })
        },
    ));
    let id = ResourceId::from_name("mesh:hot");
    let mut proxy = manager.bind::<Mesh>(&id)?;
    assert!(!proxy.changed());

    // --- 2. A watcher thread notices a change ---
    let sender = manager.invalidation_sender();
    version.store(2, Ordering::SeqCst);
    std::thread::spawn(move || sender.send(InvalidationEvent::Modified(id)))
        .join()
        .unwrap()?;

    // --- 3. The owner drains the queue ---
    assert_eq!(manager.process_invalidations(), 1);

    // --- 4. Assert: the live proxy sees the new object ---
    assert!(proxy.changed());
    assert_eq!(proxy.get().unwrap().vertex_count, 2);
    proxy.consume();
    assert!(!proxy.changed());
    assert_eq!(manager.statistics().reloads, 1);
    Ok(())
}

#[test]
fn test_flush_and_evict_invalidations() -> Result<()> {
    // --- 1. Setup ---
    let (manager, mesh_calls, _) = manager_with_counters();
    let id = ResourceId::from_name("mesh:1");
    let proxy = manager.bind::<Mesh>(&id)?;
    let sender = manager.invalidation_sender();

    // --- 2. Flush keeps the mapping, empties the handle ---
    sender.send(InvalidationEvent::Flush(id))?;
    manager.process_invalidations();
    assert!(proxy.get().is_none());
    assert!(manager.cache().get(&id).is_some());

    // --- 3. Binding refills the same handle ---
    let refilled = manager.bind::<Mesh>(&id)?;
    assert!(refilled.handle().ptr_eq(proxy.handle()));
    assert_eq!(mesh_calls.load(Ordering::SeqCst), 2);

    // --- 4. Evict removes the mapping ---
    sender.send(InvalidationEvent::Evict(id))?;
    manager.process_invalidations();
    assert!(manager.cache().get(&id).is_none());
    assert!(proxy.get().is_some(), "evicting never touches the handle");
    Ok(())
}

#[test]
fn test_error_reporting() -> Result<()> {
    // --- 1. Setup: one failing factory ---
    let (manager, _, _) = manager_with_counters();
    manager.add_factory::<Material>(factory_fn(
        |_: &ResourceManager, _: &ResourceId, _: Option<&Material>| Err("disk on fire".into()),
    ));

    // --- 2. No factory for the type ---
    struct Orphan;
    impl Resource for Orphan {}
    let err = manager
        .bind::<Orphan>(&ResourceId::from_name("orphan"))
        .unwrap_err();
    assert!(matches!(err, ResourceError::NoFactory { .. }));

    // --- 3. The id is already bound as another type ---
    let id = ResourceId::from_name("mesh:7");
    let _mesh = manager.bind::<Mesh>(&id)?;
    let err = manager.bind::<Effect>(&id).unwrap_err();
    assert!(matches!(err, ResourceError::TypeMismatch { .. }));

    // --- 4. The factory fails ---
    let material_id = ResourceId::from_name("material:broken");
    let err = manager.bind::<Material>(&material_id).unwrap_err();
    assert!(matches!(err, ResourceError::CreationFailed { .. }));
    assert_eq!(err.source().unwrap().to_string(), "disk on fire");
    assert!(manager.cache().get(&material_id).is_none());
    assert_eq!(manager.statistics().failures, 1);
    Ok(())
}

#[test]
fn test_statistics_and_unload_unused() -> Result<()> {
    // --- 1. Setup ---
    let (manager, _, _) = manager_with_counters();
    let held = manager.bind::<Mesh>(&ResourceId::from_name("mesh:held"))?;
    drop(manager.bind::<Mesh>(&ResourceId::from_name("mesh:idle"))?);
    let effect = manager.bind::<Effect>(&ResourceId::from_name("fx:spark"))?;
    drop(manager.bind::<Effect>(&ResourceId::from_name("fx:gone"))?);

    // --- 2. Assert the snapshot ---
    let stats = manager.statistics();
    assert_eq!(stats.resident_count, 2);
    assert_eq!(stats.exclusive_count, 1);
    assert_eq!(stats.empty_count, 1);
    assert_eq!(stats.loads, 4);

    // --- 3. Unload what nobody holds ---
    assert_eq!(manager.unload_unused(), 1);
    assert!(held.get().is_some());
    assert!(effect.get().is_some());
    assert!(manager
        .cache()
        .get(&ResourceId::from_name("mesh:idle"))
        .is_none());
    assert_eq!(manager.statistics().resident_count, 1);
    Ok(())
}

#[test]
fn test_preload_bundle_holds_resources() -> Result<()> {
    // --- 1. Setup ---
    let (manager, mesh_calls, effect_calls) = manager_with_counters();
    let mesh_id = ResourceId::from_name("mesh:level");
    let effect_id = ResourceId::from_name("fx:ambient");
    let bundle = ResourceBundle::new()
        .with::<Mesh>(mesh_id)
        .with::<Effect>(effect_id);

    // --- 2. Preload ---
    let preloaded = manager.preload(&bundle)?;

    // --- 3. Assert: everything is live while the bundle is held ---
    assert_eq!(preloaded.len(), 2);
    assert_eq!(mesh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(effect_calls.load(Ordering::SeqCst), 1);
    let effect = preloaded.get(&effect_id).unwrap().clone();
    assert!(effect.is_loaded());

    // Later binds are hits.
    let _mesh = manager.bind::<Mesh>(&mesh_id)?;
    assert_eq!(mesh_calls.load(Ordering::SeqCst), 1);

    // --- 4. Dropping the bundle releases uncached resources ---
    drop(preloaded);
    assert!(!effect.is_loaded());
    Ok(())
}

#[test]
fn test_config_from_ron_file() -> Result<()> {
    // --- 1. Setup: write a config to a temporary file ---
    let dir = tempdir()?;
    let path = dir.path().join("resources.ron");
    std::fs::write(&path, "(verbose: true, max_invalidations_per_update: 1)")?;

    // --- 2. Load it ---
    let config = ResourceManagerConfig::load(&path)?;
    let manager = ResourceManager::new(config);

    // --- 3. Assert: the budget limits invalidations per call ---
    assert!(manager.config().verbose);
    let sender = manager.invalidation_sender();
    sender.send(InvalidationEvent::EvictAll)?;
    sender.send(InvalidationEvent::EvictAll)?;
    assert_eq!(manager.process_invalidations(), 1);
    assert_eq!(manager.process_invalidations(), 1);

    // A missing file is an error with context.
    let missing = ResourceManagerConfig::load(dir.path().join("missing.ron"));
    assert!(missing.unwrap_err().to_string().contains("missing.ron"));
    Ok(())
}

#[test]
fn test_unload_unused_keeps_handles_leased_meanwhile() -> Result<()> {
    // --- 1. Setup: an idle mesh in a cache that leases it during the flush ---
    let cache = Arc::new(LeaseOnFlushCache::default());
    let manager = ResourceManager::with_cache(cache.clone(), ResourceManagerConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    manager.add_factory::<Mesh>(factory_fn(
        move |_: &ResourceManager, _: &ResourceId, _: Option<&Mesh>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Mesh { vertex_count: 8 })
        },
    ));
    let id = ResourceId::from_name("mesh:contested");
    drop(manager.bind::<Mesh>(&id)?);

    // --- 2. Unload while a consumer grabs the handle ---
    let unloaded = manager.unload_unused();

    // --- 3. Assert: the leased handle keeps its object and its mapping ---
    assert_eq!(unloaded, 0);
    let handle = cache.leased.lock()[0].handle().clone();
    assert!(handle.is_loaded());
    assert!(manager.cache().get(&id).unwrap().ptr_eq(&handle));

    let again = manager.bind::<Mesh>(&id)?;
    assert!(again.handle().ptr_eq(&handle));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_reload_skips_unheld_uncached_resources() -> Result<()> {
    // --- 1. Setup: an effect whose last holder is gone ---
    let (manager, _, effect_calls) = manager_with_counters();
    let id = ResourceId::from_name("fx:smoke");
    drop(manager.bind::<Effect>(&id)?);

    // --- 2. Every reload path leaves it alone ---
    assert!(!manager.reload(&id, false));
    assert_eq!(manager.reload_type::<Effect>(false), 0);
    manager
        .invalidation_sender()
        .send(InvalidationEvent::Modified(id))?;
    assert_eq!(manager.process_invalidations(), 1);

    // --- 3. Assert ---
    assert!(!manager.cache().get(&id).unwrap().is_loaded());
    assert_eq!(effect_calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.statistics().reloads, 0);

    // Once held again it reloads normally.
    let held = manager.bind::<Effect>(&id)?;
    assert!(manager.reload(&id, false));
    assert!(held.changed());
    assert_eq!(effect_calls.load(Ordering::SeqCst), 3);
    Ok(())
}

#[test]
fn test_zero_budget_drains_every_invalidation() -> Result<()> {
    // --- 1. Setup ---
    let manager = ResourceManager::new(ResourceManagerConfig {
        verbose: false,
        max_invalidations_per_update: 0,
    });
    let sender = manager.invalidation_sender();
    for _ in 0..200 {
        sender.send(InvalidationEvent::EvictAll)?;
    }

    // --- 2. Assert: one call handles the whole queue ---
    assert_eq!(manager.process_invalidations(), 200);
    assert_eq!(manager.process_invalidations(), 0);
    Ok(())
}

#[test]
fn test_concurrent_flushed_only_reloads_create_once() -> Result<()> {
    // --- 1. Setup: a flushed mesh and a slow factory ---
    let manager = ResourceManager::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    manager.add_factory::<Mesh>(factory_fn(
        move |_: &ResourceManager, _: &ResourceId, _: Option<&Mesh>| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            Ok(Mesh { vertex_count: 12 })
        },
    ));
    let proxy = manager.bind::<Mesh>(&ResourceId::from_name("mesh:flushed"))?;
    assert_eq!(manager.unload_type::<Mesh>(), 1);
    let barrier = Barrier::new(4);

    // --- 2. Refill from four threads at once ---
    let (manager_ref, barrier) = (&manager, &barrier);
    let reloaded: usize = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(move || {
                    barrier.wait();
                    manager_ref.reload_type::<Mesh>(true)
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).sum()
    });

    // --- 3. Assert: one reload, one factory call ---
    assert_eq!(reloaded, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(proxy.get().unwrap().vertex_count, 12);
    Ok(())
}
