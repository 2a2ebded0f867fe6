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

// Traktor Sandbox
// Walks a shared cache and two levels through load, unload and hot reload.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use traktor_agents::resource_agent::{
    factory_fn, ResourceBundle, ResourceManager, ResourceManagerConfig,
};
use traktor_core::resource::{InvalidationEvent, Resource, ResourceId};
use traktor_data::resources::{DualResourceCache, ResourceStorage};

#[derive(Debug)]
struct Mesh {
    name: String,
    revision: u32,
}
impl Resource for Mesh {}

#[derive(Debug)]
struct Effect {
    particles: usize,
}
impl Resource for Effect {}

/// Simulated on-disk revision of every mesh source file.
static MESH_REVISION: AtomicU32 = AtomicU32::new(1);

fn register_factories(manager: &ResourceManager) {
    manager.add_factory::<Mesh>(factory_fn(
        |_: &ResourceManager, id: &ResourceId, current: Option<&Mesh>| {
            if let Some(current) = current {
                log::info!("Rebuilding {} from revision {}.", current.name, current.revision);
            }
            Ok(Mesh {
                name: id.to_string(),
                revision: MESH_REVISION.load(Ordering::SeqCst),
            })
        },
    ));
    manager.add_factory::<Effect>(
        factory_fn(|_: &ResourceManager, _: &ResourceId, _: Option<&Effect>| {
            Ok(Effect { particles: 512 })
        })
        .uncached(),
    );
}

fn level(shared: &Arc<ResourceStorage>, config: &ResourceManagerConfig) -> Result<ResourceManager> {
    let cache = DualResourceCache::new(Arc::new(ResourceStorage::new()), shared.clone())
        .context("Failed to layer the level cache over the shared cache")?;
    let manager = ResourceManager::with_cache(Arc::new(cache), config.clone());
    register_factories(&manager);
    Ok(manager)
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => ResourceManagerConfig::load(path)?,
        None => ResourceManagerConfig {
            verbose: true,
            ..Default::default()
        },
    };

    // Resources every level uses live in the shared cache.
    let shared = Arc::new(ResourceStorage::new());
    let host = ResourceManager::with_cache(shared.clone(), config.clone());
    register_factories(&host);
    let skybox_id = ResourceId::from_name("mesh:skybox");
    let skybox = host.bind::<Mesh>(&skybox_id)?;

    // --- Level one ---
    let forest = level(&shared, &config)?;
    let bundle = ResourceBundle::new()
        .with::<Mesh>(ResourceId::from_name("mesh:tree"))
        .with::<Mesh>(skybox_id)
        .with::<Effect>(ResourceId::from_name("fx:fireflies"));
    let preloaded = forest.preload(&bundle)?;
    log::info!("Forest ready: {:?}", forest.statistics());

    let fireflies = forest.bind::<Effect>(&ResourceId::from_name("fx:fireflies"))?;
    if let Some(effect) = fireflies.get() {
        log::info!("Fireflies emit {} particles.", effect.particles);
    }

    // A file watcher notices the tree mesh changed on disk.
    let sender = forest.invalidation_sender();
    let watcher = std::thread::spawn(move || {
        MESH_REVISION.store(2, Ordering::SeqCst);
        sender.send(InvalidationEvent::Modified(ResourceId::from_name("mesh:tree")))
    });
    watcher
        .join()
        .map_err(|_| anyhow::anyhow!("Watcher thread panicked"))??;

    let mut tree = forest.bind::<Mesh>(&ResourceId::from_name("mesh:tree"))?;
    forest.process_invalidations();
    if tree.changed() {
        if let Some(mesh) = tree.get() {
            log::info!("{} hot reloaded to revision {}.", mesh.name, mesh.revision);
        }
        tree.consume();
    }

    // Unload the forest: drop every holder, then forget the level cache.
    drop((tree, fireflies, preloaded));
    let unloaded = forest.unload_unused();
    forest.flush_all();
    log::info!("Forest unloaded {unloaded} resources: {:?}", forest.statistics());

    // --- Level two reuses the shared skybox ---
    let desert = level(&shared, &config)?;
    let desert_sky = desert.bind::<Mesh>(&skybox_id)?;
    log::info!(
        "Desert shares the skybox: {}",
        desert_sky.handle().ptr_eq(skybox.handle())
    );
    log::info!("Desert: {:?}", desert.statistics());
    log::info!("Shared: {:?}", host.statistics());
    Ok(())
}
