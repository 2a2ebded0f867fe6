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

//! Resource factories and the registry that erases their types.

use super::ResourceManager;
use std::{collections::HashMap, error::Error, marker::PhantomData, sync::Arc};
use traktor_core::resource::{Resource, ResourceId, ResourceObject, ResourceType, Retention};

/// The error a factory reports when it cannot produce a resource.
pub type FactoryError = Box<dyn Error + Send + Sync>;

/// Produces live instances of a specific resource type `R`.
///
/// Implementors own their data source (a database, a pack file, generated
/// content). The manager calls [`ResourceFactory::create`] on a cache miss,
/// when a flushed handle is accessed again, and on reload.
pub trait ResourceFactory<R: Resource>: Send + Sync {
    /// How long handles of `R` keep their object.
    ///
    /// Cached resources stay resident until flushed; uncached ones are
    /// dropped as soon as their last consumer lets go.
    fn retention(&self) -> Retention {
        Retention::Cached
    }

    /// Creates the resource `id`.
    ///
    /// # Arguments
    /// - `manager`: the calling manager, used to bind dependencies.
    /// - `id`: the requested identifier.
    /// - `current`: the object being replaced when reloading, if any.
    fn create(
        &self,
        manager: &ResourceManager,
        id: &ResourceId,
        current: Option<&R>,
    ) -> Result<R, FactoryError>;
}

/// A factory built from a closure. See [`factory_fn`].
pub struct FnFactory<R, F> {
    create: F,
    retention: Retention,
    _marker: PhantomData<fn() -> R>,
}

impl<R, F> FnFactory<R, F> {
    /// Makes the produced resources uncached.
    pub fn uncached(mut self) -> Self {
        self.retention = Retention::Uncached;
        self
    }
}

/// Wraps a closure into a cached [`ResourceFactory`].
pub fn factory_fn<R, F>(create: F) -> FnFactory<R, F>
where
    R: Resource,
    F: Fn(&ResourceManager, &ResourceId, Option<&R>) -> Result<R, FactoryError> + Send + Sync,
{
    FnFactory {
        create,
        retention: Retention::Cached,
        _marker: PhantomData,
    }
}

impl<R, F> ResourceFactory<R> for FnFactory<R, F>
where
    R: Resource,
    F: Fn(&ResourceManager, &ResourceId, Option<&R>) -> Result<R, FactoryError> + Send + Sync,
{
    fn retention(&self) -> Retention {
        self.retention
    }

    fn create(
        &self,
        manager: &ResourceManager,
        id: &ResourceId,
        current: Option<&R>,
    ) -> Result<R, FactoryError> {
        (self.create)(manager, id, current)
    }
}

/// Internal trait for producing any resource type.
pub(crate) trait AnyResourceFactory: Send + Sync {
    fn retention(&self) -> Retention;

    fn create_any(
        &self,
        manager: &ResourceManager,
        id: &ResourceId,
        current: Option<&ResourceObject>,
    ) -> Result<ResourceObject, FactoryError>;
}

/// Adapts a typed `ResourceFactory<R>` to `AnyResourceFactory`.
struct ResourceFactoryWrapper<R, F>(F, PhantomData<fn() -> R>);

impl<R: Resource, F: ResourceFactory<R>> AnyResourceFactory for ResourceFactoryWrapper<R, F> {
    fn retention(&self) -> Retention {
        self.0.retention()
    }

    fn create_any(
        &self,
        manager: &ResourceManager,
        id: &ResourceId,
        current: Option<&ResourceObject>,
    ) -> Result<ResourceObject, FactoryError> {
        let current = current.and_then(|object| object.downcast_ref::<R>());
        let resource: R = self.0.create(manager, id, current)?;
        Ok(Arc::new(resource))
    }
}

/// Maps each resource type to the factory producing it.
#[derive(Default)]
pub(crate) struct ResourceFactoryRegistry {
    factories: HashMap<ResourceType, Arc<dyn AnyResourceFactory>>,
}

impl ResourceFactoryRegistry {
    /// Registers `factory` for `R`, returning `true` if it replaced another one.
    pub(crate) fn register<R: Resource>(
        &mut self,
        factory: impl ResourceFactory<R> + 'static,
    ) -> bool {
        let wrapped = ResourceFactoryWrapper(factory, PhantomData);
        self.factories
            .insert(ResourceType::of::<R>(), Arc::new(wrapped))
            .is_some()
    }

    /// Removes the factory for `resource_type`, returning `true` if there was one.
    pub(crate) fn unregister(&mut self, resource_type: &ResourceType) -> bool {
        self.factories.remove(resource_type).is_some()
    }

    /// The factory for `resource_type`.
    ///
    /// Returned by value so callers can release the registry before creating,
    /// since factories re-enter the manager.
    pub(crate) fn get(&self, resource_type: &ResourceType) -> Option<Arc<dyn AnyResourceFactory>> {
        self.factories.get(resource_type).cloned()
    }

    pub(crate) fn contains(&self, resource_type: &ResourceType) -> bool {
        self.factories.contains_key(resource_type)
    }
}
