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

//! Typed consumer references to resource handles.

use super::{HandleLease, Resource, ResourceHandle, ResourceId};
use std::{fmt, marker::PhantomData, sync::Arc};

/// A typed, leased reference to a [`ResourceHandle`].
///
/// A proxy shares ownership of the *handle*, not of the raw object: every
/// `replace` or `flush` on the handle is visible through [`Proxy::get`].
/// Holding a proxy keeps an uncached resource alive.
pub struct Proxy<T: Resource> {
    id: ResourceId,
    lease: HandleLease,
    seen_generation: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Resource> Proxy<T> {
    /// Leases `handle` on behalf of a consumer of resource `id`.
    pub fn new(id: ResourceId, handle: &ResourceHandle) -> Self {
        Self::from_lease(id, handle.acquire())
    }

    /// Wraps a lease the caller already holds.
    pub fn from_lease(id: ResourceId, lease: HandleLease) -> Self {
        let seen_generation = lease.handle().generation();
        Self {
            id,
            lease,
            seen_generation,
            _marker: PhantomData,
        }
    }

    /// The identifier this proxy was bound to.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// The underlying handle.
    pub fn handle(&self) -> &ResourceHandle {
        self.lease.handle()
    }

    /// The live object, or `None` while the handle is flushed.
    pub fn get(&self) -> Option<Arc<T>> {
        self.handle().get_as::<T>()
    }

    /// Returns `true` if the object was replaced or flushed since the last
    /// [`Proxy::consume`] (or since the proxy was created).
    pub fn changed(&self) -> bool {
        self.handle().generation() != self.seen_generation
    }

    /// Marks the current object as seen.
    pub fn consume(&mut self) {
        self.seen_generation = self.handle().generation();
    }
}

impl<T: Resource> Clone for Proxy<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            lease: self.lease.clone(),
            seen_generation: self.seen_generation,
            _marker: PhantomData,
        }
    }
}

impl<T: Resource> fmt::Debug for Proxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("id", &self.id)
            .field("handle", self.handle())
            .finish()
    }
}

/// A proxy that carries its identifier before being bound.
///
/// Scene and settings data store `IdProxy` values; the resource manager binds
/// them when the owning object is instantiated.
pub struct IdProxy<T: Resource> {
    id: ResourceId,
    proxy: Option<Proxy<T>>,
}

impl<T: Resource> IdProxy<T> {
    /// Creates an unbound proxy for `id`.
    pub fn new(id: ResourceId) -> Self {
        Self { id, proxy: None }
    }

    /// The identifier of the referenced resource.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Attaches a bound proxy. Its identifier must match.
    pub fn attach(&mut self, proxy: Proxy<T>) {
        debug_assert_eq!(proxy.id(), self.id);
        self.proxy = Some(proxy);
    }

    /// Drops the bound proxy, keeping the identifier.
    pub fn detach(&mut self) {
        self.proxy = None;
    }

    /// Returns `true` once a proxy has been attached.
    pub fn is_bound(&self) -> bool {
        self.proxy.is_some()
    }

    /// The bound proxy, if any.
    pub fn proxy(&self) -> Option<&Proxy<T>> {
        self.proxy.as_ref()
    }

    /// The live object, or `None` while unbound or flushed.
    pub fn get(&self) -> Option<Arc<T>> {
        self.proxy.as_ref().and_then(Proxy::get)
    }
}

impl<T: Resource> Clone for IdProxy<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            proxy: self.proxy.clone(),
        }
    }
}

impl<T: Resource> Default for IdProxy<T> {
    /// An unbound proxy to the null identifier.
    fn default() -> Self {
        Self::new(ResourceId::null())
    }
}

impl<T: Resource> fmt::Debug for IdProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdProxy")
            .field("id", &self.id)
            .field("bound", &self.proxy.is_some())
            .finish()
    }
}
