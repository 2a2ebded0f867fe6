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

use super::{Resource, ResourceObject, ResourceType};
use parking_lot::RwLock;
use std::{fmt, sync::Arc};

/// How long a handle keeps its live object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Retention {
    /// The object persists until the handle is explicitly flushed.
    Cached,
    /// The object is dropped as soon as the last lease is released.
    Uncached,
}

/// The live object slot, one variant per retention policy.
enum Payload {
    Cached {
        object: Option<ResourceObject>,
    },
    Uncached {
        object: Option<ResourceObject>,
        /// `false` both before the first load and after the last release.
        in_use: bool,
    },
}

impl Payload {
    fn object(&self) -> Option<&ResourceObject> {
        match self {
            Payload::Cached { object } | Payload::Uncached { object, .. } => object.as_ref(),
        }
    }

    fn take(&mut self) -> Option<ResourceObject> {
        match self {
            Payload::Cached { object } | Payload::Uncached { object, .. } => object.take(),
        }
    }
}

struct Slot {
    payload: Payload,
    leases: usize,
    generation: u64,
}

struct HandleInner {
    resource_type: ResourceType,
    slot: RwLock<Slot>,
}

/// A shareable, lazily-populated slot holding at most one live resource instance.
///
/// Cloning a handle is cheap and yields another reference to the *same* slot:
/// the cache and every consumer observe the same `replace` and `flush` calls.
///
/// External (non-cache) holders announce themselves with [`ResourceHandle::acquire`].
/// For [`Retention::Uncached`] handles, releasing the last such lease drops the
/// object while the handle itself stays valid, so identifier lookups remain stable.
#[derive(Clone)]
pub struct ResourceHandle(Arc<HandleInner>);

impl ResourceHandle {
    /// Creates an empty handle for objects of `resource_type`.
    pub fn new(resource_type: ResourceType, retention: Retention) -> Self {
        let payload = match retention {
            Retention::Cached => Payload::Cached { object: None },
            Retention::Uncached => Payload::Uncached {
                object: None,
                in_use: false,
            },
        };
        Self(Arc::new(HandleInner {
            resource_type,
            slot: RwLock::new(Slot {
                payload,
                leases: 0,
                generation: 0,
            }),
        }))
    }

    /// Creates an empty cached handle for `R`.
    pub fn cached<R: Resource>() -> Self {
        Self::new(ResourceType::of::<R>(), Retention::Cached)
    }

    /// Creates an empty uncached handle for `R`.
    pub fn uncached<R: Resource>() -> Self {
        Self::new(ResourceType::of::<R>(), Retention::Uncached)
    }

    /// The type of object this handle may hold.
    pub fn resource_type(&self) -> ResourceType {
        self.0.resource_type
    }

    /// The retention policy chosen at creation.
    pub fn retention(&self) -> Retention {
        match self.0.slot.read().payload {
            Payload::Cached { .. } => Retention::Cached,
            Payload::Uncached { .. } => Retention::Uncached,
        }
    }

    /// Installs a new live instance, discarding the previous one.
    pub fn replace<R: Resource>(&self, object: Arc<R>) {
        self.replace_object(object);
    }

    /// Type-erased form of [`ResourceHandle::replace`].
    ///
    /// An object whose concrete type differs from [`ResourceHandle::resource_type`]
    /// is refused and the handle left untouched.
    ///
    /// An uncached handle replaced while nobody holds a lease keeps the object
    /// (a background loader may finish before its consumer acquires). It is
    /// released when the next lease cycle ends, or by [`ResourceHandle::flush`].
    pub fn replace_object(&self, object: ResourceObject) {
        if !self.0.resource_type.matches(&object) {
            log::error!(
                "Refusing to install an object of the wrong type into a handle of {}.",
                self.0.resource_type
            );
            return;
        }

        let previous = {
            let mut guard = self.0.slot.write();
            let slot = &mut *guard;
            let previous = match &mut slot.payload {
                Payload::Cached { object: current } => current.replace(object),
                Payload::Uncached {
                    object: current,
                    in_use,
                } => {
                    *in_use = true;
                    current.replace(object)
                }
            };
            slot.generation += 1;
            previous
        };
        // Heavy payloads are dropped outside the lock.
        drop(previous);
    }

    /// Returns the current live instance, if any.
    pub fn get(&self) -> Option<ResourceObject> {
        self.0.slot.read().payload.object().cloned()
    }

    /// Returns the current live instance downcast to `R`.
    ///
    /// `None` when the handle is empty or holds another type.
    pub fn get_as<R: Resource>(&self) -> Option<Arc<R>> {
        self.get().and_then(|object| object.downcast::<R>().ok())
    }

    /// Returns `true` if the handle currently holds an object.
    pub fn is_loaded(&self) -> bool {
        self.0.slot.read().payload.object().is_some()
    }

    /// Clears the live instance unconditionally.
    ///
    /// Subsequent calls to [`ResourceHandle::get`] return `None` until the next replace.
    pub fn flush(&self) {
        let previous = {
            let mut slot = self.0.slot.write();
            let previous = slot.payload.take();
            if previous.is_some() {
                slot.generation += 1;
            }
            previous
        };
        drop(previous);
    }

    /// Clears the live instance only if no lease is outstanding.
    ///
    /// The lease count is checked under the same lock that clears the object,
    /// so a holder acquiring concurrently either keeps the object or sees the
    /// flush before it leases. Returns `true` if the handle was flushed.
    pub fn flush_if_unused(&self) -> bool {
        let previous = {
            let mut slot = self.0.slot.write();
            if slot.leases > 0 {
                return false;
            }
            let previous = slot.payload.take();
            if previous.is_some() {
                slot.generation += 1;
            }
            previous
        };
        drop(previous);
        true
    }

    /// Registers an external holder.
    ///
    /// The returned lease keeps an uncached handle's object alive; dropping it
    /// releases the hold.
    pub fn acquire(&self) -> HandleLease {
        self.0.slot.write().leases += 1;
        HandleLease {
            handle: self.clone(),
        }
    }

    fn release(&self) {
        let released = {
            let mut guard = self.0.slot.write();
            let slot = &mut *guard;
            slot.leases = slot.leases.saturating_sub(1);
            if slot.leases > 0 {
                None
            } else if let Payload::Uncached { object, in_use } = &mut slot.payload {
                *in_use = false;
                let released = object.take();
                if released.is_some() {
                    slot.generation += 1;
                }
                released
            } else {
                None
            }
        };
        if released.is_some() {
            log::trace!(
                "Last holder of an uncached {} released, dropping its object.",
                self.0.resource_type
            );
        }
    }

    /// Whether the handle is currently in use.
    ///
    /// Uncached handles report their `in_use` flag: set by a replace, cleared
    /// when the last lease is released. Cached handles report whether any
    /// lease is outstanding.
    pub fn in_use(&self) -> bool {
        let slot = self.0.slot.read();
        match slot.payload {
            Payload::Cached { .. } => slot.leases > 0,
            Payload::Uncached { in_use, .. } => in_use,
        }
    }

    /// Number of outstanding leases.
    pub fn lease_count(&self) -> usize {
        self.0.slot.read().leases
    }

    /// Counter bumped every time the held object identity changes.
    pub fn generation(&self) -> u64 {
        self.0.slot.read().generation
    }

    /// Returns `true` if both values refer to the same handle.
    pub fn ptr_eq(&self, other: &ResourceHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.0.slot.read();
        let retention = match slot.payload {
            Payload::Cached { .. } => Retention::Cached,
            Payload::Uncached { .. } => Retention::Uncached,
        };
        f.debug_struct("ResourceHandle")
            .field("resource_type", &self.0.resource_type)
            .field("retention", &retention)
            .field("loaded", &slot.payload.object().is_some())
            .field("leases", &slot.leases)
            .field("generation", &slot.generation)
            .finish()
    }
}

/// An RAII hold on a [`ResourceHandle`] by an external consumer.
///
/// Dropping the last lease of an uncached handle releases its object.
#[must_use = "dropping a lease immediately releases the hold on the handle"]
pub struct HandleLease {
    handle: ResourceHandle,
}

impl HandleLease {
    /// The held handle.
    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }
}

impl Clone for HandleLease {
    fn clone(&self) -> Self {
        self.handle.acquire()
    }
}

impl Drop for HandleLease {
    fn drop(&mut self) {
        self.handle.release();
    }
}

impl fmt::Debug for HandleLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandleLease").field(&self.handle).finish()
    }
}
