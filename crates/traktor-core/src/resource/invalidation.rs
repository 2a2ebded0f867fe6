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

use super::ResourceId;

/// A request from an invalidation source (file watcher, editor, console).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationEvent {
    /// The resource's source data changed; re-create it in place.
    Modified(ResourceId),
    /// Clear the live object but keep the handle mapped.
    Flush(ResourceId),
    /// Remove the resource's mapping from the cache.
    Evict(ResourceId),
    /// Remove every mapping from the cache.
    EvictAll,
}

/// Sending end of an [`InvalidationQueue`]. Cheap to clone, usable from any thread.
pub type InvalidationSender = flume::Sender<InvalidationEvent>;

/// A thread-safe, unbounded channel of [`InvalidationEvent`]s.
///
/// Any number of sources publish; the owner of the resource manager drains
/// the queue at a point where re-creating resources is safe.
#[derive(Debug)]
pub struct InvalidationQueue {
    sender: flume::Sender<InvalidationEvent>,
    receiver: flume::Receiver<InvalidationEvent>,
}

impl InvalidationQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    /// Publishes an event.
    pub fn publish(&self, event: InvalidationEvent) {
        log::trace!("Queued invalidation {event:?}.");
        // The queue owns its receiver, so the channel is never disconnected here.
        let _ = self.sender.send(event);
    }

    /// Returns a new sender for an external invalidation source.
    pub fn sender(&self) -> InvalidationSender {
        self.sender.clone()
    }

    /// Takes the next pending event without blocking.
    pub fn try_next(&self) -> Option<InvalidationEvent> {
        self.receiver.try_recv().ok()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns `true` if no event is pending.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for InvalidationQueue {
    fn default() -> Self {
        Self::new()
    }
}
