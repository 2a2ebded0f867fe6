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
use std::{error::Error, fmt};

/// An error raised while resolving a resource identifier into a live object.
///
/// Caches and handles never fail; these errors only come out of the
/// resource manager façade.
#[derive(Debug)]
pub enum ResourceError {
    /// The null identifier was used to request a resource.
    NullId,
    /// No factory is registered for the requested resource type.
    NoFactory {
        /// Name of the requested type.
        resource_type: &'static str,
    },
    /// The identifier is already bound to a handle of another type.
    TypeMismatch {
        /// The requested identifier.
        id: ResourceId,
        /// Name of the requested type.
        expected: &'static str,
        /// Name of the type held by the existing handle.
        found: &'static str,
    },
    /// The factory failed to produce the object.
    CreationFailed {
        /// The requested identifier.
        id: ResourceId,
        /// Name of the requested type.
        resource_type: &'static str,
        /// The factory's own error.
        source: Box<dyn Error + Send + Sync>,
    },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NullId => write!(f, "Cannot resolve the null resource identifier."),
            ResourceError::NoFactory { resource_type } => {
                write!(f, "No factory registered for resource type {resource_type}.")
            }
            ResourceError::TypeMismatch {
                id,
                expected,
                found,
            } => write!(
                f,
                "Resource {id} requested as {expected} but already bound as {found}."
            ),
            ResourceError::CreationFailed {
                id,
                resource_type,
                source,
            } => write!(f, "Failed to create {resource_type} {id}: {source}"),
        }
    }
}

impl Error for ResourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ResourceError::CreationFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// An error raised when configuring a tiered cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheConfigError {
    /// The primary and secondary tiers would be the same cache, or one would
    /// contain the other.
    OverlappingTiers,
}

impl fmt::Display for CacheConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheConfigError::OverlappingTiers => write!(
                f,
                "Primary and secondary caches must be distinct and must not contain each other."
            ),
        }
    }
}

impl Error for CacheConfigError {}
