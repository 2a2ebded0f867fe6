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

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Namespace for name-derived identifiers.
const RESOURCE_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2b8e_94d3_4a57_b0e2_7c15_d3a8_e941);

/// A globally unique, persistent identifier for a logical resource.
///
/// This GUID represents the "idea" of a resource, completely decoupled from
/// any file path. It is the key under which caches store handles, so resources
/// can be moved, renamed or rebuilt without breaking references to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(Uuid);

impl ResourceId {
    /// Creates a new, random (version 4) `ResourceId`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derives a deterministic (version 5) `ResourceId` from a name.
    ///
    /// The same name always yields the same identifier, which makes it
    /// convenient for built-in resources and tests (`"mesh:42"`).
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&RESOURCE_NAMESPACE, name.as_bytes()))
    }

    /// Wraps an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The null identifier. It never addresses a resource.
    pub const fn null() -> Self {
        Self(Uuid::nil())
    }

    /// Returns `true` for the null identifier.
    pub fn is_null(&self) -> bool {
        self.0.is_nil()
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ResourceId {
    /// Creates a new, random (version 4) `ResourceId`.
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0.hyphenated())
    }
}

impl FromStr for ResourceId {
    type Err = uuid::Error;

    /// Parses both the braced form produced by `Display` and a bare UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(trimmed);
        Uuid::parse_str(inner).map(Self)
    }
}

impl From<Uuid> for ResourceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
