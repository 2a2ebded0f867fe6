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

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the [`super::ResourceManager`].
///
/// Every field has a default, so a RON file only needs to name the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceManagerConfig {
    /// Log factory calls at `info` level instead of `debug`.
    pub verbose: bool,
    /// Maximum number of invalidation events handled per
    /// [`super::ResourceManager::process_invalidations`] call.
    /// Zero drains the whole queue.
    pub max_invalidations_per_update: usize,
}

impl Default for ResourceManagerConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            max_invalidations_per_update: 64,
        }
    }
}

impl ResourceManagerConfig {
    /// Parses a configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Serializes the configuration to pretty RON text.
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Loads a configuration from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read resource config {}", path.display()))?;
        Self::from_ron_str(&text)
            .with_context(|| format!("Failed to parse resource config {}", path.display()))
    }
}
