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

//! Acts as the agent for the resource subsystem.
//!
//! This module provides the high-level logic of resource management: the
//! public-facing [`ResourceManager`] resolves identifiers into typed proxies,
//! delegating production to registered [`ResourceFactory`] implementations
//! and retention to a [`traktor_core::resource::ResourceCache`].
//!
//! The manager is an ordinary value. Construct one, register factories, and
//! pass it by reference to whatever needs resources; factories themselves
//! receive it to resolve their own dependencies.

mod bundle;
mod config;
mod factory;
mod manager;

pub use bundle::{PreloadedBundle, ResourceBundle};
pub use config::ResourceManagerConfig;
pub use factory::{factory_fn, FactoryError, FnFactory, ResourceFactory};
pub use manager::{ResourceManager, ResourceManagerStatistics};
