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

//! # Kiln Core
//!
//! Foundational crate containing the core types and interface contracts of
//! the Kiln procedural-asset runtime: instance identity, the asset lifecycle
//! vocabulary, change-tracking capabilities, layered configuration, and the
//! collaborator seams (timer scheduling) the runtime depends on.
//!
//! This crate has no knowledge of concrete entities or of the remote cook
//! engine; those live in higher-level crates.

#![warn(missing_docs)]

pub mod asset;
pub mod change;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod timer;

pub use error::CoreError;
pub use lifecycle::{AssetState, CookedDataStatus, StateResult};
