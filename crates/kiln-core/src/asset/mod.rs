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

//! Identity primitives and descriptors for procedural assets.
//!
//! This module defines the "common language" used to name things across the
//! runtime:
//! - [`ComponentGuid`]: the stable identity of one asset instance.
//! - [`NodeId`]: the transient handle of the instance's remote-engine node.
//! - [`CorrelationToken`]: the marker for an outstanding remote request.
//! - [`ObjectId`]: the identity of a host-application object referenced by
//!   inputs and outputs.
//! - [`AssetDefinition`]: a descriptor of a procedural-asset library entry.
//!
//! None of these types know how an asset is instantiated or cooked; they are
//! the primitives higher-level crates build the instance runtime on.

mod definition;
mod id;

pub use definition::*;
pub use id::*;
