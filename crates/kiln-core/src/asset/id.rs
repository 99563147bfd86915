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
use std::fmt;
use uuid::Uuid;

/// The process-wide unique identity of an asset instance.
///
/// This GUID is stable across save/reload and duplication and is completely
/// decoupled from the remote-engine node the instance may currently be bound
/// to ([`NodeId`]). It is the key under which the instance registry and the
/// dependency graph track the instance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ComponentGuid(Uuid);

impl ComponentGuid {
    /// Creates a new, random (version 4) `ComponentGuid`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ComponentGuid {
    /// Creates a new, random (version 4) `ComponentGuid`.
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ComponentGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identity of a host-application object referenced by an instance.
///
/// Inputs reference host objects (geometry, scene actors, terrains) and
/// outputs record the host objects they generated. The runtime never owns
/// these objects; it only tracks them by identity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Creates a new, random (version 4) `ObjectId`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    /// Creates a new, random (version 4) `ObjectId`.
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A token correlating one outstanding remote request with its completion.
///
/// The token exists only while an instantiate/cook/delete request is in
/// flight on the remote engine. Its presence on an instance *is* the test
/// for "this instance is currently busy talking to the remote engine"; the
/// runtime enforces at most one in-flight operation per instance through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationToken(Uuid);

impl CorrelationToken {
    /// Creates a new, random (version 4) `CorrelationToken`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationToken {
    /// Creates a new, random (version 4) `CorrelationToken`.
    fn default() -> Self {
        Self::new()
    }
}

/// The handle of an instance's node on the remote cook engine.
///
/// Assigned only while a live remote node exists; [`NodeId::INVALID`]
/// otherwise. Unlike [`ComponentGuid`] this handle is transient: it is
/// invalidated every time the instance is marked for reinstantiation and
/// reassigned by the next successful instantiation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(i32);

impl NodeId {
    /// The sentinel for "no remote node".
    pub const INVALID: NodeId = NodeId(-1);

    /// Wraps a raw remote-engine node handle.
    pub fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    pub fn raw(self) -> i32 {
        self.0
    }

    /// Returns `true` if this handle refers to a live remote node.
    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
