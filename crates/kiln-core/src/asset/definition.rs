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

/// A globally unique, persistent identifier for a procedural-asset
/// definition.
///
/// This represents the "idea" of the asset in the library, decoupled from
/// any instance of it. Instances hold on to the definition they were created
/// from and compare definitions by this id when deciding whether a rebind
/// actually changed anything.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DefinitionId(Uuid);

impl DefinitionId {
    /// Creates a new, random (version 4) `DefinitionId`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DefinitionId {
    /// Creates a new, random (version 4) `DefinitionId`.
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A descriptor of one procedural-asset library entry.
///
/// A definition file may bundle several assets; `sub_asset_names` lists them
/// in library order and an instance selects one by index. The descriptor
/// carries no cooked data and no parameter interface — those only exist on
/// the remote engine once an instance of the definition is instantiated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDefinition {
    id: DefinitionId,
    name: String,
    sub_asset_names: Vec<String>,
}

impl AssetDefinition {
    /// Creates a definition descriptor with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: DefinitionId::new(),
            name: name.into(),
            sub_asset_names: Vec::new(),
        }
    }

    /// Declares the sub-assets bundled in this definition, in library order.
    pub fn with_sub_assets(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.sub_asset_names = names.into_iter().collect();
        self
    }

    /// Returns the stable id of this definition.
    pub fn id(&self) -> DefinitionId {
        self.id
    }

    /// Returns the library name of this definition.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the bundled sub-asset names, in library order.
    pub fn sub_asset_names(&self) -> &[String] {
        &self.sub_asset_names
    }
}
