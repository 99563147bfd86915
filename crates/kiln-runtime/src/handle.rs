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

//! Interactive manipulator handles exposed by an asset definition.

use kiln_core::change::Live;

/// The manipulator categories the remote engine can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// A transform manipulator bound to translate/rotate/scale parameters.
    Xform,
    /// A bounding-box manipulator.
    Bounder,
}

/// One manipulator handle of an asset instance.
#[derive(Debug, Clone)]
pub struct Handle {
    name: String,
    kind: HandleKind,
    live: bool,
}

impl Handle {
    /// Creates a handle.
    pub fn new(name: impl Into<String>, kind: HandleKind) -> Self {
        Self {
            name: name.into(),
            kind,
            live: true,
        }
    }

    /// The handle name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The manipulator kind.
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Identity match against a candidate from a freshly fetched
    /// definition: same name and kind.
    pub fn matches(&self, other: &Handle) -> bool {
        self.name == other.name && self.kind == other.kind
    }

    /// Marks this handle as scheduled for destruction by the host.
    pub fn retire(&mut self) {
        self.live = false;
    }
}

impl Live for Handle {
    fn is_live(&self) -> bool {
        self.live
    }
}
