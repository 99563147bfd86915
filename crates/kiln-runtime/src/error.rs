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

//! Runtime error taxonomy.

use kiln_core::asset::ComponentGuid;
use thiserror::Error;

/// Errors raised by registry and instance operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeError {
    /// The referenced instance is not (or no longer) registered.
    #[error("no instance registered for component {0}")]
    UnknownInstance(ComponentGuid),

    /// An instance with this identity is already registered.
    #[error("component {0} is already registered")]
    AlreadyRegistered(ComponentGuid),

    /// An input index does not exist on the referenced instance.
    #[error("input index {index} out of range for component {guid}")]
    InputIndexOutOfRange {
        /// The instance whose inputs were indexed.
        guid: ComponentGuid,
        /// The offending index.
        index: usize,
    },

    /// A second remote request was issued while one is still in flight.
    #[error("component {0} already has a remote operation in flight")]
    RemoteOperationPending(ComponentGuid),
}
