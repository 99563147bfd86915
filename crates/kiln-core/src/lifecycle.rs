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

//! The discrete lifecycle vocabulary of an asset instance.
//!
//! An instance moves from creation to deletion through [`AssetState`]; an
//! external driver loop reads the state together with the instance's dirty
//! flags and advances it. The runtime itself never blocks: every remote
//! operation is bracketed by a correlation token and the driver polls for
//! completion.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle states of an asset instance.
///
/// The nominal path is `PreInstantiation → Instantiating → PreCook →
/// Cooking → PostCook → PreProcess → Processing → None`. `NeedInstantiation`
/// and `NeedRebuild` are re-entry points reached whenever external edits
/// invalidate the current remote node; `NeedDelete → Deleting` leads to
/// instance destruction. `None` is the quiescent "up to date" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AssetState {
    /// The interface exists from an earlier cook but the remote node is
    /// stale; a new instantiation is required before the next cook.
    NeedInstantiation = 0,
    /// Instantiation should start as soon as the driver gets to it.
    PreInstantiation = 1,
    /// An instantiation request is in flight on the remote engine.
    Instantiating = 2,
    /// Instantiated; waiting for the driver to start the cook.
    PreCook = 3,
    /// A cook request is in flight on the remote engine.
    Cooking = 4,
    /// The cook finished; results have not been processed yet.
    PostCook = 5,
    /// Output processing should start as soon as the driver gets to it.
    PreProcess = 6,
    /// Outputs are being translated into host objects.
    Processing = 7,
    /// Quiescent: the instance is up to date.
    None = 8,
    /// The remote node must be deleted and rebuilt from scratch.
    NeedRebuild = 9,
    /// The instance is queued for deletion.
    NeedDelete = 10,
    /// A delete request is in flight on the remote engine.
    Deleting = 11,
}

impl AssetState {
    /// Returns `true` for the quiescent "up to date" state.
    pub fn is_quiescent(self) -> bool {
        self == AssetState::None
    }

    /// Classifies the state for consumers of cooked data.
    ///
    /// Callers that want to read generated outputs use this instead of
    /// matching on the full state machine: data is only safe to read in the
    /// quiescent state.
    pub fn cooked_data_status(self) -> CookedDataStatus {
        match self {
            AssetState::NeedInstantiation
            | AssetState::PreInstantiation
            | AssetState::Instantiating
            | AssetState::PreCook
            | AssetState::Cooking
            | AssetState::PostCook
            | AssetState::PreProcess
            | AssetState::Processing => CookedDataStatus::NotReady,
            AssetState::None => CookedDataStatus::Available,
            AssetState::NeedRebuild | AssetState::NeedDelete | AssetState::Deleting => {
                CookedDataStatus::NeedsRebuildOrDelete
            }
        }
    }
}

impl Default for AssetState {
    /// The state of a freshly created instance.
    fn default() -> Self {
        AssetState::PreInstantiation
    }
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl TryFrom<u8> for AssetState {
    type Error = CoreError;

    /// Decodes a persisted state discriminant.
    ///
    /// An out-of-range discriminant is surfaced as
    /// [`CoreError::InvalidAssetState`], never coerced to a valid state.
    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Ok(match raw {
            0 => AssetState::NeedInstantiation,
            1 => AssetState::PreInstantiation,
            2 => AssetState::Instantiating,
            3 => AssetState::PreCook,
            4 => AssetState::Cooking,
            5 => AssetState::PostCook,
            6 => AssetState::PreProcess,
            7 => AssetState::Processing,
            8 => AssetState::None,
            9 => AssetState::NeedRebuild,
            10 => AssetState::NeedDelete,
            11 => AssetState::Deleting,
            other => return Err(CoreError::InvalidAssetState(other)),
        })
    }
}

/// Outcome of the most recently completed remote operation
/// (instantiate, cook, or delete).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StateResult {
    /// No operation has completed since the result was last reset.
    #[default]
    None,
    /// The last operation completed successfully.
    Success,
    /// The last operation failed.
    Failed,
}

impl fmt::Display for StateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Tri-state answer to "can cooked output data be read right now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CookedDataStatus {
    /// The instance is quiescent; generated outputs are consistent.
    Available,
    /// An instantiation/cook/processing step has not finished yet.
    NotReady,
    /// The instance is queued for rebuild or deletion; its outputs are
    /// about to be replaced or destroyed.
    NeedsRebuildOrDelete,
}
