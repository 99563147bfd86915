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

//! Core error taxonomy.

use thiserror::Error;

/// Errors raised by core vocabulary types.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// A persisted lifecycle-state discriminant is outside the known
    /// enumeration. The value is surfaced to the caller instead of being
    /// coerced to a valid state.
    #[error("unknown asset lifecycle state discriminant {0}")]
    InvalidAssetState(u8),
}
