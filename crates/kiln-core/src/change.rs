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

//! Change-tracking and liveness capabilities shared by owned entities.
//!
//! Parameters, inputs, and outputs all expose the same two-bit dirty
//! protocol: `has_changed` records that the entity diverged from what the
//! remote engine last saw, and `needs_trigger_update` records whether that
//! divergence should force a recook. The second bit exists so a failed
//! upload or a fresh load can leave an entity dirty *without* spin-looping
//! the cook trigger on every aggregation pass.

/// The polymorphic change-tracking capability of owned entities.
///
/// The trigger bit is only meaningful while the entity is dirty; a clean
/// entity is never considered for triggering regardless of it.
pub trait ChangeTracked {
    /// Returns `true` if the entity diverged from the last uploaded state.
    fn has_changed(&self) -> bool;

    /// Returns `true` if the pending change should force a recook.
    fn needs_trigger_update(&self) -> bool;

    /// Marks the entity dirty (arming the trigger bit) or clean
    /// (disarming it).
    fn mark_changed(&mut self, changed: bool);

    /// Overrides the trigger bit, typically to suppress a recook after a
    /// failed upload or a fresh load.
    fn set_needs_trigger_update(&mut self, trigger: bool);

    /// Returns `true` if the entity is both dirty and armed to trigger.
    fn is_update_armed(&self) -> bool {
        self.has_changed() && self.needs_trigger_update()
    }
}

/// Explicit host-object soft-deletion check.
///
/// The host application may schedule any referenced object for destruction
/// at any time; every entity access goes through this capability first, and
/// iteration skips non-live entries rather than aborting.
pub trait Live {
    /// Returns `false` once the entity is scheduled for destruction.
    fn is_live(&self) -> bool;
}

/// The two dirty bits, embeddable by entity types.
///
/// Entities hold one of these and delegate their [`ChangeTracked`]
/// implementation to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyFlags {
    changed: bool,
    trigger: bool,
}

impl DirtyFlags {
    /// Marks dirty (arming the trigger) or clean (disarming it).
    pub fn mark(&mut self, changed: bool) {
        self.changed = changed;
        self.trigger = changed;
    }

    /// Overrides the trigger bit without touching the dirty bit.
    pub fn set_trigger(&mut self, trigger: bool) {
        self.trigger = trigger;
    }

    /// Returns the dirty bit.
    pub fn changed(self) -> bool {
        self.changed
    }

    /// Returns the trigger bit.
    pub fn trigger(self) -> bool {
        self.trigger
    }
}
