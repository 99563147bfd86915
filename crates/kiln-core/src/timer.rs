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

//! The timer-scheduling seam.
//!
//! The runtime never owns a clock; the host application provides one-shot
//! scheduling through [`TimerService`]. The only consumer today is the
//! proxy-mesh auto-refinement timeout, which requires at most one pending
//! callback per instance — scheduling a new one always cancels the previous
//! handle first.

use std::time::Duration;

/// An opaque handle identifying one scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Wraps a raw handle value issued by a [`TimerService`].
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// One-shot timer scheduling provided by the host application.
///
/// Implementations decide how and on which thread the callback fires; the
/// runtime only records the returned handle so it can cancel a pending
/// callback before scheduling a replacement.
pub trait TimerService: Send + Sync {
    /// Schedules a one-shot callback after `delay` and returns its handle.
    fn schedule_once(&self, delay: Duration) -> TimerHandle;

    /// Cancels a previously scheduled callback. Cancelling a handle that
    /// already fired is a no-op.
    fn cancel(&self, handle: TimerHandle);
}
