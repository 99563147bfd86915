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

//! The event channel from the runtime to the external driver.
//!
//! Instances and the registry publish fire-and-forget notifications here;
//! the driver drains the receiver on its own schedule. Publishing never
//! blocks.

use kiln_core::asset::ComponentGuid;

/// Notifications the runtime emits for the external driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// The proxy-refinement timeout of an instance elapsed; its proxy
    /// outputs should be refined into full meshes.
    RefineProxiesRequested(ComponentGuid),
    /// An instance was removed from the registry; remote-side cleanup for
    /// it can proceed.
    InstanceRemoved(ComponentGuid),
}

/// The runtime's event channel.
#[derive(Debug)]
pub struct RuntimeEvents {
    sender: flume::Sender<RuntimeEvent>,
    receiver: flume::Receiver<RuntimeEvent>,
}

impl RuntimeEvents {
    /// Creates an unbounded event channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    /// Returns a sender clone for publishers embedded in instances.
    pub fn sender(&self) -> flume::Sender<RuntimeEvent> {
        self.sender.clone()
    }

    /// Returns the receiver the driver drains.
    pub fn receiver(&self) -> &flume::Receiver<RuntimeEvent> {
        &self.receiver
    }

    /// Publishes an event, logging instead of failing if the receiver is
    /// gone.
    pub fn publish(&self, event: RuntimeEvent) {
        log::trace!("Publishing runtime event {:?}", event);
        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to publish runtime event: {e}");
        }
    }
}

impl Default for RuntimeEvents {
    fn default() -> Self {
        Self::new()
    }
}
