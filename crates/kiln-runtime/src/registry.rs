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

//! The process-wide registry of live asset instances.
//!
//! The registry owns every [`AssetInstance`] and is the only place
//! cross-instance references are resolved: downstream/upstream links are
//! stored as [`ComponentGuid`]s and looked up here, never as owning
//! references, so deleting a producer can never leave dangling ownership in
//! a consumer.
//!
//! Remote nodes whose instances are gone are queued in a pending-delete
//! list that the external cook engine drains on its own schedule.

use crate::events::{RuntimeEvent, RuntimeEvents};
use crate::input::{InputKind, InputObject};
use crate::instance::AssetInstance;
use crate::RuntimeError;
use kiln_core::asset::{ComponentGuid, NodeId};
use std::collections::BTreeMap;

/// Owns all live asset instances, keyed by identity.
pub struct InstanceRegistry {
    instances: BTreeMap<ComponentGuid, AssetInstance>,
    nodes_pending_delete: Vec<NodeId>,
    events: RuntimeEvents,
}

impl InstanceRegistry {
    /// Creates an empty registry with its own event channel.
    pub fn new() -> Self {
        Self {
            instances: BTreeMap::new(),
            nodes_pending_delete: Vec::new(),
            events: RuntimeEvents::new(),
        }
    }

    /// Registers a new instance, wiring it to the registry's event channel.
    pub fn register(&mut self, mut instance: AssetInstance) -> Result<ComponentGuid, RuntimeError> {
        let guid = instance.guid();
        if self.instances.contains_key(&guid) {
            return Err(RuntimeError::AlreadyRegistered(guid));
        }
        instance.set_event_sender(self.events.sender());
        log::info!("InstanceRegistry: registered component {guid}");
        self.instances.insert(guid, instance);
        Ok(guid)
    }

    /// Re-registers an instance reconstructed by an undo/redo pass.
    ///
    /// If the identity is still registered the reconstruction is dropped
    /// and the registered instance stays authoritative; otherwise the
    /// instance is restored like a fresh load (its remote node is gone)
    /// and registered.
    pub fn restore_after_undo(&mut self, mut instance: AssetInstance) -> ComponentGuid {
        let guid = instance.guid();
        if self.instances.contains_key(&guid) {
            return guid;
        }
        instance.prepare_after_load();
        // Cannot collide: the key was just checked.
        let _ = self.register(instance);
        guid
    }

    /// Removes an instance, severing every cross-reference first:
    /// its in-flight remote operation is invalidated, its remote node is
    /// queued for deletion, and its identity is pruned from every remaining
    /// downstream set. Returns the removed instance, if it was registered.
    pub fn remove(&mut self, guid: ComponentGuid) -> Option<AssetInstance> {
        let mut instance = self.instances.remove(&guid)?;

        self.mark_node_pending_delete(instance.node_id());
        for other in self.instances.values_mut() {
            other.remove_downstream(&guid);
        }
        // All cross-references are severed; only now may the owned
        // entities go.
        instance.prepare_for_removal();

        log::info!("InstanceRegistry: removed component {guid}");
        self.events.publish(RuntimeEvent::InstanceRemoved(guid));
        Some(instance)
    }

    /// Whether an instance with this identity is registered.
    pub fn is_registered(&self, guid: ComponentGuid) -> bool {
        self.instances.contains_key(&guid)
    }

    /// Shared access to one instance.
    pub fn get(&self, guid: ComponentGuid) -> Option<&AssetInstance> {
        self.instances.get(&guid)
    }

    /// Mutable access to one instance.
    pub fn get_mut(&mut self, guid: ComponentGuid) -> Option<&mut AssetInstance> {
        self.instances.get_mut(&guid)
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether no instances are registered.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// The identities of all registered instances, in stable order.
    pub fn guids(&self) -> impl Iterator<Item = ComponentGuid> + '_ {
        self.instances.keys().copied()
    }

    /// The registry's event channel.
    pub fn events(&self) -> &RuntimeEvents {
        &self.events
    }

    /// Queues a remote node for deletion by the cook engine. Invalid
    /// handles are ignored.
    pub fn mark_node_pending_delete(&mut self, node_id: NodeId) {
        if !node_id.is_valid() {
            return;
        }
        if !self.nodes_pending_delete.contains(&node_id) {
            self.nodes_pending_delete.push(node_id);
        }
    }

    /// Drains the queue of remote nodes awaiting deletion.
    pub fn take_nodes_pending_delete(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.nodes_pending_delete)
    }

    /// Connects `producer`'s cooked output into an Asset-kind slot of one
    /// of `consumer`'s inputs, recording the downstream back-edge that
    /// cook notifications follow.
    pub fn connect_asset_input(
        &mut self,
        consumer: ComponentGuid,
        input_index: usize,
        producer: ComponentGuid,
    ) -> Result<(), RuntimeError> {
        if !self.instances.contains_key(&producer) {
            return Err(RuntimeError::UnknownInstance(producer));
        }
        let consumer_instance = self
            .instances
            .get_mut(&consumer)
            .ok_or(RuntimeError::UnknownInstance(consumer))?;
        let input = consumer_instance
            .input_mut(input_index)
            .ok_or(RuntimeError::InputIndexOutOfRange {
                guid: consumer,
                index: input_index,
            })?;

        input.push_object(InputObject::Asset(producer));

        // Checked above; the map cannot have lost the key since.
        if let Some(producer_instance) = self.instances.get_mut(&producer) {
            producer_instance.add_downstream(consumer);
        }
        Ok(())
    }

    /// Removes `producer` from an Asset-kind input of `consumer`.
    ///
    /// Only the input object list is touched; the producer's stale
    /// downstream edge is pruned by the next cook notification, which is
    /// the single place edges are recomputed.
    pub fn disconnect_asset_input(
        &mut self,
        consumer: ComponentGuid,
        input_index: usize,
        producer: ComponentGuid,
    ) -> Result<bool, RuntimeError> {
        let consumer_instance = self
            .instances
            .get_mut(&consumer)
            .ok_or(RuntimeError::UnknownInstance(consumer))?;
        let input = consumer_instance
            .input_mut(input_index)
            .ok_or(RuntimeError::InputIndexOutOfRange {
                guid: consumer,
                index: input_index,
            })?;
        Ok(input.remove_asset_instance(producer))
    }

    /// Applies an instance's stored input presets and records the
    /// downstream back-edges for any asset references the presets created.
    pub fn apply_input_presets(&mut self, guid: ComponentGuid) -> Result<(), RuntimeError> {
        let instance = self
            .instances
            .get_mut(&guid)
            .ok_or(RuntimeError::UnknownInstance(guid))?;
        instance.apply_input_presets();

        let referenced: Vec<ComponentGuid> = instance
            .inputs()
            .iter()
            .flat_map(|input| input.objects_for(InputKind::Asset))
            .filter_map(InputObject::as_asset_instance)
            .collect();

        for producer in referenced {
            if producer == guid {
                continue;
            }
            if let Some(producer_instance) = self.instances.get_mut(&producer) {
                producer_instance.add_downstream(guid);
            } else {
                log::warn!(
                    "Instance {guid}: preset references unregistered component {producer}"
                );
            }
        }
        Ok(())
    }
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
