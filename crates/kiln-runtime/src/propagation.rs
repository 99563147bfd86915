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

//! Change propagation across the instance dependency graph.
//!
//! Edges are directed from a producer to the instances consuming it as an
//! Asset-kind input. Both passes here run only between cooks, after the
//! producer's cook fully completed, so a consumer never observes a
//! partially-updated producer:
//!
//! - the downstream pass carries "I finished cooking" forward, dirtying
//!   the consumers' matching inputs;
//! - the upstream pass decides whether a consumer must hold its own cook
//!   while a dependency is still mid-flight.
//!
//! The downstream edge set is recomputed (pruned) on every notification
//! pass rather than maintained incrementally; a stale edge therefore
//! survives at most until the producer's next cook.

use crate::input::InputKind;
use crate::registry::InstanceRegistry;
use kiln_core::asset::ComponentGuid;
use kiln_core::change::{ChangeTracked, Live};
use kiln_core::lifecycle::AssetState;

impl InstanceRegistry {
    /// Notifies every downstream consumer that `producer` finished cooking.
    ///
    /// For each recorded consumer, every live Asset-kind input that still
    /// references the producer is marked changed — provided the consumer
    /// opted into cooking on upstream cooks. Consumers that are gone, not
    /// live, or no longer reference the producer are pruned from the
    /// downstream set. Pure graph maintenance; always succeeds — an
    /// unregistered producer simply has no edges to maintain.
    pub fn notify_cooked_to_downstream_assets(&mut self, producer: ComponentGuid) -> bool {
        let Some(instance) = self.get(producer) else {
            log::warn!("Cook notification for unregistered component {producer}");
            return true;
        };
        let consumers: Vec<ComponentGuid> = instance.downstream_consumers().collect();

        let mut stale: Vec<ComponentGuid> = Vec::new();
        for consumer in consumers {
            // Prune by default, unless a live Asset input actually still
            // references the producer.
            let mut keep = false;
            if let Some(consumer_instance) = self.get_mut(consumer) {
                if consumer_instance.is_live() {
                    let wants_cook = consumer_instance.cook_on_upstream_asset_cook;
                    for input in consumer_instance.inputs_mut() {
                        if !input.is_live() || input.kind() != InputKind::Asset {
                            continue;
                        }
                        if !input.references_instance(producer) {
                            continue;
                        }
                        if wants_cook {
                            input.mark_changed(true);
                        }
                        keep = true;
                    }
                }
            }
            if !keep {
                stale.push(consumer);
            }
        }

        if let Some(instance) = self.get_mut(producer) {
            for consumer in &stale {
                instance.remove_downstream(consumer);
            }
        }
        true
    }

    /// Whether `consumer` must hold its cook for an upstream dependency.
    ///
    /// Upstream instances sitting in `NeedInstantiation` are force-pushed
    /// to `PreInstantiation` so the driver instantiates them; any upstream
    /// not yet quiescent means the consumer waits. This is what serialises
    /// dependent cooks.
    pub fn needs_to_wait_for_upstream_assets(&mut self, consumer: ComponentGuid) -> bool {
        let Some(instance) = self.get(consumer) else {
            return false;
        };

        let upstream: Vec<ComponentGuid> = instance
            .inputs()
            .iter()
            .filter(|input| input.is_live() && input.kind() == InputKind::Asset)
            .flat_map(|input| input.objects_for(InputKind::Asset))
            .filter_map(|object| object.as_asset_instance())
            .collect();

        let mut wait = false;
        for guid in upstream {
            let Some(upstream_instance) = self.get_mut(guid) else {
                continue;
            };
            match upstream_instance.state() {
                AssetState::NeedInstantiation => {
                    upstream_instance.set_state(AssetState::PreInstantiation);
                    wait = true;
                }
                AssetState::None => {}
                _ => {
                    wait = true;
                }
            }
        }
        wait
    }
}
