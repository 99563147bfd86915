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

//! Dependency-graph scenarios: downstream cook notification, stale-edge
//! pruning, and upstream-wait serialisation.

use kiln_core::asset::{AssetDefinition, ComponentGuid};
use kiln_core::change::ChangeTracked;
use kiln_core::config::RuntimeSettings;
use kiln_core::lifecycle::AssetState;
use kiln_runtime::{AssetInstance, Input, InputKind, InstanceRegistry};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Registers a producer/consumer pair where the consumer's Asset input
/// references the producer.
fn linked_pair(registry: &mut InstanceRegistry) -> (ComponentGuid, ComponentGuid) {
    let settings = RuntimeSettings::default();
    let producer = registry
        .register(AssetInstance::new(&settings).with_asset(AssetDefinition::new("terrain")))
        .unwrap();
    let mut consumer_instance =
        AssetInstance::new(&settings).with_asset(AssetDefinition::new("scatter"));
    consumer_instance.add_input(Input::new("surface", InputKind::Asset));
    let consumer = registry.register(consumer_instance).unwrap();
    registry.connect_asset_input(consumer, 0, producer).unwrap();

    // Settle both so only the notification dirties anything.
    for guid in [producer, consumer] {
        let instance = registry.get_mut(guid).unwrap();
        instance.set_state(AssetState::None);
        if let Some(input) = instance.input_mut(0) {
            input.mark_changed(false);
            input.mark_data_upload_needed(false);
        }
    }
    (producer, consumer)
}

#[test]
fn test_cook_notification_dirties_downstream_input() {
    init_logging();

    let mut registry = InstanceRegistry::new();
    let (producer, consumer) = linked_pair(&mut registry);
    assert!(!registry.get(consumer).unwrap().need_update());

    assert!(registry.notify_cooked_to_downstream_assets(producer));

    let consumer_instance = registry.get(consumer).unwrap();
    assert!(consumer_instance.inputs()[0].has_changed());
    assert!(consumer_instance.need_update());
    // The edge survived the pruning pass.
    assert_eq!(
        registry
            .get(producer)
            .unwrap()
            .downstream_consumers()
            .collect::<Vec<_>>(),
        vec![consumer]
    );
}

#[test]
fn test_notification_respects_consumer_opt_out() {
    init_logging();

    let mut registry = InstanceRegistry::new();
    let (producer, consumer) = linked_pair(&mut registry);
    registry.get_mut(consumer).unwrap().cook_on_upstream_asset_cook = false;

    registry.notify_cooked_to_downstream_assets(producer);

    let consumer_instance = registry.get(consumer).unwrap();
    assert!(!consumer_instance.inputs()[0].has_changed());
    assert!(!consumer_instance.need_update());
    // The reference is still valid, so the edge is kept.
    assert_eq!(
        registry.get(producer).unwrap().downstream_consumers().count(),
        1
    );
}

#[test]
fn test_stale_edges_are_pruned_and_repruning_is_a_noop() {
    init_logging();

    let mut registry = InstanceRegistry::new();
    let (producer, consumer) = linked_pair(&mut registry);

    // The consumer drops its reference; the producer's edge is now stale.
    assert!(registry
        .disconnect_asset_input(consumer, 0, producer)
        .unwrap());
    assert_eq!(
        registry.get(producer).unwrap().downstream_consumers().count(),
        1
    );

    registry.notify_cooked_to_downstream_assets(producer);
    assert_eq!(
        registry.get(producer).unwrap().downstream_consumers().count(),
        0
    );
    // The consumer was not dirtied through the stale edge.
    assert!(!registry.get(consumer).unwrap().inputs()[0].has_changed());

    // Notifying again with nothing downstream is a clean no-op.
    assert!(registry.notify_cooked_to_downstream_assets(producer));
    assert_eq!(
        registry.get(producer).unwrap().downstream_consumers().count(),
        0
    );
}

#[test]
fn test_destroyed_consumers_are_pruned() {
    init_logging();

    let mut registry = InstanceRegistry::new();
    let (producer, consumer) = linked_pair(&mut registry);

    // The host scheduled the consumer for destruction; the edge to it is
    // still recorded but must not be followed.
    registry.get_mut(consumer).unwrap().retire();

    registry.notify_cooked_to_downstream_assets(producer);
    assert_eq!(
        registry.get(producer).unwrap().downstream_consumers().count(),
        0
    );
    assert!(!registry.get(consumer).unwrap().inputs()[0].has_changed());
}

#[test]
fn test_upstream_wait_forces_instantiation() {
    init_logging();

    let mut registry = InstanceRegistry::new();
    let (producer, consumer) = linked_pair(&mut registry);
    registry
        .get_mut(producer)
        .unwrap()
        .set_state(AssetState::NeedInstantiation);

    assert!(registry.needs_to_wait_for_upstream_assets(consumer));
    // The lazy upstream was pushed to instantiate.
    assert_eq!(
        registry.get(producer).unwrap().state(),
        AssetState::PreInstantiation
    );

    // Still not quiescent: the consumer keeps waiting through the whole
    // upstream cook.
    registry
        .get_mut(producer)
        .unwrap()
        .set_state(AssetState::Cooking);
    assert!(registry.needs_to_wait_for_upstream_assets(consumer));

    // Quiescent upstream releases the consumer.
    registry
        .get_mut(producer)
        .unwrap()
        .set_state(AssetState::None);
    assert!(!registry.needs_to_wait_for_upstream_assets(consumer));
}

#[test]
fn test_wait_ignores_non_asset_inputs_and_unknown_upstreams() {
    init_logging();

    let settings = RuntimeSettings::default();
    let mut registry = InstanceRegistry::new();
    let mut instance = AssetInstance::new(&settings).with_asset(AssetDefinition::new("scatter"));
    instance.add_input(Input::new("profile", InputKind::Geometry));
    let consumer = registry.register(instance).unwrap();

    assert!(!registry.needs_to_wait_for_upstream_assets(consumer));
}

#[test]
fn test_chain_cook_ordering() {
    init_logging();

    // A → B → C: B consumes A, C consumes B. After A cooks, B becomes
    // dirty; C stays clean until B cooks in turn.
    let settings = RuntimeSettings::default();
    let mut registry = InstanceRegistry::new();
    let a = registry
        .register(AssetInstance::new(&settings).with_asset(AssetDefinition::new("terrain")))
        .unwrap();
    let mut b_instance = AssetInstance::new(&settings).with_asset(AssetDefinition::new("erode"));
    b_instance.add_input(Input::new("surface", InputKind::Asset));
    let b = registry.register(b_instance).unwrap();
    let mut c_instance = AssetInstance::new(&settings).with_asset(AssetDefinition::new("scatter"));
    c_instance.add_input(Input::new("surface", InputKind::Asset));
    let c = registry.register(c_instance).unwrap();

    registry.connect_asset_input(b, 0, a).unwrap();
    registry.connect_asset_input(c, 0, b).unwrap();
    for guid in [a, b, c] {
        let instance = registry.get_mut(guid).unwrap();
        instance.set_state(AssetState::None);
        if let Some(input) = instance.input_mut(0) {
            input.mark_changed(false);
        }
    }

    registry.notify_cooked_to_downstream_assets(a);
    assert!(registry.get(b).unwrap().need_update());
    assert!(!registry.get(c).unwrap().need_update());

    // While B recooks, C must wait on it.
    registry.get_mut(b).unwrap().set_state(AssetState::Cooking);
    assert!(registry.needs_to_wait_for_upstream_assets(c));

    registry.get_mut(b).unwrap().set_state(AssetState::None);
    registry.notify_cooked_to_downstream_assets(b);
    assert!(registry.get(c).unwrap().need_update());
}
