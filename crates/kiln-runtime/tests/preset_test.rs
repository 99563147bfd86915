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

//! Preset application through the registry: auto-populated input slots
//! also wire up the dependency graph.

use kiln_core::asset::{AssetDefinition, ObjectId};
use kiln_core::config::RuntimeSettings;
use kiln_core::lifecycle::AssetState;
use kiln_runtime::{
    AssetInstance, Input, InputKind, InputPreset, InstanceRegistry, PresetObject,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_asset_preset_wires_the_dependency_edge() {
    init_logging();

    let settings = RuntimeSettings::default();
    let mut registry = InstanceRegistry::new();
    let producer = registry
        .register(AssetInstance::new(&settings).with_asset(AssetDefinition::new("terrain")))
        .unwrap();

    let mut consumer_instance =
        AssetInstance::new(&settings).with_asset(AssetDefinition::new("scatter"));
    consumer_instance.add_input(Input::new("surface", InputKind::Geometry));
    consumer_instance.set_input_presets(vec![InputPreset {
        object: PresetObject::AssetInstance(producer),
        slot: 0,
    }]);
    let consumer = registry.register(consumer_instance).unwrap();

    // Presets are applied once, after the first successful instantiation.
    registry.apply_input_presets(consumer).unwrap();

    let consumer_instance = registry.get(consumer).unwrap();
    assert_eq!(consumer_instance.inputs()[0].kind(), InputKind::Asset);
    assert!(consumer_instance.inputs()[0].references_instance(producer));
    assert_eq!(
        registry
            .get(producer)
            .unwrap()
            .downstream_consumers()
            .collect::<Vec<_>>(),
        vec![consumer]
    );

    // The new edge carries cook notifications immediately.
    registry
        .get_mut(consumer)
        .unwrap()
        .set_state(AssetState::None);
    registry.notify_cooked_to_downstream_assets(producer);
    assert!(registry.get(consumer).unwrap().need_update());
}

#[test]
fn test_mixed_presets_vote_per_slot() {
    init_logging();

    let settings = RuntimeSettings::default();
    let mut registry = InstanceRegistry::new();
    let mut instance = AssetInstance::new(&settings).with_asset(AssetDefinition::new("road"));
    instance.add_input(Input::new("terrain", InputKind::Geometry));
    instance.add_input(Input::new("buildings", InputKind::Geometry));
    instance.set_input_presets(vec![
        InputPreset {
            object: PresetObject::Landscape(ObjectId::new()),
            slot: 0,
        },
        InputPreset {
            object: PresetObject::StaticMesh(ObjectId::new()),
            slot: 1,
        },
        InputPreset {
            object: PresetObject::StaticMesh(ObjectId::new()),
            slot: 1,
        },
    ]);
    let guid = registry.register(instance).unwrap();

    registry.apply_input_presets(guid).unwrap();

    let instance = registry.get(guid).unwrap();
    assert_eq!(instance.inputs()[0].kind(), InputKind::Landscape);
    assert_eq!(instance.inputs()[0].object_count(InputKind::Landscape), 1);
    assert_eq!(instance.inputs()[1].kind(), InputKind::Geometry);
    assert_eq!(instance.inputs()[1].object_count(InputKind::Geometry), 2);
}

#[test]
fn test_presets_on_unknown_instance_error() {
    init_logging();

    let mut registry = InstanceRegistry::new();
    assert!(registry
        .apply_input_presets(kiln_core::asset::ComponentGuid::new())
        .is_err());
}
