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

//! Outputs generated by an asset instance's cooks.
//!
//! An output records, per remote part, which host objects were generated
//! for it: the full object, a cheap proxy, and the component placed in the
//! scene. Editable-node outputs are special — their curve components can be
//! edited by the user directly, and such an edit is a cook trigger like a
//! parameter edit.

use kiln_core::asset::ObjectId;
use kiln_core::change::{ChangeTracked, DirtyFlags, Live};
use std::collections::BTreeMap;

/// The categories of output an asset can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    /// Generated meshes.
    Mesh,
    /// Instanced placements of other objects.
    Instancer,
    /// Generated or editable curves.
    Curve,
    /// Generated terrain.
    Landscape,
}

/// Identifies one generated part within the remote node's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputIdentifier {
    /// The remote object node the part belongs to.
    pub object_node: i32,
    /// The remote geometry node within the object.
    pub geo_node: i32,
    /// The part index within the geometry.
    pub part: i32,
}

/// A curve component generated in the host scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveComponent {
    /// The host component identity.
    pub id: ObjectId,
    /// Output-only curves are produced by the cook and must never trigger
    /// one; editable curves are authored by the user and do.
    pub is_output_curve: bool,
    /// Set when the user edited the curve since the last cook.
    pub needs_trigger_update: bool,
}

/// A component generated in the host scene for one output part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedComponent {
    /// A full static-mesh component.
    Mesh(ObjectId),
    /// A cheap proxy-mesh component awaiting refinement.
    ProxyMesh(ObjectId),
    /// A curve component.
    Curve(CurveComponent),
}

impl GeneratedComponent {
    /// The host component identity.
    pub fn id(&self) -> ObjectId {
        match self {
            GeneratedComponent::Mesh(id) | GeneratedComponent::ProxyMesh(id) => *id,
            GeneratedComponent::Curve(curve) => curve.id,
        }
    }

    /// The curve component, if this is one.
    pub fn as_curve(&self) -> Option<&CurveComponent> {
        match self {
            GeneratedComponent::Curve(curve) => Some(curve),
            _ => None,
        }
    }
}

/// The host objects recorded for one generated part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputObject {
    /// The generated host object (e.g. a mesh asset).
    pub object: Option<ObjectId>,
    /// The component placed in the scene for it.
    pub component: Option<GeneratedComponent>,
    /// The proxy host object, when proxies are enabled.
    pub proxy_object: Option<ObjectId>,
    /// The proxy component placed in the scene.
    pub proxy_component: Option<ObjectId>,
    /// Whether the proxy still represents the latest cook.
    pub proxy_is_current: bool,
}

/// One instanced-output record; `changed` requests an output refresh
/// without a recook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstancedOutput {
    /// The object being instanced.
    pub source_object: Option<ObjectId>,
    /// Set when the instancing variations were edited since the last
    /// output translation.
    pub changed: bool,
}

/// One output of an asset instance.
#[derive(Debug, Clone)]
pub struct Output {
    kind: OutputKind,
    editable: bool,
    output_objects: BTreeMap<OutputIdentifier, OutputObject>,
    instanced_outputs: BTreeMap<OutputIdentifier, InstancedOutput>,
    curve_export_type_changed: bool,
    dirty: DirtyFlags,
    live: bool,
}

impl Output {
    /// Creates an empty output of the given kind.
    pub fn new(kind: OutputKind) -> Self {
        Self {
            kind,
            editable: false,
            output_objects: BTreeMap::new(),
            instanced_outputs: BTreeMap::new(),
            curve_export_type_changed: false,
            dirty: DirtyFlags::default(),
            live: true,
        }
    }

    /// The output kind.
    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    /// Whether this output belongs to an editable node.
    pub fn is_editable_node(&self) -> bool {
        self.editable
    }

    /// Flags this output as belonging to an editable node.
    pub fn set_editable_node(&mut self, editable: bool) {
        self.editable = editable;
    }

    /// The generated parts recorded for this output.
    pub fn output_objects(&self) -> &BTreeMap<OutputIdentifier, OutputObject> {
        &self.output_objects
    }

    /// Mutable access to one generated part.
    pub fn output_object_mut(&mut self, id: &OutputIdentifier) -> Option<&mut OutputObject> {
        self.output_objects.get_mut(id)
    }

    /// Records (or replaces) the generated part for `id`.
    pub fn insert_output_object(&mut self, id: OutputIdentifier, object: OutputObject) {
        self.output_objects.insert(id, object);
    }

    /// The instanced-output records of this output.
    pub fn instanced_outputs(&self) -> &BTreeMap<OutputIdentifier, InstancedOutput> {
        &self.instanced_outputs
    }

    /// Records (or replaces) an instanced-output entry.
    pub fn insert_instanced_output(&mut self, id: OutputIdentifier, instanced: InstancedOutput) {
        self.instanced_outputs.insert(id, instanced);
    }

    /// Flags one instanced output as edited, requesting an output refresh.
    pub fn mark_instanced_output_changed(&mut self, id: &OutputIdentifier, changed: bool) {
        if let Some(instanced) = self.instanced_outputs.get_mut(id) {
            instanced.changed = changed;
        }
    }

    /// Whether a curve's export type changed since the last translation.
    pub fn has_curve_export_type_changed(&self) -> bool {
        self.curve_export_type_changed
    }

    /// Sets the curve-export-type-changed flag.
    pub fn set_curve_export_type_changed(&mut self, changed: bool) {
        self.curve_export_type_changed = changed;
    }

    /// Whether an edited editable curve on this output must trigger a
    /// recook. Only editable nodes are considered, and output-only curves
    /// never self-trigger.
    pub fn needs_editable_curve_trigger(&self) -> bool {
        if !self.editable {
            return false;
        }
        self.output_objects.values().any(|object| {
            object
                .component
                .as_ref()
                .and_then(GeneratedComponent::as_curve)
                .is_some_and(|curve| !curve.is_output_curve && curve.needs_trigger_update)
        })
    }

    /// Whether any instanced output or curve export type requests an
    /// output refresh (no recook needed).
    pub fn needs_output_refresh(&self) -> bool {
        self.instanced_outputs.values().any(|instanced| instanced.changed)
            || self.curve_export_type_changed
    }

    /// Whether any part still has a proxy recorded.
    pub fn has_any_proxy(&self) -> bool {
        self.output_objects
            .values()
            .any(|object| object.proxy_object.is_some() || object.proxy_component.is_some())
    }

    /// Whether any part has a proxy that still represents the latest cook.
    pub fn has_any_current_proxy(&self) -> bool {
        self.output_objects.values().any(|object| {
            object.proxy_is_current
                && (object.proxy_object.is_some() || object.proxy_component.is_some())
        })
    }

    /// Whether any part placed a component in the scene.
    pub fn has_any_component(&self) -> bool {
        self.output_objects
            .values()
            .any(|object| object.component.is_some())
    }

    /// Whether `id` appears anywhere in this output's generated or proxy
    /// objects.
    pub fn references_object(&self, id: ObjectId) -> bool {
        self.output_objects.values().any(|object| {
            object.object == Some(id)
                || object.proxy_object == Some(id)
                || object.proxy_component == Some(id)
                || object.component.as_ref().is_some_and(|c| c.id() == id)
        })
    }

    /// Drops all recorded parts and refresh flags.
    pub fn clear(&mut self) {
        self.output_objects.clear();
        self.instanced_outputs.clear();
        self.curve_export_type_changed = false;
        self.dirty.mark(false);
    }

    /// Marks this output as scheduled for destruction by the host.
    pub fn retire(&mut self) {
        self.live = false;
    }
}

impl ChangeTracked for Output {
    fn has_changed(&self) -> bool {
        self.dirty.changed()
    }

    fn needs_trigger_update(&self) -> bool {
        self.dirty.trigger()
    }

    fn mark_changed(&mut self, changed: bool) {
        self.dirty.mark(changed);
    }

    fn set_needs_trigger_update(&mut self, trigger: bool) {
        self.dirty.set_trigger(trigger);
    }
}

impl Live for Output {
    fn is_live(&self) -> bool {
        self.live
    }
}
