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

//! One live binding of a procedural-asset definition.
//!
//! An [`AssetInstance`] owns the parameters, inputs, outputs, and handles
//! exchanged with its remote node, carries the lifecycle state the external
//! driver advances, and aggregates the dirty state of everything it owns
//! into the single question the driver asks each tick: does this instance
//! need to re-run its computation?
//!
//! The instance never issues remote requests itself. It brackets them with
//! a correlation token (at most one in flight) and records their outcomes;
//! cross-instance effects go through the
//! [`InstanceRegistry`](crate::registry::InstanceRegistry).

use crate::events::RuntimeEvent;
use crate::handle::Handle;
use crate::input::{Input, InputKind, InputObject};
use crate::output::Output;
use crate::parameter::Parameter;
use crate::RuntimeError;
use kiln_core::asset::{AssetDefinition, ComponentGuid, CorrelationToken, NodeId, ObjectId};
use kiln_core::change::{ChangeTracked, Live};
use kiln_core::config::{ProxyOverrides, RuntimeSettings};
use kiln_core::lifecycle::{AssetState, CookedDataStatus, StateResult};
use kiln_core::timer::{TimerHandle, TimerService};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// A host object offered to the instance's inputs before first
/// instantiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetObject {
    /// A terrain object; landscape slots hold at most one.
    Landscape(ObjectId),
    /// A scene actor, assigned as a world input.
    Actor(ObjectId),
    /// A geometry asset from the host library.
    StaticMesh(ObjectId),
    /// Another asset instance; asset slots hold at most one.
    AssetInstance(ComponentGuid),
}

/// One preset assignment: a host object and the input slot it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputPreset {
    /// The object to assign.
    pub object: PresetObject,
    /// Index into the instance's non-curve inputs.
    pub slot: usize,
}

/// One live binding of a procedural-asset definition to owned
/// parameters/inputs/outputs and a lifecycle state.
pub struct AssetInstance {
    guid: ComponentGuid,
    node_id: NodeId,
    asset: Option<AssetDefinition>,
    /// Which bundled sub-asset of the definition this instance uses.
    pub sub_asset_index: Option<u32>,

    state: AssetState,
    last_result: StateResult,
    correlation: Option<CorrelationToken>,
    cook_count: u32,

    /// Parameter or input edits trigger a cook.
    pub cook_on_parameter_change: bool,
    /// Transform changes trigger a cook.
    pub cook_on_transform_change: bool,
    /// An upstream asset finishing its cook triggers a cook here.
    pub cook_on_upstream_asset_cook: bool,
    /// Push transform changes to the remote engine on upload.
    pub upload_transforms_to_engine: bool,
    /// Master switch for cooking this instance at all.
    pub cooking_enabled: bool,
    /// The definition produces no outputs; skip output translation.
    pub outputless: bool,
    /// Skip proxy generation on the next cook only.
    pub no_proxy_on_next_cook: bool,
    /// Per-instance proxy-mesh settings layered over the global ones.
    pub proxy_overrides: ProxyOverrides,

    has_been_loaded: bool,
    has_been_duplicated: bool,
    pending_delete: bool,
    recook_requested: bool,
    rebuild_requested: bool,
    fully_loaded: bool,
    transform_changed: bool,

    parameters: Vec<Parameter>,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    handles: Vec<Handle>,

    downstream: BTreeSet<ComponentGuid>,
    input_presets: Vec<InputPreset>,

    timers: Option<Arc<dyn TimerService>>,
    refine_timer: Option<TimerHandle>,
    events: Option<flume::Sender<RuntimeEvent>>,

    live: bool,
}

impl AssetInstance {
    /// Creates an unbound instance with a fresh identity.
    ///
    /// Proxy overrides are seeded from the global settings so enabling the
    /// override flag is initially a no-op.
    pub fn new(settings: &RuntimeSettings) -> Self {
        Self {
            guid: ComponentGuid::new(),
            node_id: NodeId::INVALID,
            asset: None,
            sub_asset_index: None,
            state: AssetState::PreInstantiation,
            last_result: StateResult::None,
            correlation: None,
            cook_count: 0,
            cook_on_parameter_change: true,
            cook_on_transform_change: false,
            cook_on_upstream_asset_cook: true,
            upload_transforms_to_engine: true,
            cooking_enabled: true,
            outputless: false,
            no_proxy_on_next_cook: false,
            proxy_overrides: ProxyOverrides::seeded_from(settings),
            has_been_loaded: false,
            has_been_duplicated: false,
            pending_delete: false,
            recook_requested: false,
            rebuild_requested: false,
            fully_loaded: false,
            transform_changed: false,
            parameters: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            handles: Vec::new(),
            downstream: BTreeSet::new(),
            input_presets: Vec::new(),
            timers: None,
            refine_timer: None,
            events: None,
            live: true,
        }
    }

    /// Binds a definition at construction time.
    pub fn with_asset(mut self, asset: AssetDefinition) -> Self {
        self.asset = Some(asset);
        self
    }

    /// Attaches the host's timer service for proxy-refinement scheduling.
    pub fn set_timer_service(&mut self, timers: Arc<dyn TimerService>) {
        self.timers = Some(timers);
    }

    /// Attaches the runtime event sender. Done by the registry on
    /// registration.
    pub fn set_event_sender(&mut self, events: flume::Sender<RuntimeEvent>) {
        self.events = Some(events);
    }

    // --- identity & lifecycle accessors ---

    /// The stable identity of this instance.
    pub fn guid(&self) -> ComponentGuid {
        self.guid
    }

    /// The remote node handle, [`NodeId::INVALID`] when no live node exists.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Sets the remote node handle. Assigned by the driver when an
    /// instantiation completes.
    pub fn set_node_id(&mut self, node_id: NodeId) {
        self.node_id = node_id;
    }

    /// The bound definition, if any.
    pub fn asset(&self) -> Option<&AssetDefinition> {
        self.asset.as_ref()
    }

    /// Binds a definition. Rebinding the same definition is a no-op;
    /// reacting to an actual change is the caller's job via
    /// [`on_asset_definition_changed`](Self::on_asset_definition_changed).
    pub fn set_asset_definition(&mut self, asset: AssetDefinition) {
        if self.asset.as_ref().map(AssetDefinition::id) == Some(asset.id()) {
            return;
        }
        self.asset = Some(asset);
    }

    /// The bound definition was swapped for another one; everything fetched
    /// from the old one is stale.
    pub fn on_asset_definition_changed(&mut self) {
        self.mark_as_need_instantiation();
    }

    /// The current lifecycle state.
    pub fn state(&self) -> AssetState {
        self.state
    }

    /// Sets the lifecycle state. The external driver advances the machine;
    /// the instance only moves itself on the `mark_as_*` re-entry points.
    pub fn set_state(&mut self, state: AssetState) {
        self.state = state;
    }

    /// Outcome of the most recently completed remote operation.
    pub fn last_result(&self) -> StateResult {
        self.last_result
    }

    /// Overrides the recorded operation outcome.
    pub fn set_last_result(&mut self, result: StateResult) {
        self.last_result = result;
    }

    /// Number of cooks completed since the last (re)instantiation.
    pub fn cook_count(&self) -> u32 {
        self.cook_count
    }

    /// Classifies the current state for consumers of cooked data.
    pub fn cooked_data_status(&self) -> CookedDataStatus {
        self.state.cooked_data_status()
    }

    /// Whether the instance was restored from a save.
    pub fn has_been_loaded(&self) -> bool {
        self.has_been_loaded
    }

    /// Whether the instance was created by duplicating another one.
    pub fn has_been_duplicated(&self) -> bool {
        self.has_been_duplicated
    }

    /// Whether the instance is queued for deletion.
    pub fn is_pending_delete(&self) -> bool {
        self.pending_delete
    }

    /// Queues or unqueues the instance for deletion.
    pub fn set_pending_delete(&mut self, pending: bool) {
        self.pending_delete = pending;
    }

    /// Whether a user explicitly requested a recook.
    pub fn recook_requested(&self) -> bool {
        self.recook_requested
    }

    /// Whether a user explicitly requested a rebuild.
    pub fn rebuild_requested(&self) -> bool {
        self.rebuild_requested
    }

    /// Whether host-side setup finished for this instance.
    pub fn is_fully_loaded(&self) -> bool {
        self.fully_loaded
    }

    /// Marks host-side setup as finished. Until then transform edits are
    /// ignored so loading a scene does not trigger cooks.
    pub fn mark_fully_loaded(&mut self) {
        self.fully_loaded = true;
    }

    /// Whether the transform changed since the last cook.
    pub fn transform_changed_since_last_cook(&self) -> bool {
        self.transform_changed
    }

    /// Records a transform change. Ignored until the instance is fully
    /// loaded, so scene loading cannot queue spurious cooks.
    pub fn set_transform_changed(&mut self, changed: bool) {
        if self.fully_loaded {
            self.transform_changed = changed;
        }
    }

    // --- remote-operation bracketing ---

    /// Whether a remote request is currently in flight.
    pub fn is_instantiating_or_cooking(&self) -> bool {
        self.correlation.is_some()
    }

    /// The token of the in-flight remote request, if any.
    pub fn correlation_token(&self) -> Option<CorrelationToken> {
        self.correlation
    }

    /// Opens the bracket for one remote request.
    ///
    /// At most one request may be in flight per instance; a second bracket
    /// is refused.
    pub fn begin_remote_operation(&mut self) -> Result<CorrelationToken, RuntimeError> {
        if self.correlation.is_some() {
            return Err(RuntimeError::RemoteOperationPending(self.guid));
        }
        let token = CorrelationToken::new();
        self.correlation = Some(token);
        Ok(token)
    }

    /// Records the completion of an instantiation request.
    ///
    /// On success the fresh remote node handle is adopted. State
    /// transitions stay with the driver.
    pub fn complete_instantiation(&mut self, success: bool, node_id: NodeId) {
        self.correlation = None;
        if success {
            self.node_id = node_id;
            self.last_result = StateResult::Success;
        } else {
            self.last_result = StateResult::Failed;
        }
    }

    /// Records the completion of a cook request.
    ///
    /// On success the cook counter advances and the transform/recook
    /// requests are considered served. On failure every dirty parameter and
    /// input keeps its dirty bit but has its trigger suppressed, so the
    /// failed upload does not retry on every aggregation pass until the
    /// next explicit edit.
    pub fn complete_cook(&mut self, success: bool) {
        self.correlation = None;
        if success {
            self.last_result = StateResult::Success;
            self.cook_count += 1;
            self.recook_requested = false;
            self.transform_changed = false;
        } else {
            self.last_result = StateResult::Failed;
            for param in self.parameters.iter_mut().filter(|p| p.is_live()) {
                if param.has_changed() {
                    param.set_needs_trigger_update(false);
                }
            }
            for input in self.inputs.iter_mut().filter(|i| i.is_live()) {
                if input.has_changed() {
                    input.set_needs_trigger_update(false);
                }
            }
        }
    }

    // --- owned entities ---

    /// Adds a parameter fetched from the remote definition.
    pub fn add_parameter(&mut self, parameter: Parameter) {
        self.parameters.push(parameter);
    }

    /// Adds an input fetched from the remote definition.
    pub fn add_input(&mut self, input: Input) {
        self.inputs.push(input);
    }

    /// Adds an output created by output translation.
    pub fn add_output(&mut self, output: Output) {
        self.outputs.push(output);
    }

    /// Adds a manipulator handle fetched from the remote definition.
    pub fn add_handle(&mut self, handle: Handle) {
        self.handles.push(handle);
    }

    /// The owned parameters, in definition order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Mutable access to one parameter.
    pub fn parameter_mut(&mut self, index: usize) -> Option<&mut Parameter> {
        self.parameters.get_mut(index)
    }

    /// The owned inputs, in definition order.
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// Mutable access to one input.
    pub fn input_mut(&mut self, index: usize) -> Option<&mut Input> {
        self.inputs.get_mut(index)
    }

    /// Mutable access to all inputs.
    pub fn inputs_mut(&mut self) -> &mut [Input] {
        &mut self.inputs
    }

    /// The owned outputs, in translation order.
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Mutable access to one output.
    pub fn output_mut(&mut self, index: usize) -> Option<&mut Output> {
        self.outputs.get_mut(index)
    }

    /// The owned manipulator handles.
    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    // --- lifecycle re-entry points ---

    /// Marks the instance as needing (re)instantiation.
    ///
    /// The remote node handle is invalidated. An instance that never built
    /// an interface (no parameters, inputs, or outputs) goes straight to
    /// `PreInstantiation`; one that cooked before goes to
    /// `NeedInstantiation` so the driver reinstantiates it lazily. All
    /// parameters and inputs become dirty but *suppressed* — the fresh
    /// instantiation will push their values, so nothing should force a
    /// redundant cook right after it.
    pub fn mark_as_need_instantiation(&mut self) {
        self.node_id = NodeId::INVALID;

        if self.parameters.is_empty() && self.inputs.is_empty() && self.outputs.is_empty() {
            self.state = AssetState::PreInstantiation;
        } else {
            self.state = AssetState::NeedInstantiation;
        }
        self.last_result = StateResult::None;

        self.cook_count = 0;
        self.has_been_loaded = true;
        self.pending_delete = false;
        self.recook_requested = false;
        self.rebuild_requested = false;
        self.fully_loaded = false;

        for param in self.parameters.iter_mut().filter(|p| p.is_live()) {
            param.mark_changed(true);
            param.set_needs_trigger_update(false);
        }
        for input in self.inputs.iter_mut().filter(|i| i.is_live()) {
            input.mark_changed(true);
            input.set_needs_trigger_update(false);
            input.mark_data_upload_needed(true);
        }

        self.clear_refine_meshes_timer();
    }

    /// Marks the instance as needing a recook.
    ///
    /// Every parameter and input becomes dirty *and armed*; the lifecycle
    /// state is untouched — the driver reads the request flags and
    /// transitions on its own.
    pub fn mark_as_need_cook(&mut self) {
        self.has_been_loaded = true;
        self.pending_delete = false;
        self.recook_requested = true;
        self.rebuild_requested = false;

        for param in self.parameters.iter_mut().filter(|p| p.is_live()) {
            param.mark_changed(true);
            param.set_needs_trigger_update(true);
        }
        for input in self.inputs.iter_mut().filter(|i| i.is_live()) {
            input.mark_changed(true);
            input.set_needs_trigger_update(true);
            input.mark_data_upload_needed(true);
        }

        self.clear_refine_meshes_timer();
    }

    /// Marks the instance as needing a full rebuild of its remote node.
    pub fn mark_as_need_rebuild(&mut self) {
        self.state = AssetState::NeedRebuild;
        self.last_result = StateResult::None;

        self.has_been_loaded = true;
        self.pending_delete = false;
        self.recook_requested = false;
        self.rebuild_requested = true;
        self.fully_loaded = false;

        for param in self.parameters.iter_mut().filter(|p| p.is_live()) {
            param.mark_changed(true);
            param.set_needs_trigger_update(true);
        }
        for input in self.inputs.iter_mut().filter(|i| i.is_live()) {
            input.mark_changed(true);
            input.set_needs_trigger_update(true);
            input.mark_data_upload_needed(true);
        }

        self.clear_refine_meshes_timer();
    }

    /// Restores the instance after a load from a save: the remote node is
    /// gone and must be reinstantiated.
    pub fn prepare_after_load(&mut self) {
        self.mark_as_need_instantiation();
        self.has_been_duplicated = false;
    }

    /// Restores the instance after being duplicated from another one: the
    /// duplicate needs its own remote node, and the loaded flag is kept so
    /// edited values are reapplied to it.
    pub fn prepare_after_duplicate(&mut self) {
        self.mark_as_need_instantiation();
        self.has_been_duplicated = true;
        self.state = AssetState::PreInstantiation;
        self.last_result = StateResult::None;
    }

    /// Marks post-duplication fixups as done.
    pub fn finish_duplication(&mut self) {
        self.has_been_duplicated = false;
    }

    // --- change aggregation ---

    /// Whether this instance needs to re-run its computation.
    ///
    /// Parameters are checked before inputs before outputs; the first armed
    /// signal short-circuits. The order only matters for the early exit —
    /// the result is a boolean OR over all signals.
    pub fn need_update(&self) -> bool {
        if self.asset.is_none() {
            return false;
        }

        // Nothing may cook on change and nobody asked for one.
        if !self.cook_on_parameter_change && !self.recook_requested && !self.rebuild_requested {
            return false;
        }

        if self.cook_on_transform_change && self.transform_changed {
            return true;
        }

        if self
            .parameters
            .iter()
            .filter(|p| p.is_live())
            .any(|p| p.is_update_armed())
        {
            return true;
        }

        if self
            .inputs
            .iter()
            .filter(|i| i.is_live())
            .any(|i| i.is_update_armed())
        {
            return true;
        }

        self.outputs
            .iter()
            .filter(|o| o.is_live())
            .any(|o| o.needs_editable_curve_trigger())
    }

    /// Whether any output needs a lighter-weight refresh (no recook):
    /// edited instanced outputs or changed curve export types.
    pub fn need_output_update(&self) -> bool {
        self.outputs
            .iter()
            .filter(|o| o.is_live())
            .any(|o| o.needs_output_refresh())
    }

    // --- entity matching ---

    /// Finds the owned parameter matching a candidate from a freshly
    /// fetched definition, so edited values can be rebound instead of
    /// discarded.
    pub fn find_matching_parameter(&self, candidate: &Parameter) -> Option<&Parameter> {
        if !candidate.is_live() {
            return None;
        }
        self.parameters
            .iter()
            .filter(|p| p.is_live())
            .find(|p| p.matches(candidate))
    }

    /// Finds the owned input matching a candidate from a freshly fetched
    /// definition.
    pub fn find_matching_input(&self, candidate: &Input) -> Option<&Input> {
        if !candidate.is_live() {
            return None;
        }
        self.inputs
            .iter()
            .filter(|i| i.is_live())
            .find(|i| i.matches(candidate))
    }

    /// Finds the owned handle matching a candidate from a freshly fetched
    /// definition.
    pub fn find_matching_handle(&self, candidate: &Handle) -> Option<&Handle> {
        if !candidate.is_live() {
            return None;
        }
        self.handles
            .iter()
            .filter(|h| h.is_live())
            .find(|h| h.matches(candidate))
    }

    /// Finds an owned parameter by name.
    pub fn find_parameter_by_name(&self, name: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .filter(|p| p.is_live())
            .find(|p| p.name() == name)
    }

    /// Replaces the parameter interface with a freshly fetched one,
    /// rebinding edited values from matching old parameters.
    pub fn adopt_parameter_interface(&mut self, mut fresh: Vec<Parameter>) {
        for new_param in fresh.iter_mut() {
            if let Some(previous) = self.find_matching_parameter(new_param) {
                new_param.adopt_value_from(previous);
            }
        }
        self.parameters = fresh;
    }

    // --- input presets ---

    /// Stores preset object-to-slot assignments, to be applied exactly
    /// once after the first successful instantiation.
    pub fn set_input_presets(&mut self, presets: Vec<InputPreset>) {
        self.input_presets = presets;
    }

    /// Pending preset assignments.
    pub fn input_presets(&self) -> &[InputPreset] {
        &self.input_presets
    }

    /// Applies and consumes the stored input presets.
    ///
    /// Curve inputs are not preset targets. Landscape and Asset slots are
    /// singleton-only: a second assignment to an occupied slot of those
    /// kinds is dropped. Afterwards each input is retyped to the kind
    /// holding the most objects (Landscape, then World, then Asset, then
    /// Geometry on ties); a non-Geometry kind chosen by the user is only
    /// retyped when the input holds no objects of that kind.
    pub fn apply_input_presets(&mut self) {
        if self.input_presets.is_empty() {
            return;
        }

        let slots: Vec<usize> = self
            .inputs
            .iter()
            .enumerate()
            .filter(|(_, input)| input.is_live() && input.kind() != InputKind::Curve)
            .map(|(index, _)| index)
            .collect();

        for preset in std::mem::take(&mut self.input_presets) {
            let Some(&input_index) = slots.get(preset.slot) else {
                log::warn!(
                    "Instance {}: preset slot {} has no matching input",
                    self.guid,
                    preset.slot
                );
                continue;
            };
            let input = &mut self.inputs[input_index];
            match preset.object {
                PresetObject::Landscape(id) => {
                    if input.object_count(InputKind::Landscape) == 0 {
                        input.set_object_at(InputKind::Landscape, 0, InputObject::Landscape(id));
                    }
                }
                PresetObject::Actor(id) => {
                    let at = input.object_count(InputKind::World);
                    input.set_object_at(InputKind::World, at, InputObject::World(id));
                }
                PresetObject::StaticMesh(id) => {
                    let at = input.object_count(InputKind::Geometry);
                    input.set_object_at(InputKind::Geometry, at, InputObject::Geometry(id));
                }
                PresetObject::AssetInstance(guid) => {
                    if input.object_count(InputKind::Asset) == 0 {
                        input.set_object_at(InputKind::Asset, 0, InputObject::Asset(guid));
                    }
                }
            }
        }

        // The objects are placed; now pick each input's kind by majority.
        for input in self.inputs.iter_mut().filter(|i| i.is_live()) {
            let Some(winner) = vote_input_kind(input) else {
                continue;
            };
            if input.kind() == InputKind::Geometry && winner != InputKind::Geometry {
                input.set_kind(winner);
            } else if input.active_object_count() == 0 {
                // The kind was preset to something else; only retype it if
                // that kind ended up empty.
                input.set_kind(winner);
            }
        }
    }

    // --- proxy-output queries ---

    /// Whether any live output still has a proxy recorded.
    pub fn has_any_proxy_output(&self) -> bool {
        self.outputs
            .iter()
            .filter(|o| o.is_live())
            .any(Output::has_any_proxy)
    }

    /// Whether any live output has a proxy representing the latest cook.
    pub fn has_any_current_proxy_output(&self) -> bool {
        self.outputs
            .iter()
            .filter(|o| o.is_live())
            .any(Output::has_any_current_proxy)
    }

    /// Whether any live output placed a component in the scene.
    pub fn has_any_output_component(&self) -> bool {
        self.outputs
            .iter()
            .filter(|o| o.is_live())
            .any(Output::has_any_component)
    }

    /// Whether `id` was generated by any live output of this instance.
    pub fn has_output_object(&self, id: ObjectId) -> bool {
        self.outputs
            .iter()
            .filter(|o| o.is_live())
            .any(|o| o.references_object(id))
    }

    // --- proxy refinement timer ---

    /// Schedules (or clears) the proxy auto-refinement timer according to
    /// the layered settings. Any previously pending timer is cancelled
    /// first, so at most one callback is pending per instance.
    pub fn set_refine_meshes_timer(&mut self, settings: &RuntimeSettings) {
        self.clear_refine_meshes_timer();

        let Some(timers) = &self.timers else {
            log::error!(
                "Instance {}: cannot set refinement timer, no timer service attached",
                self.guid
            );
            return;
        };

        if self.proxy_overrides.refinement_by_timer_enabled(settings) {
            let timeout = self.proxy_overrides.auto_refine_timeout_seconds(settings);
            let handle = timers.schedule_once(Duration::from_secs_f32(timeout));
            self.refine_timer = Some(handle);
        }
    }

    /// Cancels the pending refinement timer, if any.
    pub fn clear_refine_meshes_timer(&mut self) {
        let Some(handle) = self.refine_timer.take() else {
            return;
        };
        match &self.timers {
            Some(timers) => timers.cancel(handle),
            None => log::error!(
                "Instance {}: cannot clear refinement timer, no timer service attached",
                self.guid
            ),
        }
    }

    /// The pending refinement-timer handle, if any.
    pub fn refine_timer(&self) -> Option<TimerHandle> {
        self.refine_timer
    }

    /// Called by the driver when the refinement timer fires: requests
    /// refinement of this instance's proxy outputs.
    pub fn on_refine_timer_fired(&mut self) {
        self.refine_timer = None;
        match &self.events {
            Some(events) => {
                if let Err(e) = events.send(RuntimeEvent::RefineProxiesRequested(self.guid)) {
                    log::error!("Instance {}: failed to publish refine request: {e}", self.guid);
                }
            }
            None => log::warn!(
                "Instance {}: refinement timer fired with no event channel attached",
                self.guid
            ),
        }
    }

    // --- downstream bookkeeping (registry-managed) ---

    /// The instances currently recorded as consuming this one as an
    /// Asset-kind input.
    pub fn downstream_consumers(&self) -> impl Iterator<Item = ComponentGuid> + '_ {
        self.downstream.iter().copied()
    }

    pub(crate) fn add_downstream(&mut self, consumer: ComponentGuid) {
        self.downstream.insert(consumer);
    }

    pub(crate) fn remove_downstream(&mut self, consumer: &ComponentGuid) {
        self.downstream.remove(consumer);
    }

    // --- teardown ---

    /// Marks this instance as scheduled for destruction by the host.
    pub fn retire(&mut self) {
        self.live = false;
    }

    /// Severs everything before the instance is dropped: the correlation
    /// token is invalidated, the refinement timer cancelled, and all owned
    /// entities retired and released.
    pub(crate) fn prepare_for_removal(&mut self) {
        self.correlation = None;
        self.clear_refine_meshes_timer();

        for param in &mut self.parameters {
            param.retire();
        }
        self.parameters.clear();
        for input in &mut self.inputs {
            input.retire();
        }
        self.inputs.clear();
        for output in &mut self.outputs {
            output.clear();
            output.retire();
        }
        self.outputs.clear();
        for handle in &mut self.handles {
            handle.retire();
        }
        self.handles.clear();
    }
}

impl Live for AssetInstance {
    fn is_live(&self) -> bool {
        self.live
    }
}

/// Picks the input kind holding the most objects.
///
/// Ties resolve in Landscape, World, Asset, Geometry order. Returns `None`
/// when no votable kind holds any object.
fn vote_input_kind(input: &Input) -> Option<InputKind> {
    let geo = input.object_count(InputKind::Geometry);
    let asset = input.object_count(InputKind::Asset);
    let world = input.object_count(InputKind::World);
    let landscape = input.object_count(InputKind::Landscape);

    if landscape > 0 && landscape >= geo && landscape >= asset && landscape >= world {
        Some(InputKind::Landscape)
    } else if world > 0 && world >= geo && world >= asset && world >= landscape {
        Some(InputKind::World)
    } else if asset > 0 && asset >= geo && asset >= world && asset >= landscape {
        Some(InputKind::Asset)
    } else if geo > 0 && geo >= asset && geo >= world && geo >= landscape {
        Some(InputKind::Geometry)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{CurveComponent, GeneratedComponent, OutputIdentifier, OutputKind, OutputObject};
    use crate::parameter::ParameterValue;
    use std::sync::Mutex;

    fn settings() -> RuntimeSettings {
        RuntimeSettings::default()
    }

    fn bound_instance() -> AssetInstance {
        AssetInstance::new(&settings()).with_asset(AssetDefinition::new("boulder_field"))
    }

    /// Records scheduled and cancelled handles for assertions.
    #[derive(Default)]
    struct RecordingTimer {
        next: Mutex<u64>,
        scheduled: Mutex<Vec<TimerHandle>>,
        cancelled: Mutex<Vec<TimerHandle>>,
    }

    impl TimerService for RecordingTimer {
        fn schedule_once(&self, _delay: Duration) -> TimerHandle {
            let mut next = self.next.lock().unwrap();
            *next += 1;
            let handle = TimerHandle::new(*next);
            self.scheduled.lock().unwrap().push(handle);
            handle
        }

        fn cancel(&self, handle: TimerHandle) {
            self.cancelled.lock().unwrap().push(handle);
        }
    }

    fn editable_curve_output(needs_trigger: bool) -> Output {
        let mut output = Output::new(OutputKind::Curve);
        output.set_editable_node(true);
        output.insert_output_object(
            OutputIdentifier {
                object_node: 0,
                geo_node: 0,
                part: 0,
            },
            OutputObject {
                component: Some(GeneratedComponent::Curve(CurveComponent {
                    id: ObjectId::new(),
                    is_output_curve: false,
                    needs_trigger_update: needs_trigger,
                })),
                ..Default::default()
            },
        );
        output
    }

    #[test]
    fn test_new_instance_starts_pre_instantiation() {
        let instance = bound_instance();
        assert_eq!(instance.state(), AssetState::PreInstantiation);
        assert_eq!(instance.last_result(), StateResult::None);
        assert!(!instance.node_id().is_valid());
        assert!(!instance.is_instantiating_or_cooking());
        assert!(instance.cook_on_parameter_change);
        assert!(instance.cook_on_upstream_asset_cook);
        assert!(!instance.cook_on_transform_change);
    }

    #[test]
    fn test_mark_need_instantiation_state_depends_on_interface() {
        let mut empty = bound_instance();
        empty.set_state(AssetState::None);
        empty.mark_as_need_instantiation();
        assert_eq!(empty.state(), AssetState::PreInstantiation);

        let mut cooked = bound_instance();
        cooked.add_parameter(Parameter::new("size", ParameterValue::Float(vec![1.0])));
        cooked.set_state(AssetState::None);
        cooked.mark_as_need_instantiation();
        assert_eq!(cooked.state(), AssetState::NeedInstantiation);
    }

    #[test]
    fn test_mark_need_instantiation_suppresses_triggers() {
        let mut instance = bound_instance();
        instance.add_parameter(Parameter::new("size", ParameterValue::Float(vec![1.0])));
        instance.add_input(Input::new("terrain", InputKind::Geometry));
        instance.set_node_id(NodeId::new(7));

        instance.mark_as_need_instantiation();

        assert!(!instance.node_id().is_valid());
        assert_eq!(instance.cook_count(), 0);
        let param = &instance.parameters()[0];
        assert!(param.has_changed());
        assert!(!param.needs_trigger_update());
        let input = &instance.inputs()[0];
        assert!(input.has_changed());
        assert!(!input.needs_trigger_update());
        assert!(input.needs_data_upload());
        // Dirty-but-suppressed items must not force a cook.
        assert!(!instance.need_update());
    }

    #[test]
    fn test_mark_need_instantiation_is_idempotent() {
        let mut instance = bound_instance();
        instance.add_parameter(Parameter::new("size", ParameterValue::Float(vec![1.0])));
        instance.mark_as_need_instantiation();

        let state = instance.state();
        let cooks = instance.cook_count();
        instance.mark_as_need_instantiation();

        assert_eq!(instance.state(), state);
        assert_eq!(instance.cook_count(), cooks);
        assert!(instance.parameters()[0].has_changed());
        assert!(!instance.parameters()[0].needs_trigger_update());
    }

    #[test]
    fn test_mark_need_cook_arms_everything_without_touching_state() {
        let mut instance = bound_instance();
        instance.add_parameter(Parameter::new("size", ParameterValue::Float(vec![1.0])));
        instance.add_input(Input::new("terrain", InputKind::Geometry));
        instance.set_state(AssetState::None);

        instance.mark_as_need_cook();

        assert_eq!(instance.state(), AssetState::None);
        assert!(instance.recook_requested());
        assert!(!instance.rebuild_requested());
        assert!(instance.parameters()[0].is_update_armed());
        assert!(instance.inputs()[0].is_update_armed());
        assert!(instance.inputs()[0].needs_data_upload());
        assert!(instance.need_update());
    }

    #[test]
    fn test_mark_need_rebuild_sets_state_and_request() {
        let mut instance = bound_instance();
        instance.add_parameter(Parameter::new("size", ParameterValue::Float(vec![1.0])));
        instance.set_state(AssetState::None);
        instance.set_last_result(StateResult::Success);

        instance.mark_as_need_rebuild();

        assert_eq!(instance.state(), AssetState::NeedRebuild);
        assert_eq!(instance.last_result(), StateResult::None);
        assert!(instance.rebuild_requested());
        assert!(!instance.recook_requested());
        assert!(instance.parameters()[0].is_update_armed());
    }

    #[test]
    fn test_need_update_requires_a_bound_definition() {
        let mut instance = AssetInstance::new(&settings());
        instance.add_parameter(Parameter::new("size", ParameterValue::Float(vec![1.0])));
        instance.parameter_mut(0).unwrap().mark_changed(true);
        assert!(!instance.need_update());
    }

    #[test]
    fn test_need_update_gated_by_cook_on_parameter_change() {
        let mut instance = bound_instance();
        instance.cook_on_parameter_change = false;
        instance.cook_on_transform_change = true;
        instance.mark_fully_loaded();
        instance.set_transform_changed(true);
        instance.add_parameter(Parameter::new("size", ParameterValue::Float(vec![1.0])));
        instance.parameter_mut(0).unwrap().mark_changed(true);

        // Gate closed: no recook/rebuild requested, cooking on change off.
        assert!(!instance.need_update());

        instance.mark_as_need_cook();
        assert!(instance.need_update());
    }

    #[test]
    fn test_need_update_truth_table() {
        // Enumerate every combination of the four trigger sources; the
        // aggregation must be their boolean OR.
        for bits in 0u32..16 {
            let transform = bits & 1 != 0;
            let param = bits & 2 != 0;
            let input = bits & 4 != 0;
            let curve = bits & 8 != 0;

            let mut instance = bound_instance();
            instance.cook_on_transform_change = true;
            instance.mark_fully_loaded();
            instance.set_transform_changed(transform);

            let mut p = Parameter::new("size", ParameterValue::Float(vec![1.0]));
            if param {
                p.mark_changed(true);
            }
            instance.add_parameter(p);

            let mut i = Input::new("terrain", InputKind::Geometry);
            if input {
                i.mark_changed(true);
            }
            instance.add_input(i);

            instance.add_output(editable_curve_output(curve));

            assert_eq!(
                instance.need_update(),
                transform || param || input || curve,
                "combination {bits:#06b}"
            );
        }
    }

    #[test]
    fn test_need_output_update_is_independent() {
        let mut instance = bound_instance();
        let mut output = Output::new(OutputKind::Instancer);
        let id = OutputIdentifier {
            object_node: 0,
            geo_node: 0,
            part: 0,
        };
        output.insert_instanced_output(id, Default::default());
        instance.add_output(output);

        assert!(!instance.need_output_update());
        instance
            .output_mut(0)
            .unwrap()
            .mark_instanced_output_changed(&id, true);
        assert!(instance.need_output_update());
        // An output refresh does not imply a recook.
        assert!(!instance.need_update());
    }

    #[test]
    fn test_transform_edits_ignored_until_fully_loaded() {
        let mut instance = bound_instance();
        instance.cook_on_transform_change = true;

        instance.set_transform_changed(true);
        assert!(!instance.transform_changed_since_last_cook());

        instance.mark_fully_loaded();
        instance.set_transform_changed(true);
        assert!(instance.transform_changed_since_last_cook());
        assert!(instance.need_update());
    }

    #[test]
    fn test_remote_operation_bracket_is_exclusive() {
        let mut instance = bound_instance();
        let token = instance.begin_remote_operation().expect("first bracket");
        assert!(instance.is_instantiating_or_cooking());
        assert_eq!(instance.correlation_token(), Some(token));

        assert_eq!(
            instance.begin_remote_operation(),
            Err(RuntimeError::RemoteOperationPending(instance.guid()))
        );

        instance.complete_cook(true);
        assert!(!instance.is_instantiating_or_cooking());
        assert!(instance.begin_remote_operation().is_ok());
    }

    #[test]
    fn test_successful_cook_advances_counter_and_clears_requests() {
        let mut instance = bound_instance();
        instance.cook_on_transform_change = true;
        instance.mark_fully_loaded();
        instance.set_transform_changed(true);
        instance.mark_as_need_cook();

        instance.begin_remote_operation().unwrap();
        instance.complete_cook(true);

        assert_eq!(instance.cook_count(), 1);
        assert_eq!(instance.last_result(), StateResult::Success);
        assert!(!instance.recook_requested());
        assert!(!instance.transform_changed_since_last_cook());
    }

    #[test]
    fn test_failed_cook_suppresses_triggers_but_keeps_dirt() {
        let mut instance = bound_instance();
        instance.add_parameter(Parameter::new("size", ParameterValue::Float(vec![1.0])));
        instance
            .parameter_mut(0)
            .unwrap()
            .set_value(ParameterValue::Float(vec![2.0]));
        assert!(instance.need_update());

        instance.begin_remote_operation().unwrap();
        instance.complete_cook(false);

        assert_eq!(instance.last_result(), StateResult::Failed);
        assert_eq!(instance.cook_count(), 0);
        let param = &instance.parameters()[0];
        assert!(param.has_changed());
        // The failed upload must not spin-loop the trigger.
        assert!(!instance.need_update());

        // The next explicit edit re-arms it.
        instance
            .parameter_mut(0)
            .unwrap()
            .set_value(ParameterValue::Float(vec![3.0]));
        assert!(instance.need_update());
    }

    #[test]
    fn test_failed_instantiation_keeps_invalid_node() {
        let mut instance = bound_instance();
        instance.begin_remote_operation().unwrap();
        instance.complete_instantiation(false, NodeId::new(3));
        assert!(!instance.node_id().is_valid());
        assert_eq!(instance.last_result(), StateResult::Failed);

        instance.begin_remote_operation().unwrap();
        instance.complete_instantiation(true, NodeId::new(3));
        assert_eq!(instance.node_id(), NodeId::new(3));
    }

    #[test]
    fn test_matching_rebinds_edited_values() {
        let mut instance = bound_instance();
        let mut edited = Parameter::new("seed", ParameterValue::Int(vec![0]));
        edited.set_value(ParameterValue::Int(vec![42]));
        instance.add_parameter(edited);
        instance.add_parameter(Parameter::new("size", ParameterValue::Float(vec![1.0])));

        // The freshly fetched interface renames "size" away and keeps
        // "seed" with the same signature.
        let fresh = vec![
            Parameter::new("seed", ParameterValue::Int(vec![0])),
            Parameter::new("scale", ParameterValue::Float(vec![1.0])),
        ];
        instance.adopt_parameter_interface(fresh);

        assert_eq!(
            instance.find_parameter_by_name("seed").unwrap().value(),
            &ParameterValue::Int(vec![42])
        );
        assert_eq!(
            instance.find_parameter_by_name("scale").unwrap().value(),
            &ParameterValue::Float(vec![1.0])
        );
        assert!(instance.find_parameter_by_name("size").is_none());
    }

    #[test]
    fn test_non_live_entities_are_skipped() {
        let mut instance = bound_instance();
        instance.add_parameter(Parameter::new("size", ParameterValue::Float(vec![1.0])));
        instance.parameter_mut(0).unwrap().mark_changed(true);
        instance.parameter_mut(0).unwrap().retire();

        assert!(!instance.need_update());
        let candidate = Parameter::new("size", ParameterValue::Float(vec![0.0]));
        assert!(instance.find_matching_parameter(&candidate).is_none());
    }

    #[test]
    fn test_refine_timer_single_pending_invariant() {
        let timers = Arc::new(RecordingTimer::default());
        let mut instance = bound_instance();
        instance.set_timer_service(timers.clone());

        let settings = settings();
        instance.set_refine_meshes_timer(&settings);
        let first = instance.refine_timer().expect("timer scheduled");

        instance.set_refine_meshes_timer(&settings);
        let second = instance.refine_timer().expect("timer rescheduled");

        assert_ne!(first, second);
        // The first handle was cancelled before the second was scheduled.
        assert_eq!(*timers.cancelled.lock().unwrap(), vec![first]);
    }

    #[test]
    fn test_refine_timer_respects_settings() {
        let timers = Arc::new(RecordingTimer::default());
        let mut instance = bound_instance();
        instance.set_timer_service(timers.clone());

        let mut disabled = settings();
        disabled.enable_proxy_refinement_by_timer = false;
        instance.set_refine_meshes_timer(&disabled);
        assert!(instance.refine_timer().is_none());
        assert!(timers.scheduled.lock().unwrap().is_empty());
    }

    #[test]
    fn test_mark_ops_cancel_pending_refine_timer() {
        let timers = Arc::new(RecordingTimer::default());
        let mut instance = bound_instance();
        instance.set_timer_service(timers.clone());
        instance.set_refine_meshes_timer(&settings());
        let handle = instance.refine_timer().unwrap();

        instance.mark_as_need_cook();
        assert!(instance.refine_timer().is_none());
        assert_eq!(*timers.cancelled.lock().unwrap(), vec![handle]);
    }

    #[test]
    fn test_missing_timer_service_is_a_logged_noop() {
        let mut instance = bound_instance();
        instance.set_refine_meshes_timer(&settings());
        assert!(instance.refine_timer().is_none());
    }

    #[test]
    fn test_refine_timer_fired_publishes_event() {
        let (sender, receiver) = flume::unbounded();
        let timers = Arc::new(RecordingTimer::default());
        let mut instance = bound_instance();
        instance.set_timer_service(timers);
        instance.set_event_sender(sender);
        instance.set_refine_meshes_timer(&settings());

        instance.on_refine_timer_fired();
        assert!(instance.refine_timer().is_none());
        assert_eq!(
            receiver.try_recv(),
            Ok(RuntimeEvent::RefineProxiesRequested(instance.guid()))
        );
    }

    #[test]
    fn test_preset_majority_vote_retypes_geometry_input() {
        let mut instance = bound_instance();
        instance.add_input(Input::new("terrain", InputKind::Geometry));
        instance.set_input_presets(vec![
            InputPreset {
                object: PresetObject::Actor(ObjectId::new()),
                slot: 0,
            },
            InputPreset {
                object: PresetObject::Actor(ObjectId::new()),
                slot: 0,
            },
            InputPreset {
                object: PresetObject::StaticMesh(ObjectId::new()),
                slot: 0,
            },
        ]);

        instance.apply_input_presets();

        let input = &instance.inputs()[0];
        assert_eq!(input.kind(), InputKind::World);
        assert_eq!(input.object_count(InputKind::World), 2);
        assert_eq!(input.object_count(InputKind::Geometry), 1);
        assert!(instance.input_presets().is_empty());
    }

    #[test]
    fn test_preset_tie_prefers_landscape_over_world() {
        let mut instance = bound_instance();
        instance.add_input(Input::new("terrain", InputKind::Geometry));
        instance.set_input_presets(vec![
            InputPreset {
                object: PresetObject::Landscape(ObjectId::new()),
                slot: 0,
            },
            InputPreset {
                object: PresetObject::Actor(ObjectId::new()),
                slot: 0,
            },
        ]);

        instance.apply_input_presets();
        assert_eq!(instance.inputs()[0].kind(), InputKind::Landscape);
    }

    #[test]
    fn test_preset_singleton_slots_drop_second_assignment() {
        let mut instance = bound_instance();
        instance.add_input(Input::new("terrain", InputKind::Geometry));
        let first = ObjectId::new();
        instance.set_input_presets(vec![
            InputPreset {
                object: PresetObject::Landscape(first),
                slot: 0,
            },
            InputPreset {
                object: PresetObject::Landscape(ObjectId::new()),
                slot: 0,
            },
        ]);

        instance.apply_input_presets();
        let input = &instance.inputs()[0];
        assert_eq!(input.object_count(InputKind::Landscape), 1);
        assert_eq!(
            input.objects_for(InputKind::Landscape)[0],
            InputObject::Landscape(first)
        );
    }

    #[test]
    fn test_preset_skips_curve_inputs() {
        let mut instance = bound_instance();
        instance.add_input(Input::new("profile", InputKind::Curve));
        instance.add_input(Input::new("terrain", InputKind::Geometry));
        instance.set_input_presets(vec![InputPreset {
            object: PresetObject::StaticMesh(ObjectId::new()),
            slot: 0,
        }]);

        instance.apply_input_presets();

        // Slot 0 addresses the first non-curve input.
        assert_eq!(instance.inputs()[0].object_count(InputKind::Geometry), 0);
        assert_eq!(instance.inputs()[1].object_count(InputKind::Geometry), 1);
    }

    #[test]
    fn test_preset_application_is_consumed_once() {
        let mut instance = bound_instance();
        instance.add_input(Input::new("terrain", InputKind::Geometry));
        instance.set_input_presets(vec![InputPreset {
            object: PresetObject::StaticMesh(ObjectId::new()),
            slot: 0,
        }]);

        instance.apply_input_presets();
        assert_eq!(instance.inputs()[0].object_count(InputKind::Geometry), 1);

        // A second application finds no presets left.
        instance.apply_input_presets();
        assert_eq!(instance.inputs()[0].object_count(InputKind::Geometry), 1);
    }

    #[test]
    fn test_preset_keeps_user_preset_kind_when_occupied() {
        let mut instance = bound_instance();
        let mut input = Input::new("collision", InputKind::World);
        input.push_object(InputObject::World(ObjectId::new()));
        instance.add_input(input);
        instance.set_input_presets(vec![
            InputPreset {
                object: PresetObject::StaticMesh(ObjectId::new()),
                slot: 0,
            },
            InputPreset {
                object: PresetObject::StaticMesh(ObjectId::new()),
                slot: 0,
            },
        ]);

        instance.apply_input_presets();
        // Geometry won the vote, but the input was deliberately typed World
        // and holds a World object, so the kind is kept.
        assert_eq!(instance.inputs()[0].kind(), InputKind::World);
    }

    #[test]
    fn test_duplicate_preparation() {
        let mut instance = bound_instance();
        instance.add_parameter(Parameter::new("size", ParameterValue::Float(vec![1.0])));
        instance.set_state(AssetState::None);

        instance.prepare_after_duplicate();
        assert!(instance.has_been_duplicated());
        // Duplicates always reinstantiate eagerly, even with an interface.
        assert_eq!(instance.state(), AssetState::PreInstantiation);

        instance.finish_duplication();
        assert!(!instance.has_been_duplicated());
    }

    #[test]
    fn test_load_preparation() {
        let mut instance = bound_instance();
        instance.add_parameter(Parameter::new("size", ParameterValue::Float(vec![1.0])));
        instance.prepare_after_load();
        assert!(instance.has_been_loaded());
        assert!(!instance.has_been_duplicated());
        assert_eq!(instance.state(), AssetState::NeedInstantiation);
    }
}
