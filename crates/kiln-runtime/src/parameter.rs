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

//! Parameters exposed by an instantiated asset definition.

use kiln_core::change::{ChangeTracked, DirtyFlags, Live};

/// The value categories a parameter can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    /// One or more floats (vector parameters use the tuple size).
    Float,
    /// One or more integers.
    Int,
    /// A string value.
    String,
    /// An on/off toggle.
    Toggle,
    /// An RGBA color.
    Color,
}

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    /// Float tuple, one entry per component.
    Float(Vec<f32>),
    /// Integer tuple, one entry per component.
    Int(Vec<i64>),
    /// String value.
    String(String),
    /// Toggle value.
    Toggle(bool),
    /// RGBA color.
    Color([f32; 4]),
}

impl ParameterValue {
    /// The kind this value belongs to.
    pub fn kind(&self) -> ParameterKind {
        match self {
            ParameterValue::Float(_) => ParameterKind::Float,
            ParameterValue::Int(_) => ParameterKind::Int,
            ParameterValue::String(_) => ParameterKind::String,
            ParameterValue::Toggle(_) => ParameterKind::Toggle,
            ParameterValue::Color(_) => ParameterKind::Color,
        }
    }

    /// The number of components in this value.
    pub fn tuple_size(&self) -> usize {
        match self {
            ParameterValue::Float(v) => v.len(),
            ParameterValue::Int(v) => v.len(),
            ParameterValue::String(_) | ParameterValue::Toggle(_) => 1,
            ParameterValue::Color(_) => 4,
        }
    }
}

/// One parameter of an asset instance.
///
/// The identity of a parameter is its name plus type signature (kind and
/// tuple size), not its value; matching by identity is what lets edited
/// values survive a reinstantiation of the underlying definition.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    kind: ParameterKind,
    tuple_size: usize,
    value: ParameterValue,
    dirty: DirtyFlags,
    live: bool,
}

impl Parameter {
    /// Creates a parameter; kind and tuple size are derived from the value.
    pub fn new(name: impl Into<String>, value: ParameterValue) -> Self {
        Self {
            name: name.into(),
            kind: value.kind(),
            tuple_size: value.tuple_size(),
            value,
            dirty: DirtyFlags::default(),
            live: true,
        }
    }

    /// The parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter kind.
    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    /// The number of components.
    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    /// The current value.
    pub fn value(&self) -> &ParameterValue {
        &self.value
    }

    /// Sets a new value, marking the parameter dirty only if the value
    /// actually changed. A value of a different kind is rejected.
    pub fn set_value(&mut self, value: ParameterValue) {
        if value.kind() != self.kind {
            log::warn!(
                "Parameter '{}': ignoring value of kind {:?} (parameter is {:?})",
                self.name,
                value.kind(),
                self.kind
            );
            return;
        }
        if value == self.value {
            return;
        }
        self.value = value;
        self.dirty.mark(true);
    }

    /// Identity match against a candidate from a freshly fetched
    /// definition: same name and type signature.
    pub fn matches(&self, other: &Parameter) -> bool {
        self.name == other.name && self.kind == other.kind && self.tuple_size == other.tuple_size
    }

    /// Copies the edited value and dirty state from an older parameter.
    ///
    /// Used when rebinding user edits onto a freshly fetched interface.
    pub fn adopt_value_from(&mut self, previous: &Parameter) {
        self.value = previous.value.clone();
        self.dirty = previous.dirty;
    }

    /// Marks this parameter as scheduled for destruction by the host.
    pub fn retire(&mut self) {
        self.live = false;
    }
}

impl ChangeTracked for Parameter {
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

impl Live for Parameter {
    fn is_live(&self) -> bool {
        self.live
    }
}
