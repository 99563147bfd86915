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

//! Inputs feeding host data into an asset instance.
//!
//! An input keeps one object list per [`InputKind`] and switches its active
//! kind without discarding the others, so retyping an input back and forth
//! never loses assignments. Asset-kind objects reference other asset
//! instances by [`ComponentGuid`]; those references are what the dependency
//! graph is built from.

use kiln_core::asset::{ComponentGuid, ObjectId};
use kiln_core::change::{ChangeTracked, DirtyFlags, Live};
use std::collections::BTreeMap;

/// The categories of data an input can feed to the remote engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InputKind {
    /// Geometry assets from the host library.
    Geometry,
    /// A curve authored directly on the instance.
    Curve,
    /// The cooked output of another asset instance.
    Asset,
    /// A terrain object.
    Landscape,
    /// An arbitrary actor from the host scene.
    World,
}

/// One object referenced by an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputObject {
    /// A geometry asset.
    Geometry(ObjectId),
    /// An authored curve.
    Curve(ObjectId),
    /// Another asset instance, referenced by identity.
    Asset(ComponentGuid),
    /// A terrain object.
    Landscape(ObjectId),
    /// A scene actor.
    World(ObjectId),
}

impl InputObject {
    /// The kind of input this object belongs to.
    pub fn kind(&self) -> InputKind {
        match self {
            InputObject::Geometry(_) => InputKind::Geometry,
            InputObject::Curve(_) => InputKind::Curve,
            InputObject::Asset(_) => InputKind::Asset,
            InputObject::Landscape(_) => InputKind::Landscape,
            InputObject::World(_) => InputKind::World,
        }
    }

    /// The referenced instance, for Asset-kind objects.
    pub fn as_asset_instance(&self) -> Option<ComponentGuid> {
        match self {
            InputObject::Asset(guid) => Some(*guid),
            _ => None,
        }
    }
}

/// One input of an asset instance.
#[derive(Debug, Clone)]
pub struct Input {
    name: String,
    kind: InputKind,
    objects: BTreeMap<InputKind, Vec<InputObject>>,
    dirty: DirtyFlags,
    needs_data_upload: bool,
    live: bool,
}

impl Input {
    /// Creates an input with the given active kind and no objects.
    pub fn new(name: impl Into<String>, kind: InputKind) -> Self {
        Self {
            name: name.into(),
            kind,
            objects: BTreeMap::new(),
            dirty: DirtyFlags::default(),
            needs_data_upload: false,
            live: true,
        }
    }

    /// The input name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The currently active kind.
    pub fn kind(&self) -> InputKind {
        self.kind
    }

    /// Switches the active kind. A real switch dirties the input; the
    /// object lists of all kinds are preserved.
    pub fn set_kind(&mut self, kind: InputKind) {
        if kind == self.kind {
            return;
        }
        self.kind = kind;
        self.dirty.mark(true);
        self.needs_data_upload = true;
    }

    /// The objects assigned for one kind.
    pub fn objects_for(&self, kind: InputKind) -> &[InputObject] {
        self.objects.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of objects assigned for one kind.
    pub fn object_count(&self, kind: InputKind) -> usize {
        self.objects_for(kind).len()
    }

    /// Number of objects assigned for the currently active kind.
    pub fn active_object_count(&self) -> usize {
        self.object_count(self.kind)
    }

    /// Appends an object to the list of its own kind.
    pub fn push_object(&mut self, object: InputObject) {
        self.objects.entry(object.kind()).or_default().push(object);
        self.dirty.mark(true);
        self.needs_data_upload = true;
    }

    /// Places an object at `index` in the list of `kind`, replacing what is
    /// there or appending when `index` equals the list length. Mismatched
    /// kinds and out-of-range indices are skipped with a warning rather
    /// than aborting the caller's pass.
    pub fn set_object_at(&mut self, kind: InputKind, index: usize, object: InputObject) {
        if object.kind() != kind {
            log::warn!(
                "Input '{}': object of kind {:?} cannot be assigned to a {:?} slot",
                self.name,
                object.kind(),
                kind
            );
            return;
        }
        let list = self.objects.entry(kind).or_default();
        if index < list.len() {
            list[index] = object;
        } else if index == list.len() {
            list.push(object);
        } else {
            log::warn!(
                "Input '{}': index {} out of range for {} {:?} object(s)",
                self.name,
                index,
                list.len(),
                kind
            );
            return;
        }
        self.dirty.mark(true);
        self.needs_data_upload = true;
    }

    /// Returns `true` if any Asset-kind object references `guid`.
    pub fn references_instance(&self, guid: ComponentGuid) -> bool {
        self.objects_for(InputKind::Asset)
            .iter()
            .any(|object| object.as_asset_instance() == Some(guid))
    }

    /// Removes every Asset-kind reference to `guid`, returning whether
    /// anything was removed. A removal dirties the input.
    pub fn remove_asset_instance(&mut self, guid: ComponentGuid) -> bool {
        let Some(list) = self.objects.get_mut(&InputKind::Asset) else {
            return false;
        };
        let before = list.len();
        list.retain(|object| object.as_asset_instance() != Some(guid));
        let removed = list.len() != before;
        if removed {
            self.dirty.mark(true);
            self.needs_data_upload = true;
        }
        removed
    }

    /// Whether the input's data must be re-uploaded before the next cook.
    pub fn needs_data_upload(&self) -> bool {
        self.needs_data_upload
    }

    /// Sets or clears the upload requirement.
    pub fn mark_data_upload_needed(&mut self, needed: bool) {
        self.needs_data_upload = needed;
    }

    /// Identity match against a candidate from a freshly fetched
    /// definition: inputs match by name.
    pub fn matches(&self, other: &Input) -> bool {
        self.name == other.name
    }

    /// Marks this input as scheduled for destruction by the host.
    pub fn retire(&mut self) {
        self.live = false;
    }
}

impl ChangeTracked for Input {
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

impl Live for Input {
    fn is_live(&self) -> bool {
        self.live
    }
}
