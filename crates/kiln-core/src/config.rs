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

//! Layered runtime configuration.
//!
//! Proxy-mesh behavior is configured globally in [`RuntimeSettings`] and may
//! be overridden per instance through [`ProxyOverrides`]. Every accessor on
//! the override struct takes the global settings and resolves the layering
//! explicitly: the override value when `override_global_settings` is set,
//! the global value otherwise.

use serde::{Deserialize, Serialize};

/// Global runtime settings, typically loaded once from a JSON config source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Generate cheap proxy meshes for cooked outputs before the full
    /// representation is built.
    pub enable_proxy_static_mesh: bool,
    /// Automatically refine proxy meshes into full meshes after a timeout.
    pub enable_proxy_refinement_by_timer: bool,
    /// Delay before timer-based refinement kicks in.
    pub proxy_auto_refine_timeout_seconds: f32,
    /// Refine all proxy meshes before the host saves the scene.
    pub refine_on_pre_save: bool,
    /// Refine all proxy meshes before an interactive session begins.
    pub refine_on_pre_begin_session: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            enable_proxy_static_mesh: true,
            enable_proxy_refinement_by_timer: true,
            proxy_auto_refine_timeout_seconds: 5.0,
            refine_on_pre_save: true,
            refine_on_pre_begin_session: true,
        }
    }
}

impl RuntimeSettings {
    /// Parses settings from a JSON document.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Per-instance proxy-mesh settings, layered over [`RuntimeSettings`].
///
/// A freshly created instance seeds its override values from the global
/// settings (so flipping `override_global_settings` on is initially a
/// no-op), then edits them independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyOverrides {
    /// When set, the fields below win over the global settings.
    pub override_global_settings: bool,
    /// Per-instance override of
    /// [`RuntimeSettings::enable_proxy_static_mesh`].
    pub enable_proxy_static_mesh: bool,
    /// Per-instance override of
    /// [`RuntimeSettings::enable_proxy_refinement_by_timer`].
    pub enable_proxy_refinement_by_timer: bool,
    /// Per-instance override of
    /// [`RuntimeSettings::proxy_auto_refine_timeout_seconds`].
    pub proxy_auto_refine_timeout_seconds: f32,
    /// Per-instance override of [`RuntimeSettings::refine_on_pre_save`].
    pub refine_on_pre_save: bool,
    /// Per-instance override of
    /// [`RuntimeSettings::refine_on_pre_begin_session`].
    pub refine_on_pre_begin_session: bool,
}

impl ProxyOverrides {
    /// Creates per-instance overrides seeded from the global settings,
    /// with the override flag off.
    pub fn seeded_from(settings: &RuntimeSettings) -> Self {
        Self {
            override_global_settings: false,
            enable_proxy_static_mesh: settings.enable_proxy_static_mesh,
            enable_proxy_refinement_by_timer: settings.enable_proxy_refinement_by_timer,
            proxy_auto_refine_timeout_seconds: settings.proxy_auto_refine_timeout_seconds,
            refine_on_pre_save: settings.refine_on_pre_save,
            refine_on_pre_begin_session: settings.refine_on_pre_begin_session,
        }
    }

    /// Whether proxy meshes are enabled for this instance.
    pub fn proxy_static_mesh_enabled(&self, global: &RuntimeSettings) -> bool {
        if self.override_global_settings {
            self.enable_proxy_static_mesh
        } else {
            global.enable_proxy_static_mesh
        }
    }

    /// Whether timer-based refinement is enabled for this instance.
    ///
    /// Refinement requires proxy meshes to be enabled on the same layer.
    pub fn refinement_by_timer_enabled(&self, global: &RuntimeSettings) -> bool {
        if self.override_global_settings {
            self.enable_proxy_static_mesh && self.enable_proxy_refinement_by_timer
        } else {
            global.enable_proxy_static_mesh && global.enable_proxy_refinement_by_timer
        }
    }

    /// The refinement timeout for this instance.
    pub fn auto_refine_timeout_seconds(&self, global: &RuntimeSettings) -> f32 {
        if self.override_global_settings {
            self.proxy_auto_refine_timeout_seconds
        } else {
            global.proxy_auto_refine_timeout_seconds
        }
    }

    /// Whether pre-save refinement is enabled for this instance.
    pub fn refine_on_pre_save_enabled(&self, global: &RuntimeSettings) -> bool {
        if self.override_global_settings {
            self.enable_proxy_static_mesh && self.refine_on_pre_save
        } else {
            global.enable_proxy_static_mesh && global.refine_on_pre_save
        }
    }

    /// Whether pre-session refinement is enabled for this instance.
    pub fn refine_on_pre_begin_session_enabled(&self, global: &RuntimeSettings) -> bool {
        if self.override_global_settings {
            self.enable_proxy_static_mesh && self.refine_on_pre_begin_session
        } else {
            global.enable_proxy_static_mesh && global.refine_on_pre_begin_session
        }
    }
}
