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

//! # Kiln Runtime
//!
//! The asset-instance runtime: owned entities (parameters, inputs, outputs,
//! handles), the [`AssetInstance`] lifecycle and change aggregation, the
//! process-wide [`InstanceRegistry`], and downstream/upstream dependency
//! propagation across instances.
//!
//! The runtime is single-threaded and cooperative. It never talks to the
//! remote cook engine itself; an external driver loop reads instance state,
//! issues the remote requests, and feeds completions back in. Cross-instance
//! effects (cook notifications, upstream waits) go through the registry so
//! all back-references stay identifier-based and weak.

pub mod error;
pub mod events;
pub mod handle;
pub mod input;
pub mod instance;
pub mod output;
pub mod parameter;
pub mod propagation;
pub mod registry;

pub use error::RuntimeError;
pub use events::{RuntimeEvent, RuntimeEvents};
pub use handle::{Handle, HandleKind};
pub use input::{Input, InputKind, InputObject};
pub use instance::{AssetInstance, InputPreset, PresetObject};
pub use output::{
    CurveComponent, GeneratedComponent, InstancedOutput, Output, OutputIdentifier, OutputKind,
    OutputObject,
};
pub use parameter::{Parameter, ParameterKind, ParameterValue};
pub use registry::InstanceRegistry;
