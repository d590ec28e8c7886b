//! Lua scripting bridge
//!
//! Scripts run in a sandboxed Lua 5.4 VM and talk to the host through a
//! fixed set of userdata types (`Volume`, `Box`, `Image`, `Layer`, `File`)
//! and the `goxel` registration table.

pub mod sandbox;
pub mod marshal;
pub mod handles;
pub mod volume_api;
pub mod box_api;
pub mod image_api;
pub mod file_api;
pub mod registry;
pub mod api;
pub mod host;

pub use api::ScriptLogEntry;
pub use handles::{BridgeStats, VolumeHandle};
pub use host::ScriptHost;
pub use registry::{CommandRegistry, FormatHandler, FormatMode, FormatRegistry, ScriptCommand};
