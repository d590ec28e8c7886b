//! voxscript - sparse voxel volumes with a Lua scripting bridge

pub mod core;
pub mod math;
pub mod voxel;
pub mod scripting;
pub mod editor;
