//! Core types and utilities shared by the volume engine and the scripting bridge

pub mod types;
pub mod error;
pub mod logging;
pub mod config;
pub mod time;

pub use types::*;
pub use error::Error;
pub use config::{EngineConfig, TrustLevel};
