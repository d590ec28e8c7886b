//! Engine configuration, loaded from JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::Error;
use super::types::Result;

/// Controls which Lua standard libraries are available to scripts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    /// string, table, math, utf8: no I/O besides the `std.open` file surface
    #[default]
    Basic,
    /// Basic + Lua's own `io` library
    FileRead,
    /// Full standard library, only for trusted scripts
    Elevated,
}

/// Configuration for the editor host and its scripting engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory whose `*.lua` files are run at startup (registering formats and commands).
    pub scripts_dir: Option<PathBuf>,
    /// Standard library access granted to scripts.
    pub trust_level: TrustLevel,
    /// Update loop rate in frames per second. 0 runs frames back to back.
    pub frame_rate: u32,
    /// Default log filter, used when RUST_LOG is unset.
    pub log_filter: String,
    /// Number of recent script/handler failures kept for display.
    pub max_error_history: usize,
    /// Raise an error when a script reads an undefined global instead of yielding nil.
    pub strict_globals: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scripts_dir: None,
            trust_level: TrustLevel::Basic,
            frame_rate: 60,
            log_filter: "info".to_string(),
            max_error_history: 32,
            strict_globals: true,
        }
    }
}

impl EngineConfig {
    /// Load a config file. Missing fields fall back to their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check field ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.frame_rate > 1000 {
            return Err(Error::Config(format!(
                "frame_rate {} out of range (0-1000)",
                self.frame_rate
            )));
        }
        Ok(())
    }

    /// Duration of one frame, or None when frames are not paced.
    pub fn frame_interval(&self) -> Option<std::time::Duration> {
        (self.frame_rate > 0)
            .then(|| std::time::Duration::from_secs_f64(1.0 / self.frame_rate as f64))
    }
}
