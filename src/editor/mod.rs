//! Editor host loop
//!
//! The editor owns the open image and the script host. Requests (run a
//! command, import, export, run a script file) are queued and executed
//! synchronously at the next frame tick. Failures are logged and kept in a
//! bounded history; they never stop the loop.

pub mod context;

pub use context::EditorContext;

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::config::EngineConfig;
use crate::core::time::FrameTimer;
use crate::core::types::Result;
use crate::scripting::ScriptHost;
use crate::voxel::Image;

/// Work queued for the next frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditorRequest {
    RunCommand(String),
    Export { path: String, format: Option<String> },
    Import { path: String, format: Option<String> },
    /// Run a script file with `args` published as the global `arg` table.
    RunScript { path: PathBuf, args: Vec<String> },
}

impl fmt::Display for EditorRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorRequest::RunCommand(name) => write!(f, "command '{name}'"),
            EditorRequest::Export { path, .. } => write!(f, "export to {path}"),
            EditorRequest::Import { path, .. } => write!(f, "import from {path}"),
            EditorRequest::RunScript { path, .. } => write!(f, "script {}", path.display()),
        }
    }
}

/// A failed request, as shown to the user.
#[derive(Clone, Debug)]
pub struct FrameError {
    pub frame: u64,
    pub request: String,
    pub message: String,
}

pub struct Editor {
    config: EngineConfig,
    context: EditorContext,
    host: ScriptHost,
    queue: VecDeque<EditorRequest>,
    errors: VecDeque<FrameError>,
    timer: FrameTimer,
}

impl Editor {
    /// Editor with a fresh one-layer image.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_image(config, Image::new())
    }

    pub fn with_image(config: EngineConfig, image: Image) -> Result<Self> {
        let host = ScriptHost::new(&config)?;
        let timer = FrameTimer::new(config.frame_interval());
        log::info!(
            "Editor ready (trust level {:?}, {} fps)",
            config.trust_level,
            config.frame_rate
        );
        Ok(Self {
            config,
            context: EditorContext::new(image),
            host,
            queue: VecDeque::new(),
            errors: VecDeque::new(),
            timer,
        })
    }

    /// Run the startup scripts of `dir`. See [`ScriptHost::load_dir`].
    pub fn load_scripts_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        self.host.install_context(self.context.image(), self.context.frame())?;
        self.host.load_dir(dir)
    }

    /// Queue a request for the next tick.
    pub fn request(&mut self, request: EditorRequest) {
        log::debug!("Queued {}", request);
        self.queue.push_back(request);
    }

    /// Advance one frame and run every queued request. Returns the number
    /// of requests processed.
    pub fn tick(&mut self) -> usize {
        let frame = self.timer.tick();
        self.context.set_frame(frame);

        if let Err(e) = self.host.install_context(self.context.image(), frame) {
            self.record_error("context", e.to_string());
        }

        let pending: Vec<EditorRequest> = self.queue.drain(..).collect();
        for request in &pending {
            if let Err(e) = self.dispatch(request) {
                self.record_error(&request.to_string(), e.to_string());
            }
        }

        log::trace!("Frame {} processed {} request(s)", frame, pending.len());
        pending.len()
    }

    fn dispatch(&self, request: &EditorRequest) -> Result<()> {
        let image = self.context.image();
        match request {
            EditorRequest::RunCommand(name) => self.host.execute(name),
            EditorRequest::Export { path, format } => self.host.export(image, path, format.as_deref()),
            EditorRequest::Import { path, format } => self.host.import(image, path, format.as_deref()),
            EditorRequest::RunScript { path, args } => self.host.run_file_with_args(path, args),
        }
    }

    fn record_error(&mut self, request: &str, message: String) {
        log::error!("Frame {}: {} failed: {}", self.context.frame(), request, message);
        if self.config.max_error_history == 0 {
            return;
        }
        while self.errors.len() >= self.config.max_error_history {
            self.errors.pop_front();
        }
        self.errors.push_back(FrameError {
            frame: self.context.frame(),
            request: request.to_string(),
            message,
        });
    }

    /// Run `frames` ticks, sleeping between them at the configured rate.
    pub fn run_frames(&mut self, frames: u64) {
        for _ in 0..frames {
            self.tick();
            self.timer.wait_next();
        }
    }

    /// Tick until the request queue is empty.
    pub fn run_until_idle(&mut self) {
        while !self.queue.is_empty() {
            self.tick();
        }
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Recent failures, oldest first.
    pub fn errors(&self) -> impl Iterator<Item = &FrameError> {
        self.errors.iter()
    }

    pub fn context(&self) -> &EditorContext {
        &self.context
    }

    pub fn host(&self) -> &ScriptHost {
        &self.host
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
