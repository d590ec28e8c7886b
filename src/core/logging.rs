//! Logging initialization and utilities

/// Log target used for output produced by scripts (`log.info`, `print`, ...)
pub const SCRIPT_TARGET: &str = "script";

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable.
///
/// # Example
/// ```
/// voxscript::core::logging::init();
/// log::info!("Editor started");
/// ```
pub fn init() {
    init_with_filter("info");
}

/// Initialize logging with an explicit default filter (still overridable by RUST_LOG).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_with_filter(filter: &str) {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(filter)
    ).try_init();
}
