//! voxscript - headless voxel editor driven by Lua scripts.
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --config <FILE>    JSON engine config (default: built-in defaults)
//!   --scripts <DIR>    Directory of startup *.lua scripts (overrides config)
//!   --run <COMMAND>    Run a registered script command (repeatable)
//!   --script <FILE> [ARGS]...
//!                      Run a script file; following arguments up to the next
//!                      option become its `arg` table (repeatable)
//!   --export <PATH>    Export the image through a registered format
//!   --format <NAME>    Format name for --export (default: matched by extension)
//!   --frames <N>       Extra frames to run after the requests (default: 0)
//!
//! Example:
//!   voxscript --scripts data/scripts --run "Fill selection" --export out.txt

use std::process::ExitCode;

use voxscript::core::{logging, EngineConfig};
use voxscript::editor::{Editor, EditorRequest};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config = match parse_str_arg(&args, "--config") {
        Some(path) => match EngineConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                logging::init();
                log::error!("Failed to load config {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };
    logging::init_with_filter(&config.log_filter);

    let scripts_dir = parse_str_arg(&args, "--scripts")
        .map(Into::into)
        .or_else(|| config.scripts_dir.clone());
    let frames = parse_u64_arg(&args, "--frames").unwrap_or(0);

    let mut editor = match Editor::new(config) {
        Ok(editor) => editor,
        Err(e) => {
            log::error!("Failed to start scripting: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = scripts_dir {
        if let Err(e) = editor.load_scripts_dir(&dir) {
            log::error!("Cannot read scripts directory {}: {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    }

    for name in parse_all_str_args(&args, "--run") {
        editor.request(EditorRequest::RunCommand(name));
    }
    for (path, script_args) in parse_script_args(&args) {
        editor.request(EditorRequest::RunScript { path: path.into(), args: script_args });
    }
    if let Some(path) = parse_str_arg(&args, "--export") {
        let format = parse_str_arg(&args, "--format");
        editor.request(EditorRequest::Export { path, format });
    }

    editor.run_until_idle();
    editor.run_frames(frames);

    let failures = editor.errors().count();
    if failures > 0 {
        log::warn!("{} request(s) failed", failures);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn parse_u64_arg(args: &[String], flag: &str) -> Option<u64> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

/// Values of every occurrence of `flag`, in order.
fn parse_all_str_args(args: &[String], flag: &str) -> Vec<String> {
    args.windows(2)
        .filter(|pair| pair[0] == flag)
        .map(|pair| pair[1].clone())
        .collect()
}

/// Every `--script FILE [ARGS]...`, with the arguments that follow FILE up
/// to the next `--` option.
fn parse_script_args(args: &[String]) -> Vec<(String, Vec<String>)> {
    let mut scripts = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--script" {
            if let Some(path) = args.get(i + 1) {
                let script_args: Vec<String> = args[i + 2..]
                    .iter()
                    .take_while(|a| !a.starts_with("--"))
                    .cloned()
                    .collect();
                i += 2 + script_args.len();
                scripts.push((path.clone(), script_args));
                continue;
            }
        }
        i += 1;
    }
    scripts
}
