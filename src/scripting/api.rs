//! Globals installed into every script VM: `goxel`, `log`, `print`,
//! `Volume`, `Box` and `std`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use mlua::{FromLua, Function, Lua, MultiValue, Table, Value};

use super::box_api::create_box_table;
use super::file_api::create_std_table;
use super::handles::BridgeStats;
use super::marshal::unpack_args;
use super::registry::{
    parse_ext_patterns, CommandRegistry, FormatHandler, FormatRegistry, ScriptCommand,
};
use super::volume_api::ScriptVolume;
use crate::core::error::Error;
use crate::core::logging::SCRIPT_TARGET;
use crate::voxel::Volume;

/// Oldest entries are dropped past this many unread log lines.
const MAX_OUTPUT_ENTRIES: usize = 1024;

/// One line logged by a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptLogEntry {
    pub level: log::Level,
    pub message: String,
}

pub type OutputBuffer = Rc<RefCell<VecDeque<ScriptLogEntry>>>;

/// Host state shared with the API closures.
#[derive(Clone)]
pub struct ApiState {
    pub formats: Rc<RefCell<FormatRegistry>>,
    pub commands: Rc<RefCell<CommandRegistry>>,
    pub stats: Rc<BridgeStats>,
    pub output: OutputBuffer,
}

impl ApiState {
    pub fn new() -> Self {
        Self {
            formats: Rc::new(RefCell::new(FormatRegistry::new())),
            commands: Rc::new(RefCell::new(CommandRegistry::new())),
            stats: BridgeStats::new(),
            output: Rc::new(RefCell::new(VecDeque::new())),
        }
    }
}

impl Default for ApiState {
    fn default() -> Self {
        Self::new()
    }
}

/// Register all globals.
pub fn register_all(lua: &Lua, state: &ApiState) -> mlua::Result<()> {
    let globals = lua.globals();

    globals.raw_set("goxel", create_goxel_table(lua, state)?)?;
    globals.raw_set("log", create_log_table(lua, &state.output)?)?;

    let output = Rc::clone(&state.output);
    globals.raw_set(
        "print",
        lua.create_function(move |lua, args: MultiValue| {
            emit(&output, log::Level::Info, join_args(lua, args)?);
            Ok(())
        })?,
    )?;

    let stats = Rc::clone(&state.stats);
    globals.raw_set(
        "Volume",
        lua.create_function(move |lua, args: MultiValue| {
            unpack_args::<()>(lua, "Volume", 0, args)?;
            Ok(ScriptVolume::owned(Volume::new(), &stats))
        })?,
    )?;

    globals.raw_set("Box", create_box_table(lua)?)?;
    globals.raw_set("std", create_std_table(lua)?)?;

    log::debug!("Scripting API registered");
    Ok(())
}

fn create_goxel_table(lua: &Lua, state: &ApiState) -> mlua::Result<Table> {
    let goxel = lua.create_table()?;

    let formats = Rc::clone(&state.formats);
    goxel.raw_set(
        "registerFormat",
        lua.create_function(move |lua, args: MultiValue| {
            let def: Table = unpack_args(lua, "goxel.registerFormat", 1, args)?;
            let handler = parse_format(&def)?;
            formats
                .try_borrow_mut()
                .map_err(|_| Error::Busy("format registry".to_string()))?
                .register(handler);
            Ok(())
        })?,
    )?;

    let commands = Rc::clone(&state.commands);
    goxel.raw_set(
        "registerScript",
        lua.create_function(move |lua, args: MultiValue| {
            let def: Table = unpack_args(lua, "goxel.registerScript", 1, args)?;
            let command = parse_command(&def)?;
            commands
                .try_borrow_mut()
                .map_err(|_| Error::Busy("command registry".to_string()))?
                .register(command);
            Ok(())
        })?,
    )?;

    // goxel.call(name, ...) runs a registered command with the remaining arguments.
    let commands = Rc::clone(&state.commands);
    goxel.raw_set(
        "call",
        lua.create_function(move |lua, mut args: MultiValue| {
            let Some(first) = args.pop_front() else {
                return Err(Error::marshal("goxel.call", "expected a command name").into());
            };
            let name = String::from_lua(first, lua)?;
            let on_execute = commands
                .try_borrow()
                .map_err(|_| Error::Busy("command registry".to_string()))?
                .get(&name)
                .map(|command| command.on_execute.clone())
                .ok_or(Error::CommandNotFound(name))?;
            on_execute.call::<MultiValue>(args)
        })?,
    )?;

    Ok(goxel)
}

/// Reject keys outside `allowed`, so typos fail at registration time.
fn check_keys(method: &str, def: &Table, allowed: &[&str]) -> mlua::Result<()> {
    for pair in def.pairs::<Value, Value>() {
        let (key, _) = pair?;
        let known = match &key {
            Value::String(s) => s.to_str().is_ok_and(|s| allowed.contains(&&*s)),
            _ => false,
        };
        if !known {
            return Err(Error::Registration(format!(
                "{method}: unknown key {}",
                key.to_string().unwrap_or_else(|_| key.type_name().to_string())
            ))
            .into());
        }
    }
    Ok(())
}

fn required_string(method: &str, def: &Table, key: &str) -> mlua::Result<String> {
    match def.raw_get::<Option<String>>(key)? {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Registration(format!("{method}: '{key}' is required")).into()),
    }
}

fn parse_format(def: &Table) -> mlua::Result<FormatHandler> {
    const METHOD: &str = "goxel.registerFormat";
    check_keys(METHOD, def, &["name", "ext", "exts", "exts_desc", "import", "export"])?;

    let name = required_string(METHOD, def, "name")?;
    let mut description = def.raw_get::<Option<String>>("exts_desc")?;
    let mut patterns = Vec::new();
    if let Some(ext) = def.raw_get::<Option<String>>("ext")? {
        let (desc, parsed) = parse_ext_patterns(&ext);
        description = description.or(desc);
        patterns.extend(parsed);
    }
    if let Some(exts) = def.raw_get::<Option<Vec<String>>>("exts")? {
        patterns.extend(exts);
    }
    if patterns.is_empty() {
        return Err(Error::Registration(format!("{METHOD}: '{name}' has no extension")).into());
    }

    let import = def.raw_get::<Option<Function>>("import")?;
    let export = def.raw_get::<Option<Function>>("export")?;
    if import.is_none() && export.is_none() {
        return Err(Error::Registration(format!(
            "{METHOD}: '{name}' needs an import or export function"
        ))
        .into());
    }

    Ok(FormatHandler {
        description: description.unwrap_or_else(|| name.clone()),
        name,
        patterns,
        import,
        export,
    })
}

fn parse_command(def: &Table) -> mlua::Result<ScriptCommand> {
    const METHOD: &str = "goxel.registerScript";
    check_keys(METHOD, def, &["name", "description", "onExecute"])?;

    let name = required_string(METHOD, def, "name")?;
    let on_execute = def
        .raw_get::<Option<Function>>("onExecute")?
        .ok_or_else(|| Error::Registration(format!("{METHOD}: '{name}' needs onExecute")))?;
    Ok(ScriptCommand {
        name,
        description: def.raw_get("description")?,
        on_execute,
    })
}

fn create_log_table(lua: &Lua, output: &OutputBuffer) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    for (name, level) in [
        ("error", log::Level::Error),
        ("warn", log::Level::Warn),
        ("info", log::Level::Info),
        ("debug", log::Level::Debug),
    ] {
        let output = Rc::clone(output);
        table.raw_set(
            name,
            lua.create_function(move |lua, args: MultiValue| {
                emit(&output, level, join_args(lua, args)?);
                Ok(())
            })?,
        )?;
    }
    Ok(table)
}

/// `tostring` each argument and join with tabs, like Lua's own `print`.
fn join_args(lua: &Lua, args: MultiValue) -> mlua::Result<String> {
    let tostring: Function = lua.globals().raw_get("tostring")?;
    let mut parts = Vec::with_capacity(args.len());
    for value in args {
        parts.push(tostring.call::<String>(value)?);
    }
    Ok(parts.join("\t"))
}

fn emit(output: &OutputBuffer, level: log::Level, message: String) {
    log::log!(target: SCRIPT_TARGET, level, "{}", message);
    if let Ok(mut output) = output.try_borrow_mut() {
        if output.len() >= MAX_OUTPUT_ENTRIES {
            output.pop_front();
        }
        output.push_back(ScriptLogEntry { level, message });
    }
}
