//! Lua sandbox restrictions
//!
//! Every VM is created with a restricted set of standard libraries.
//! Dangerous libraries (os, io, debug, package) are left out unless the
//! configured trust level grants them.

use mlua::{Lua, LuaOptions, Result as LuaResult, StdLib};

use crate::core::config::TrustLevel;

/// Installed last: reading an undefined global raises instead of yielding nil.
const STRICT_GLOBALS: &str = r#"
setmetatable(_G, {
    __index = function(_, name)
        error("undefined global '" .. tostring(name) .. "'", 2)
    end,
})
"#;

/// Standard libraries granted for a trust level.
pub fn std_libs(trust: TrustLevel) -> StdLib {
    let basic = StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8 | StdLib::COROUTINE;
    match trust {
        TrustLevel::Basic => basic,
        TrustLevel::FileRead => basic | StdLib::IO,
        TrustLevel::Elevated => StdLib::ALL_SAFE,
    }
}

/// Creates a new Lua VM with sandbox restrictions applied.
pub fn create_sandboxed_vm(trust: TrustLevel) -> LuaResult<Lua> {
    let lua = Lua::new_with(std_libs(trust), LuaOptions::default())?;
    log::debug!("Created Lua VM with trust level {:?}", trust);
    Ok(lua)
}

/// Turn reads of undefined globals into errors. Call after the API globals are set.
pub fn enable_strict_globals(lua: &Lua) -> LuaResult<()> {
    lua.load(STRICT_GLOBALS).set_name("=strict").exec()
}
