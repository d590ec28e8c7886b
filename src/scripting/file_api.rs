//! `std.open` and the `File` userdata used by import/export handlers.

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};

use mlua::{Function, Lua, MetaMethod, MultiValue, Table, UserData, UserDataMethods, Value};

use super::marshal::{unknown_member, unpack_args};
use crate::core::error::Error;

enum FileState {
    Read(BufReader<File>),
    Write(BufWriter<File>),
    Closed,
}

pub struct ScriptFile {
    path: String,
    state: RefCell<FileState>,
}

impl ScriptFile {
    /// Open `path` with a C-style mode: `r`, `w` or `a` (a trailing `b` is ignored).
    pub fn open(path: &str, mode: &str) -> crate::core::types::Result<Self> {
        let mut options = OpenOptions::new();
        match mode.trim_end_matches('b') {
            "r" => options.read(true),
            "w" => options.write(true).create(true).truncate(true),
            "a" => options.append(true).create(true),
            other => {
                return Err(Error::marshal("std.open", format!("invalid mode '{other}'")));
            }
        };
        let file = options.open(path).map_err(|source| Error::Open {
            path: path.to_string(),
            source,
        })?;
        let state = if mode.starts_with('r') {
            FileState::Read(BufReader::new(file))
        } else {
            FileState::Write(BufWriter::new(file))
        };
        log::debug!("Opened '{}' ({})", path, mode);
        Ok(Self {
            path: path.to_string(),
            state: RefCell::new(state),
        })
    }

    fn closed_error(&self, method: &str) -> mlua::Error {
        Error::marshal(method, format!("file '{}' is closed", self.path)).into()
    }

    fn write_bytes(&self, method: &str, bytes: &[u8]) -> mlua::Result<()> {
        let mut state = self.state.borrow_mut();
        match &mut *state {
            FileState::Write(writer) => Ok(writer.write_all(bytes).map_err(Error::from)?),
            FileState::Read(_) => Err(Error::marshal(method, "file not opened for writing").into()),
            FileState::Closed => Err(self.closed_error(method)),
        }
    }

    fn with_reader<R>(
        &self,
        method: &str,
        f: impl FnOnce(&mut BufReader<File>) -> std::io::Result<R>,
    ) -> mlua::Result<R> {
        let mut state = self.state.borrow_mut();
        match &mut *state {
            FileState::Read(reader) => Ok(f(reader).map_err(Error::from)?),
            FileState::Write(_) => Err(Error::marshal(method, "file not opened for reading").into()),
            FileState::Closed => Err(self.closed_error(method)),
        }
    }

    /// Flush and release the OS handle. Closing twice is an error.
    fn close(&self) -> mlua::Result<()> {
        let previous = std::mem::replace(&mut *self.state.borrow_mut(), FileState::Closed);
        match previous {
            FileState::Write(mut writer) => Ok(writer.flush().map_err(Error::from)?),
            FileState::Read(_) => Ok(()),
            FileState::Closed => Err(self.closed_error("File.close")),
        }
    }
}

impl Drop for ScriptFile {
    fn drop(&mut self) {
        if let FileState::Write(writer) = self.state.get_mut() {
            if let Err(e) = writer.flush() {
                log::warn!("Failed to flush '{}': {}", self.path, e);
            }
        }
    }
}

impl UserData for ScriptFile {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("write", |lua, this, args: MultiValue| {
            let text: mlua::String = unpack_args(lua, "File.write", 1, args)?;
            this.write_bytes("File.write", &text.as_bytes())
        });

        methods.add_method("puts", |lua, this, args: MultiValue| {
            let text: mlua::String = unpack_args(lua, "File.puts", 1, args)?;
            this.write_bytes("File.puts", &text.as_bytes())?;
            this.write_bytes("File.puts", b"\n")
        });

        methods.add_method("printf", |lua, this, args: MultiValue| {
            if args.is_empty() {
                return Err(Error::marshal("File.printf", "expected a format string").into());
            }
            let string: Table = lua.globals().raw_get("string")?;
            let format: Function = string.raw_get("format")?;
            let text: mlua::String = format.call(args)?;
            this.write_bytes("File.printf", &text.as_bytes())
        });

        // Next line without its terminator, nil at end of file.
        methods.add_method("getline", |lua, this, args: MultiValue| {
            unpack_args::<()>(lua, "File.getline", 0, args)?;
            let mut line = Vec::new();
            let read = this.with_reader("File.getline", |r| r.read_until(b'\n', &mut line))?;
            if read == 0 {
                return Ok(Value::Nil);
            }
            if line.last() == Some(&b'\n') {
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
            }
            Ok(Value::String(lua.create_string(&line)?))
        });

        methods.add_method("readAsString", |lua, this, args: MultiValue| {
            unpack_args::<()>(lua, "File.readAsString", 0, args)?;
            let mut content = Vec::new();
            this.with_reader("File.readAsString", |r| r.read_to_end(&mut content))?;
            lua.create_string(&content)
        });

        methods.add_method("close", |lua, this, args: MultiValue| {
            unpack_args::<()>(lua, "File.close", 0, args)?;
            this.close()
        });

        methods.add_meta_method(MetaMethod::Index, |_, _this, key: String| {
            Err::<Value, _>(unknown_member("File", &key))
        });
    }
}

/// Build the global `std` table.
pub fn create_std_table(lua: &Lua) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    table.raw_set(
        "open",
        lua.create_function(|lua, args: MultiValue| {
            let (path, mode): (String, String) = unpack_args(lua, "std.open", 2, args)?;
            Ok(ScriptFile::open(&path, &mode)?)
        })?,
    )?;
    Ok(table)
}
