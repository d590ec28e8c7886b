//! Error types for voxscript

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Script error: {0}")]
    Lua(#[from] mlua::Error),

    /// Wrong argument count or type at the scripting boundary.
    #[error("{method}: {message}")]
    Marshal { method: String, message: String },

    /// A script handle whose host object no longer exists.
    #[error("stale handle: {0}")]
    StaleHandle(String),

    #[error("{0} is read-only")]
    ReadOnly(String),

    /// Host object already borrowed by the caller (re-entrant access).
    #[error("{0} is in use")]
    Busy(String),

    #[error("cannot open '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no file format for '{0}'")]
    FormatNotFound(String),

    #[error("no command named '{0}'")]
    CommandNotFound(String),

    #[error("format '{format}' does not support {operation}")]
    UnsupportedOperation { format: String, operation: &'static str },

    #[error("registration error: {0}")]
    Registration(String),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub fn marshal(method: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Marshal {
            method: method.into(),
            message: message.into(),
        }
    }
}

impl From<Error> for mlua::Error {
    fn from(err: Error) -> Self {
        match err {
            // Keep the original Lua error (and its traceback) intact.
            Error::Lua(inner) => inner,
            other => mlua::Error::external(other),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marshal_message() {
        let err = Error::marshal("Volume.setAt", "expected 2 arguments, got 1");
        assert_eq!(err.to_string(), "Volume.setAt: expected 2 arguments, got 1");
    }

    #[test]
    fn test_into_lua_error_keeps_message() {
        let lua_err: mlua::Error = Error::StaleHandle("layer 3".into()).into();
        assert!(lua_err.to_string().contains("stale handle: layer 3"));
    }
}
