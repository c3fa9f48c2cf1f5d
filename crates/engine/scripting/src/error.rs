//! Error types for the scripting host

use mlua::prelude::*;
use thiserror::Error;

/// Result type for scripting operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the scripting host
///
/// Every variant is recoverable. Values raised inside a Lua callback reach
/// the script as a catchable error.
#[derive(Error, Debug)]
pub enum Error {
    /// Type conversion error
    #[error("{expected} expected, got {actual}")]
    TypeError { expected: String, actual: String },

    /// A pull at a frame position failed
    #[error("bad argument #{position} ({message})")]
    Argument { position: usize, message: String },

    /// A container was reached twice during one push or pull
    #[error("{0} cannot be cyclic")]
    Cyclic(&'static str),

    /// No reflector for a type name
    #[error("unknown type {0:?}")]
    UnknownType(String),

    /// No format for a name
    #[error("unknown format {0:?}")]
    UnknownFormat(String),

    /// No library for a name
    #[error("unknown library {0:?}")]
    UnknownLibrary(String),

    /// A format was asked for a type it does not produce
    #[error("format {format} cannot decode {type_name}")]
    CannotDecodeAs { format: String, type_name: String },

    /// Descriptor validation failed
    #[error("{0}")]
    Descriptor(String),

    /// A member or operation is not available for a value
    #[error("{0}")]
    Runtime(String),

    /// Malformed host configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// File operation failed
    #[error("{action} {path}: {source}")]
    File {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Format error
    #[error(transparent)]
    Format(#[from] formats::Error),

    /// Instance tree or descriptor error
    #[error(transparent)]
    Types(#[from] rtypes::Error),

    /// Lua error
    #[error("Lua error: {0}")]
    Lua(#[from] mlua::Error),

    /// KDL parsing error
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn type_error(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::TypeError {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        Error::Runtime(message.into())
    }
}

impl From<Error> for LuaError {
    fn from(e: Error) -> Self {
        match e {
            Error::Lua(e) => e,
            other => LuaError::external(other),
        }
    }
}

/// The innermost message of a Lua error, without tracebacks
pub(crate) fn message(e: &LuaError) -> String {
    match e {
        LuaError::CallbackError { cause, .. } => message(cause),
        LuaError::ExternalError(inner) => inner.to_string(),
        LuaError::RuntimeError(msg) => msg.clone(),
        other => other.to_string(),
    }
}

/// The host error carried by a Lua error, if any
pub fn host_error(e: &LuaError) -> Option<&Error> {
    match e {
        LuaError::CallbackError { cause, .. } => host_error(cause),
        LuaError::ExternalError(inner) => inner.downcast_ref::<Error>(),
        _ => None,
    }
}
