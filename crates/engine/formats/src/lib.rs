//! Named codecs for rbxhost values
//!
//! A [`Format`] turns bytes into a [`rtypes::Value`] and back. Formats are
//! plain data with function pointers, collected in a [`FormatRegistry`]
//! keyed by name (usually a file extension, e.g. `desc.json`).
//!
//! Nothing here depends on the scripting engine.
//!
//! # Example
//!
//! ```rust
//! use formats::{FormatRegistry, Options};
//! use rtypes::Value;
//!
//! let registry = FormatRegistry::with_builtins();
//! let json = registry.lookup("json").unwrap();
//! let value = json.decode_bytes(&Options::new(), b"[1, 2]").unwrap();
//! assert_eq!(value.as_array().unwrap().len(), 2);
//! ```

mod builtin;
mod error;
mod format;
mod registry;

pub use builtin::{builtins, from_json, register_all, to_json};
pub use error::{Error, Result};
pub use format::{DecodeFn, EncodeFn, Format, OptionSpec, Options};
pub use registry::FormatRegistry;
