//! Built-in formats

mod desc;
mod json;
mod script;
mod table;
mod text;

pub use json::{from_json, to_json};

use crate::{Format, FormatRegistry};

/// Every built-in format, in registration order
pub fn builtins() -> Vec<Format> {
    vec![
        text::txt(),
        text::bin(),
        text::base64(),
        json::json(),
        table::csv(),
        script::lua(),
        script::server_lua(),
        script::client_lua(),
        script::localscript_lua(),
        script::modulescript_lua(),
        desc::desc_json(),
        desc::desc_patch_json(),
    ]
}

/// Register every built-in format
pub fn register_all(registry: &mut FormatRegistry) {
    for format in builtins() {
        registry.register(format);
    }
}
