//! Lua source files as script instances
//!
//! The extension picks the class. `server.lua` and `client.lua` produce a
//! `Script` with its `RunContext` set.

use crate::{Error, Format, Options, Result};
use rtypes::{type_names as t, Instance, Value};
use std::io::{Read, Write};

const SOURCE: &str = "Source";
const RUN_CONTEXT: &str = "RunContext";

/// Raw values of the RunContext enum
const RUN_CONTEXT_SERVER: u32 = 1;
const RUN_CONTEXT_CLIENT: u32 = 2;

fn script_format(name: &'static str, decode: crate::DecodeFn) -> Format {
    Format {
        media_types: &["application/x-lua", "text/plain"],
        encode_types: &[t::INSTANCE, t::STRING, t::PROTECTED_STRING, t::BINARY_STRING, t::CONTENT],
        can_decode: |name| name == t::INSTANCE,
        decode: Some(decode),
        encode: Some(encode),
        ..Format::named(name)
    }
}

pub fn lua() -> Format {
    script_format("lua", |_, r| decode_as("Script", None, r))
}

pub fn server_lua() -> Format {
    script_format("server.lua", |_, r| decode_as("Script", Some(RUN_CONTEXT_SERVER), r))
}

pub fn client_lua() -> Format {
    script_format("client.lua", |_, r| decode_as("Script", Some(RUN_CONTEXT_CLIENT), r))
}

pub fn localscript_lua() -> Format {
    script_format("localscript.lua", |_, r| decode_as("LocalScript", None, r))
}

pub fn modulescript_lua() -> Format {
    script_format("modulescript.lua", |_, r| decode_as("ModuleScript", None, r))
}

fn decode_as(class: &str, run_context: Option<u32>, r: &mut dyn Read) -> Result<Value> {
    let mut source = Vec::new();
    r.read_to_end(&mut source)?;
    let script = Instance::new(class);
    let source = String::from_utf8(source).map_err(|e| e.utf8_error())?;
    script.set(SOURCE, Value::ProtectedString(source));
    if let Some(context) = run_context {
        script.set(RUN_CONTEXT, Value::Token(context));
    }
    Ok(Value::Instance(script))
}

fn encode(_: &Options, v: &Value, w: &mut dyn Write) -> Result<()> {
    let source = match v {
        Value::Instance(script) => script.get(SOURCE).unwrap_or_default(),
        other => other.clone(),
    };
    let bytes = source.as_stringlike().ok_or_else(|| Error::wrong_kind("lua", v))?;
    w.write_all(bytes)?;
    Ok(())
}
