//! Reflectors for the string flavours
//!
//! Every flavour is a plain Lua string in scripts. The flavour only matters
//! on the host side, where formats preserve it.

use super::first;
use crate::reflector::{ConvertFn, PullFn, Reflector};
use crate::state::{type_error, State};
use crate::Error;
use mlua::prelude::*;
use rtypes::{type_names as t, Value};

pub(super) fn reflectors() -> Vec<Reflector> {
    vec![
        flavour(t::STRING, pull_string, convert_string),
        flavour(t::BINARY_STRING, pull_binary, convert_binary),
        flavour(t::PROTECTED_STRING, pull_protected, convert_protected),
        flavour(t::SHARED_STRING, pull_shared, convert_shared),
        flavour(t::CONTENT, pull_content, convert_content),
    ]
}

fn flavour(name: &'static str, pull: PullFn, convert: ConvertFn) -> Reflector {
    Reflector {
        push: Some(push_string),
        pull: Some(pull),
        convert_from: Some(convert),
        ..Reflector::new(name)
    }
}

fn push_string(state: &mut State<'_>, value: Value) -> LuaResult<Vec<LuaValue>> {
    match value.as_stringlike() {
        Some(bytes) => Ok(vec![LuaValue::String(state.lua.create_string(bytes)?)]),
        None => Err(super::wrong_receiver(t::STRING, &value)),
    }
}

fn bytes(values: &[LuaValue], type_name: &str) -> LuaResult<Vec<u8>> {
    match first(values) {
        LuaValue::String(s) => Ok(s.as_bytes().to_vec()),
        other => Err(type_error(type_name, &other)),
    }
}

/// Text flavours refuse bytes that are not UTF-8
fn text(values: &[LuaValue], type_name: &str) -> LuaResult<String> {
    String::from_utf8(bytes(values, type_name)?)
        .map_err(|_| Error::type_error(type_name, t::BINARY_STRING).into())
}

fn pull_string(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    text(values, t::STRING).map(Value::String)
}

fn pull_binary(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    bytes(values, t::BINARY_STRING).map(Value::BinaryString)
}

fn pull_protected(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    text(values, t::PROTECTED_STRING).map(Value::ProtectedString)
}

fn pull_shared(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    bytes(values, t::SHARED_STRING).map(Value::SharedString)
}

fn pull_content(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    text(values, t::CONTENT).map(Value::Content)
}

fn convert_string(value: &Value) -> Option<Value> {
    value.convert_stringlike(t::STRING)
}

fn convert_binary(value: &Value) -> Option<Value> {
    value.convert_stringlike(t::BINARY_STRING)
}

fn convert_protected(value: &Value) -> Option<Value> {
    value.convert_stringlike(t::PROTECTED_STRING)
}

fn convert_shared(value: &Value) -> Option<Value> {
    value.convert_stringlike(t::SHARED_STRING)
}

fn convert_content(value: &Value) -> Option<Value> {
    value.convert_stringlike(t::CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::World;
    use rtypes::Value;

    #[test]
    fn test_flavours_keep_bytes() {
        let world = World::new();
        let raw = vec![0xff, 0x00, b'a'];
        let lv = world.push(Value::BinaryString(raw.clone())).unwrap();
        assert_eq!(world.pull(&lv, "BinaryString").unwrap(), Value::BinaryString(raw.clone()));
        assert_eq!(world.pull(&lv, "SharedString").unwrap(), Value::SharedString(raw));

        let lv = world.push(Value::ProtectedString("print(1)".into())).unwrap();
        assert_eq!(world.pull(&lv, "string").unwrap(), Value::from("print(1)"));
    }

    #[test]
    fn test_text_flavours_reject_invalid_utf8() {
        let world = World::new();
        let lv = world.push(Value::BinaryString(vec![0xff])).unwrap();
        for flavour in ["string", "ProtectedString", "Content"] {
            let err = world.pull(&lv, flavour).unwrap_err();
            assert!(
                err.to_string().contains(&format!("{flavour} expected, got BinaryString")),
                "{err}"
            );
        }
        assert_eq!(world.pull(&lv, "Variant").unwrap(), Value::BinaryString(vec![0xff]));
    }

    #[test]
    fn test_numbers_are_not_strings() {
        let world = World::new();
        assert!(world.pull(&mlua::Value::Integer(1), "string").is_err());
    }
}
