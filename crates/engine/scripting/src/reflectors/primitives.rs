//! Reflectors for nil, booleans and the numeric primitives
//!
//! Lua 5.4 separates integers from floats. Exact pulls respect that split:
//! `int`, `int64` and `token` take Lua integers, `float` and `double` take
//! Lua floats. The other subtype reaches them through `convert_from`, which
//! truncates and wraps to the target width.

use super::first;
use crate::reflector::Reflector;
use crate::state::{type_error, State};
use mlua::prelude::*;
use rtypes::{type_names as t, Value};

pub(super) fn reflectors() -> Vec<Reflector> {
    vec![
        Reflector {
            push: Some(push_nil),
            pull: Some(pull_nil),
            ..Reflector::new(t::NIL)
        },
        Reflector {
            push: Some(push_bool),
            pull: Some(pull_bool),
            ..Reflector::new(t::BOOL)
        },
        numeric(t::INT, pull_int, convert_int),
        numeric(t::INT64, pull_int64, convert_int64),
        numeric(t::FLOAT, pull_float, convert_float),
        numeric(t::DOUBLE, pull_double, convert_double),
        numeric(t::TOKEN, pull_token, convert_token),
    ]
}

fn numeric(
    name: &'static str,
    pull: crate::reflector::PullFn,
    convert: crate::reflector::ConvertFn,
) -> Reflector {
    Reflector {
        push: Some(push_number),
        pull: Some(pull),
        convert_from: Some(convert),
        ..Reflector::new(name)
    }
}

fn push_nil(_: &mut State<'_>, _: Value) -> LuaResult<Vec<LuaValue>> {
    Ok(vec![LuaValue::Nil])
}

fn pull_nil(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    match first(values) {
        LuaValue::Nil => Ok(Value::Nil),
        other => Err(type_error(t::NIL, &other)),
    }
}

fn push_bool(_: &mut State<'_>, value: Value) -> LuaResult<Vec<LuaValue>> {
    match value {
        Value::Bool(b) => Ok(vec![LuaValue::Boolean(b)]),
        other => Err(super::wrong_receiver(t::BOOL, &other)),
    }
}

fn pull_bool(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    match first(values) {
        LuaValue::Boolean(b) => Ok(Value::Bool(b)),
        other => Err(type_error(t::BOOL, &other)),
    }
}

fn push_number(_: &mut State<'_>, value: Value) -> LuaResult<Vec<LuaValue>> {
    let lv = match value {
        Value::Int(v) => LuaValue::Integer(v as i64),
        Value::Int64(v) => LuaValue::Integer(v),
        Value::Token(v) => LuaValue::Integer(v as i64),
        Value::Float(v) => LuaValue::Number(v as f64),
        Value::Double(v) => LuaValue::Number(v),
        other => return Err(super::wrong_receiver("number", &other)),
    };
    Ok(vec![lv])
}

fn pull_int(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    match first(values) {
        LuaValue::Integer(i) => Ok(Value::Int(i as i32)),
        other => Err(type_error(t::INT, &other)),
    }
}

fn pull_int64(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    match first(values) {
        LuaValue::Integer(i) => Ok(Value::Int64(i)),
        other => Err(type_error(t::INT64, &other)),
    }
}

fn pull_token(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    match first(values) {
        LuaValue::Integer(i) => Ok(Value::Token(i as u32)),
        other => Err(type_error(t::TOKEN, &other)),
    }
}

fn pull_float(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    match first(values) {
        LuaValue::Number(n) => Ok(Value::Float(n as f32)),
        other => Err(type_error(t::FLOAT, &other)),
    }
}

fn pull_double(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    match first(values) {
        LuaValue::Number(n) => Ok(Value::Double(n)),
        other => Err(type_error(t::DOUBLE, &other)),
    }
}

fn convert_int(value: &Value) -> Option<Value> {
    value.convert_numeric(t::INT)
}

fn convert_int64(value: &Value) -> Option<Value> {
    value.convert_numeric(t::INT64)
}

fn convert_float(value: &Value) -> Option<Value> {
    value.convert_numeric(t::FLOAT)
}

fn convert_double(value: &Value) -> Option<Value> {
    value.convert_numeric(t::DOUBLE)
}

/// Enum items convert to their raw value
fn convert_token(value: &Value) -> Option<Value> {
    match value {
        Value::EnumItem(item) => Some(Value::Token(item.value)),
        other => other.convert_numeric(t::TOKEN),
    }
}

#[cfg(test)]
mod tests {
    use crate::World;
    use rtypes::Value;

    #[test]
    fn test_integer_and_float_split() {
        let world = World::new();
        let lua = world.lua();
        let int = world.pull(&lua.load("return 2^31 + 5").eval().unwrap(), "int").unwrap();
        // 2^31 is a float in Lua 5.4; conversion truncates then wraps
        assert_eq!(int, Value::Int(i32::MIN + 5));
        let token = world.pull(&lua.load("return 3").eval().unwrap(), "token").unwrap();
        assert_eq!(token, Value::Token(3));
        let float = world.pull(&lua.load("return 1.5").eval().unwrap(), "float").unwrap();
        assert_eq!(float, Value::Float(1.5));
    }

    #[test]
    fn test_round_trip() {
        let world = World::new();
        for value in [
            Value::Nil,
            Value::Bool(true),
            Value::Int(-7),
            Value::Int64(1 << 40),
            Value::Double(0.25),
            Value::Token(4),
        ] {
            let lv = world.push(value.clone()).unwrap();
            assert_eq!(world.pull(&lv, value.type_name()).unwrap(), value);
        }
    }

    #[test]
    fn test_wrong_kind_is_type_error() {
        let world = World::new();
        let err = world.pull(&mlua::Value::Boolean(true), "int").unwrap_err();
        assert_eq!(crate::error::message(&err), "int expected, got boolean");
    }
}
