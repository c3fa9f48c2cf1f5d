//! Built-in reflectors
//!
//! Each submodule contributes the reflectors for one family of types.
//! [`register_all`] installs every one of them in a fixed order.

mod containers;
mod desc;
mod enum_item;
mod geometry;
mod instance;
mod primitives;
mod strings;
mod udim;

use crate::object::{object_value, Object};
use crate::reflector::{Reflector, ReflectorRegistry};
use crate::state::{type_error, State};
use crate::Error;
use mlua::prelude::*;
use rtypes::{type_names as t, Value};

pub(crate) use instance::data_model_new;

/// Every built-in reflector
pub fn all() -> Vec<Reflector> {
    let mut reflectors = Vec::new();
    reflectors.extend(primitives::reflectors());
    reflectors.extend(strings::reflectors());
    reflectors.extend(containers::reflectors());
    reflectors.extend(geometry::reflectors());
    reflectors.extend(udim::reflectors());
    reflectors.push(instance::reflector());
    reflectors.push(enum_item::reflector());
    reflectors.extend(desc::reflectors());
    reflectors
}

/// Register every built-in reflector
pub fn register_all(registry: &mut ReflectorRegistry) {
    for reflector in all() {
        registry.register(reflector);
    }
}

/// Push a value as userdata
pub(crate) fn push_object(state: &mut State<'_>, value: Value) -> LuaResult<Vec<LuaValue>> {
    let ud = state.lua.create_userdata(Object(value))?;
    Ok(vec![LuaValue::UserData(ud)])
}

/// Pull userdata wrapping a value of `type_name`
pub(crate) fn pull_object(values: &[LuaValue], type_name: &str) -> LuaResult<Value> {
    let value = first(values);
    match object_value(&value) {
        Some(inner) if inner.type_name() == type_name => Ok(inner),
        _ => Err(type_error(type_name, &value)),
    }
}

/// The first value of a pull, nil if there is none
pub(crate) fn first(values: &[LuaValue]) -> LuaValue {
    values.first().cloned().unwrap_or(LuaValue::Nil)
}

/// Wrap several results as a callback return
pub(crate) fn ret_many(state: &mut State<'_>, values: Vec<Value>) -> LuaResult<LuaMultiValue> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        out.extend(state.push(value)?);
    }
    Ok(LuaMultiValue::from_vec(out))
}

pub(crate) fn pull_f64(state: &mut State<'_>, position: usize) -> LuaResult<f64> {
    Ok(state.pull(position, t::DOUBLE)?.as_f64().map_err(Error::from)?)
}

pub(crate) fn pull_f32(state: &mut State<'_>, position: usize) -> LuaResult<f32> {
    pull_f64(state, position).map(|v| v as f32)
}

/// A number at `position`, or `default` when nil
pub(crate) fn opt_f32(state: &mut State<'_>, position: usize, default: f32) -> LuaResult<f32> {
    let value = state.pull_opt(position, t::DOUBLE, Value::Double(default as f64))?;
    Ok(value.as_f64().map_err(Error::from)? as f32)
}

pub(crate) fn opt_i32(state: &mut State<'_>, position: usize, default: i32) -> LuaResult<i32> {
    match state.pull_opt(position, t::INT, Value::Int(default))? {
        Value::Int(v) => Ok(v),
        other => Err(Error::type_error(t::INT, other.type_name()).into()),
    }
}

pub(crate) fn pull_string(state: &mut State<'_>, position: usize) -> LuaResult<String> {
    Ok(state.pull(position, t::STRING)?.as_string().map_err(Error::from)?)
}

/// Both operands of a binary operator
pub(crate) fn operands(state: &mut State<'_>) -> LuaResult<(Value, Value)> {
    let (a, b) = (state.get(1), state.get(2));
    Ok((state.pull_variant(&a)?, state.pull_variant(&b)?))
}

/// The error for an operator applied to unsupported operands
pub(crate) fn bad_operands(op: &str, a: &Value, b: &Value) -> LuaError {
    Error::runtime(format!(
        "attempt to perform {op} on {} and {}",
        a.type_name(),
        b.type_name()
    ))
    .into()
}

/// A receiver of the wrong type; reflectors only see their own values
pub(crate) fn wrong_receiver(expected: &str, value: &Value) -> LuaError {
    Error::type_error(expected, value.type_name()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_registers_without_conflict() {
        let mut registry = ReflectorRegistry::new();
        register_all(&mut registry);
        for name in [
            t::NIL,
            t::BOOL,
            t::INT,
            t::DOUBLE,
            t::STRING,
            t::VECTOR3,
            t::CFRAME,
            t::ARRAY,
            t::DICTIONARY,
            t::TUPLE,
            t::INSTANCE,
            t::ENUM_ITEM,
            t::ROOT_DESC,
            crate::state::VARIANT,
        ] {
            assert!(registry.lookup(name).is_some(), "{name} is not registered");
        }
    }
}
