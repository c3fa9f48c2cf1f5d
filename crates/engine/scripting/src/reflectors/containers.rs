//! Reflectors for Variant and the container types
//!
//! Arrays and dictionaries are plain Lua tables. Every container push or
//! pull marks the container's identity in the state's cycle guard, so a
//! container reached twice in one operation is rejected instead of being
//! walked forever.

use super::first;
use crate::reflector::Reflector;
use crate::state::{type_error, State, VARIANT};
use crate::Error;
use mlua::prelude::*;
use rtypes::{type_names as t, Array, Dictionary, Value};
use std::collections::HashMap;

pub(super) fn reflectors() -> Vec<Reflector> {
    vec![
        Reflector {
            push: Some(push_variant),
            pull: Some(pull_variant),
            ..Reflector::new(VARIANT)
        },
        Reflector {
            push: Some(push_array),
            pull: Some(pull_array),
            ..Reflector::new(t::ARRAY)
        },
        Reflector {
            push: Some(push_dictionary),
            pull: Some(pull_dictionary),
            ..Reflector::new(t::DICTIONARY)
        },
        Reflector {
            count: -1,
            push: Some(push_tuple),
            pull: Some(pull_tuple),
            ..Reflector::new(t::TUPLE)
        },
    ]
}

/// Push a value into a single slot; tuples collapse to their first value
fn push_item(state: &mut State<'_>, value: Value) -> LuaResult<LuaValue> {
    Ok(state.push(value)?.into_iter().next().unwrap_or(LuaValue::Nil))
}

fn push_variant(state: &mut State<'_>, value: Value) -> LuaResult<Vec<LuaValue>> {
    state.push(value)
}

/// Pick a type from the Lua value itself
///
/// A table with a non-empty `1..n` run is an Array; any other table is a
/// Dictionary.
fn pull_variant(state: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    let value = first(values);
    match &value {
        LuaValue::Nil => Ok(Value::Nil),
        LuaValue::Boolean(b) => Ok(Value::Bool(*b)),
        LuaValue::Integer(i) => Ok(Value::Int64(*i)),
        LuaValue::Number(n) => Ok(Value::Double(*n)),
        LuaValue::String(s) => {
            let bytes = s.as_bytes().to_vec();
            Ok(match String::from_utf8(bytes) {
                Ok(text) => Value::String(text),
                Err(e) => Value::BinaryString(e.into_bytes()),
            })
        }
        LuaValue::Table(table) => {
            let kind = if table.raw_len() > 0 {
                t::ARRAY
            } else {
                t::DICTIONARY
            };
            state.pull_value(kind, values)
        }
        LuaValue::UserData(_) => match crate::object::object_value(&value) {
            Some(inner) => Ok(inner),
            None => Err(type_error(VARIANT, &value)),
        },
        _ => Err(type_error(VARIANT, &value)),
    }
}

fn push_array(state: &mut State<'_>, value: Value) -> LuaResult<Vec<LuaValue>> {
    let Value::Array(array) = value else {
        return Err(super::wrong_receiver(t::ARRAY, &value));
    };
    state.with_cycle_guard(|s| {
        if !s.cycle_mark(array.ptr_id()) {
            return Err(Error::Cyclic("arrays").into());
        }
        let items = array.to_vec();
        let table = s.lua.create_table_with_capacity(items.len(), 0)?;
        for (i, item) in items.into_iter().enumerate() {
            let lv = push_item(s, item)?;
            table.raw_set(i + 1, lv)?;
        }
        Ok(vec![LuaValue::Table(table)])
    })
}

fn pull_array(state: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    let value = first(values);
    let LuaValue::Table(table) = &value else {
        return Err(type_error(t::ARRAY, &value));
    };
    state.with_cycle_guard(|s| {
        if !s.cycle_mark(table.to_pointer()) {
            return Err(Error::Cyclic("arrays").into());
        }
        let len = table.raw_len();
        let mut items = Vec::with_capacity(len);
        for i in 1..=len {
            let item: LuaValue = table.raw_get(i)?;
            items.push(s.pull_variant(&item)?);
        }
        Ok(Value::Array(Array::from_vec(items)))
    })
}

fn push_dictionary(state: &mut State<'_>, value: Value) -> LuaResult<Vec<LuaValue>> {
    let Value::Dictionary(dict) = value else {
        return Err(super::wrong_receiver(t::DICTIONARY, &value));
    };
    state.with_cycle_guard(|s| {
        if !s.cycle_mark(dict.ptr_id()) {
            return Err(Error::Cyclic("dictionaries").into());
        }
        let entries = dict.entries();
        let table = s.lua.create_table_with_capacity(0, entries.len())?;
        for (key, item) in entries {
            let lv = push_item(s, item)?;
            table.raw_set(key, lv)?;
        }
        Ok(vec![LuaValue::Table(table)])
    })
}

fn dictionary_key(key: &LuaValue) -> LuaResult<String> {
    match key {
        LuaValue::String(s) => Ok(s.to_str()?.to_string()),
        LuaValue::Integer(i) => Ok(i.to_string()),
        LuaValue::Number(n) => Ok(n.to_string()),
        other => Err(Error::runtime(format!(
            "dictionary keys must be strings or numbers, got {}",
            State::type_of(other)
        ))
        .into()),
    }
}

fn pull_dictionary(state: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    let value = first(values);
    let LuaValue::Table(table) = &value else {
        return Err(type_error(t::DICTIONARY, &value));
    };
    state.with_cycle_guard(|s| {
        if !s.cycle_mark(table.to_pointer()) {
            return Err(Error::Cyclic("dictionaries").into());
        }
        let mut map = HashMap::new();
        for pair in table.pairs::<LuaValue, LuaValue>() {
            let (key, item) = pair?;
            let key = dictionary_key(&key)?;
            if map.contains_key(&key) {
                return Err(Error::runtime(format!("duplicate dictionary key {key:?}")).into());
            }
            map.insert(key, s.pull_variant(&item)?);
        }
        Ok(Value::Dictionary(Dictionary::from_map(map)))
    })
}

fn push_tuple(state: &mut State<'_>, value: Value) -> LuaResult<Vec<LuaValue>> {
    let Value::Tuple(items) = value else {
        return Err(super::wrong_receiver(t::TUPLE, &value));
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(push_item(state, item)?);
    }
    Ok(out)
}

fn pull_tuple(state: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    let items = values
        .iter()
        .map(|v| state.pull_variant(v))
        .collect::<LuaResult<Vec<_>>>()?;
    Ok(Value::Tuple(items))
}
