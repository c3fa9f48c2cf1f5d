//! Userdata wrappers for host values
//!
//! Every host value that has no native Lua form is pushed as an [`Object`].
//! Its metatable dispatches indexing, assignment and operators to the
//! reflector registered for the wrapped value's type.

use crate::reconcile;
use crate::reflector::{BinaryOp, GetFn, Operators};
use crate::state::State;
use crate::Error;
use mlua::prelude::*;
use rtypes::Value;

/// A host value living in Lua
pub struct Object(pub Value);

/// A reserved key for instance data that is not a property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol(pub &'static str);

impl LuaUserData for Symbol {
    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
            Ok(format!("Symbol({})", this.0))
        });
        methods.add_meta_function(LuaMetaMethod::Eq, |_, (a, b): (LuaValue, LuaValue)| {
            Ok(symbol_of(&a).is_some() && symbol_of(&a) == symbol_of(&b))
        });
    }
}

impl LuaUserData for Object {
    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(LuaMetaMethod::Index, |lua, this, key: LuaValue| {
            index(lua, &this.0, &key)
        });
        methods.add_meta_method(
            LuaMetaMethod::NewIndex,
            |lua, this, (key, value): (LuaValue, LuaValue)| new_index(lua, &this.0, &key, value),
        );
        methods.add_meta_method(LuaMetaMethod::ToString, |lua, this, ()| {
            let state = State::new(lua, Vec::new())?;
            let reflector = state.reflector(this.0.type_name())?;
            Ok(match reflector.operators.tostring {
                Some(tostring) => tostring(&this.0),
                None => this.0.to_string(),
            })
        });
        methods.add_meta_function(LuaMetaMethod::Eq, |lua, (a, b): (LuaValue, LuaValue)| {
            if has_operator(lua, [&a, &b], |ops| ops.eq.is_some())? {
                let value = binary(lua, "eq", &a, &b, |ops| ops.eq)?;
                return Ok(value.as_boolean().unwrap_or(false));
            }
            Ok(match (object_value(&a), object_value(&b)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            })
        });
        methods.add_meta_function(LuaMetaMethod::Add, |lua, (a, b): (LuaValue, LuaValue)| {
            binary(lua, "add", &a, &b, |ops| ops.add)
        });
        methods.add_meta_function(LuaMetaMethod::Sub, |lua, (a, b): (LuaValue, LuaValue)| {
            binary(lua, "sub", &a, &b, |ops| ops.sub)
        });
        methods.add_meta_function(LuaMetaMethod::Mul, |lua, (a, b): (LuaValue, LuaValue)| {
            binary(lua, "mul", &a, &b, |ops| ops.mul)
        });
        methods.add_meta_function(LuaMetaMethod::Div, |lua, (a, b): (LuaValue, LuaValue)| {
            binary(lua, "div", &a, &b, |ops| ops.div)
        });
        methods.add_meta_function(LuaMetaMethod::Mod, |lua, (a, b): (LuaValue, LuaValue)| {
            binary(lua, "mod", &a, &b, |ops| ops.modulo)
        });
        methods.add_meta_function(LuaMetaMethod::Pow, |lua, (a, b): (LuaValue, LuaValue)| {
            binary(lua, "pow", &a, &b, |ops| ops.pow)
        });
        methods.add_meta_function(LuaMetaMethod::Lt, |lua, (a, b): (LuaValue, LuaValue)| {
            binary(lua, "lt", &a, &b, |ops| ops.lt)
        });
        methods.add_meta_function(LuaMetaMethod::Le, |lua, (a, b): (LuaValue, LuaValue)| {
            binary(lua, "le", &a, &b, |ops| ops.le)
        });
        methods.add_meta_method(LuaMetaMethod::Unm, |lua, this, _: LuaMultiValue| {
            unary(lua, "unm", &this.0, |ops| ops.unm)
        });
        methods.add_meta_method(LuaMetaMethod::Len, |lua, this, _: LuaMultiValue| {
            unary(lua, "len", &this.0, |ops| ops.len)
        });
    }
}

/// The value wrapped by an [`Object`]
pub(crate) fn object_value(value: &LuaValue) -> Option<Value> {
    match value {
        LuaValue::UserData(ud) => ud.borrow::<Object>().ok().map(|o| o.0.clone()),
        _ => None,
    }
}

/// The name of a [`Symbol`] key
pub(crate) fn symbol_of(value: &LuaValue) -> Option<&'static str> {
    match value {
        LuaValue::UserData(ud) => ud.borrow::<Symbol>().ok().map(|s| s.0),
        _ => None,
    }
}

fn key_name(key: &LuaValue) -> String {
    match key {
        LuaValue::String(s) => s.to_string_lossy().into(),
        other => match symbol_of(other) {
            Some(symbol) => format!("Symbol({symbol})"),
            None => State::type_of(other),
        },
    }
}

fn index(lua: &Lua, value: &Value, key: &LuaValue) -> LuaResult<LuaValue> {
    let mut state = State::new(lua, Vec::new())?;
    let reflector = state.reflector(value.type_name())?;

    if let LuaValue::String(name) = key {
        let name: String = name.to_string_lossy().into();
        if let Some(member) = reflector.members.get(name.as_str()) {
            if member.method {
                return method_function(lua, value.type_name(), member.get).map(LuaValue::Function);
            }
            let values = (member.get)(&mut state, value)?;
            return Ok(values.into_iter().next().unwrap_or(LuaValue::Nil));
        }
        if let Value::Instance(inst) = value {
            return reconcile::get_property(&mut state, inst, &name);
        }
    } else if let (Value::Instance(inst), Some(symbol)) = (value, symbol_of(key)) {
        return reconcile::get_symbol(&mut state, inst, symbol);
    }

    Err(Error::runtime(format!(
        "{} is not a valid member of {}",
        key_name(key),
        value.type_name()
    ))
    .into())
}

fn new_index(lua: &Lua, value: &Value, key: &LuaValue, assigned: LuaValue) -> LuaResult<()> {
    let mut state = State::new(lua, vec![assigned])?;
    let reflector = state.reflector(value.type_name())?;

    if let LuaValue::String(name) = key {
        let name: String = name.to_string_lossy().into();
        if let Some(member) = reflector.members.get(name.as_str()) {
            return match member.set {
                Some(set) => set(&mut state, value),
                None => Err(Error::runtime(format!(
                    "{name} of {} cannot be assigned to",
                    value.type_name()
                ))
                .into()),
            };
        }
        if let Value::Instance(inst) = value {
            return reconcile::set_property(&mut state, inst, &name);
        }
    } else if let (Value::Instance(inst), Some(symbol)) = (value, symbol_of(key)) {
        return reconcile::set_symbol(&mut state, inst, symbol);
    }

    Err(Error::runtime(format!(
        "{} is not a valid member of {}",
        key_name(key),
        value.type_name()
    ))
    .into())
}

/// A function calling a method member with the receiver pulled from its
/// first argument
fn method_function(lua: &Lua, type_name: &'static str, get: GetFn) -> LuaResult<LuaFunction> {
    lua.create_function(move |lua, args: LuaMultiValue| {
        let mut args = args.into_vec();
        let receiver = if args.is_empty() {
            LuaValue::Nil
        } else {
            args.remove(0)
        };
        let mut state = State::new(lua, args)?;
        let this = state.pull_value(type_name, &[receiver]).map_err(|_| {
            Error::runtime(format!("expected ':' not '.' calling member function of {type_name}"))
        })?;
        get(&mut state, &this)
    })
}

/// Whether either operand's reflector defines the operator
fn has_operator(
    lua: &Lua,
    operands: [&LuaValue; 2],
    defined: fn(&Operators) -> bool,
) -> LuaResult<bool> {
    let state = State::new(lua, Vec::new())?;
    for operand in operands {
        if let Some(value) = object_value(operand) {
            if defined(&state.reflector(value.type_name())?.operators) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn binary(
    lua: &Lua,
    op: &str,
    a: &LuaValue,
    b: &LuaValue,
    select: fn(&Operators) -> Option<BinaryOp>,
) -> LuaResult<LuaValue> {
    let mut state = State::new(lua, vec![a.clone(), b.clone()])?;
    for operand in [a, b] {
        if let Some(value) = object_value(operand) {
            let reflector = state.reflector(value.type_name())?;
            if let Some(f) = select(&reflector.operators) {
                return f(&mut state);
            }
        }
    }
    Err(Error::runtime(format!(
        "attempt to perform {op} on {} and {}",
        State::type_of(a),
        State::type_of(b)
    ))
    .into())
}

fn unary(
    lua: &Lua,
    op: &str,
    value: &Value,
    select: fn(&Operators) -> Option<crate::reflector::UnaryOp>,
) -> LuaResult<LuaValue> {
    let mut state = State::new(lua, Vec::new())?;
    let reflector = state.reflector(value.type_name())?;
    match select(&reflector.operators) {
        Some(f) => f(&mut state, value),
        None => Err(Error::runtime(format!("attempt to perform {op} on {}", value.type_name())).into()),
    }
}
