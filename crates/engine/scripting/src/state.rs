//! Marshalling between host values and Lua values
//!
//! A [`State`] wraps one call's arguments (the frame, indexed from 1) and the
//! host that owns the reflectors. Every conversion goes through it:
//!
//! - [`State::push`] turns a [`Value`] into Lua values through its reflector
//! - [`State::pull`] reads a typed value at a frame position
//! - [`State::pull_opt`] returns a default for nil without consulting the
//!   reflector
//! - [`State::pull_any_of`] tries candidate types in the caller's order
//!
//! Containers are walked under a cycle guard: a set of visited identities
//! created by the outermost guarded call and shared by every nested push or
//! pull of that call. Reaching the same container twice is an error.

use crate::error::message;
use crate::object::{Object, Symbol};
use crate::reflector::{Constructor, Reflector};
use crate::world::Host;
use crate::Error;
use mlua::prelude::*;
use rtypes::{type_names as t, Value};
use std::collections::HashSet;
use std::ffi::c_void;
use std::rc::Rc;

/// Name of the reflector that accepts any value
pub const VARIANT: &str = "Variant";

/// One call's view of the Lua boundary
pub struct State<'lua> {
    pub lua: &'lua Lua,
    host: Rc<Host>,
    frame: Vec<LuaValue>,
    cycle: Option<HashSet<*const c_void>>,
}

impl<'lua> State<'lua> {
    /// A state over `frame` for the host attached to `lua`
    pub fn new(lua: &'lua Lua, frame: Vec<LuaValue>) -> LuaResult<Self> {
        let host = lua
            .app_data_ref::<Rc<Host>>()
            .map(|host| Rc::clone(&host))
            .ok_or_else(|| LuaError::RuntimeError("no host attached to this Lua state".into()))?;
        Ok(Self::with_host(lua, host, frame))
    }

    pub(crate) fn with_host(lua: &'lua Lua, host: Rc<Host>, frame: Vec<LuaValue>) -> Self {
        Self {
            lua,
            host,
            frame,
            cycle: None,
        }
    }

    pub fn host(&self) -> &Rc<Host> {
        &self.host
    }

    pub fn frame(&self) -> &[LuaValue] {
        &self.frame
    }

    /// Number of values in the frame
    pub fn count(&self) -> usize {
        self.frame.len()
    }

    /// The value at a 1-based position; nil past the end
    pub fn get(&self, position: usize) -> LuaValue {
        assert!(position >= 1, "frame positions start at 1");
        self.frame.get(position - 1).cloned().unwrap_or(LuaValue::Nil)
    }

    /// Reflector for a type, or a host error
    pub fn reflector(&self, name: &str) -> LuaResult<Rc<Reflector>> {
        Ok(self.host.must_reflector(name)?)
    }

    /// Push a value through its reflector
    pub fn push(&mut self, value: Value) -> LuaResult<Vec<LuaValue>> {
        let reflector = self.reflector(value.type_name())?;
        self.push_with(&reflector, value)
    }

    fn push_with(&mut self, reflector: &Reflector, value: Value) -> LuaResult<Vec<LuaValue>> {
        let push = reflector
            .push
            .ok_or_else(|| Error::runtime(format!("cannot push {}", reflector.name)))?;
        push(self, value)
    }

    /// Push a value that occupies exactly one Lua value
    ///
    /// # Panics
    ///
    /// Panics if the value's reflector is variable-length or spans several
    /// values.
    pub fn push_one(&mut self, value: Value) -> LuaResult<LuaValue> {
        let reflector = self.reflector(value.type_name())?;
        if reflector.count_class() != 1 {
            panic!(
                "{} occupies {} values where exactly one is required",
                reflector.name, reflector.count
            );
        }
        let values = self.push_with(&reflector, value)?;
        Ok(values.into_iter().next().unwrap_or(LuaValue::Nil))
    }

    /// Push a value as the result of a callback
    pub fn ret(&mut self, value: Value) -> LuaResult<LuaMultiValue> {
        Ok(LuaMultiValue::from_vec(self.push(value)?))
    }

    /// The Lua values a reflector reads at `position`
    fn values_at(&self, position: usize, reflector: &Reflector) -> Vec<LuaValue> {
        assert!(position >= 1, "frame positions start at 1");
        let start = position - 1;
        let available = self.frame.len().saturating_sub(start);
        (start..start + reflector.value_count(available))
            .map(|i| self.frame.get(i).cloned().unwrap_or(LuaValue::Nil))
            .collect()
    }

    /// Pull a value of `type_name` at a 1-based frame position
    ///
    /// Failures name the position and the expected type.
    pub fn pull(&mut self, position: usize, type_name: &str) -> LuaResult<Value> {
        let reflector = self.reflector(type_name)?;
        let values = self.values_at(position, &reflector);
        self.pull_from(&reflector, &values)
            .map_err(|e| argument_error(position, message(&e)))
    }

    /// Like [`pull`](Self::pull), but nil at `position` yields `default`
    ///
    /// The reflector is not consulted for nil.
    pub fn pull_opt(&mut self, position: usize, type_name: &str, default: Value) -> LuaResult<Value> {
        if self.get(position).is_nil() {
            return Ok(default);
        }
        self.pull(position, type_name)
    }

    /// Pull the first of `type_names` that accepts the value at `position`
    ///
    /// Candidates are tried in the given order. Implicit conversions are only
    /// attempted after every exact pull has failed.
    ///
    /// # Panics
    ///
    /// Panics if `type_names` is empty or the candidates occupy different
    /// numbers of Lua values.
    pub fn pull_any_of(&mut self, position: usize, type_names: &[&str]) -> LuaResult<Value> {
        assert!(!type_names.is_empty(), "pull_any_of needs at least one type");
        let reflectors = type_names
            .iter()
            .map(|name| self.reflector(name))
            .collect::<LuaResult<Vec<_>>>()?;
        let class = reflectors[0].count_class();
        if reflectors.iter().any(|r| r.count_class() != class) {
            panic!("pull_any_of candidates {type_names:?} occupy different numbers of values");
        }

        let values = self.values_at(position, &reflectors[0]);
        for reflector in &reflectors {
            if let Some(pull) = reflector.pull {
                if let Ok(value) = self.with_cycle_guard(|s| pull(s, &values)) {
                    return Ok(value);
                }
            }
        }

        if let [single] = values.as_slice() {
            if let Ok(variant) = self.with_cycle_guard(|s| s.pull_variant(single)) {
                for reflector in &reflectors {
                    if let Some(converted) = reflector.convert_from.and_then(|c| c(&variant)) {
                        return Ok(converted);
                    }
                }
            }
        }

        let got = values.first().map(State::type_of).unwrap_or_else(|| t::NIL.to_string());
        Err(argument_error(
            position,
            format!("{} expected, got {}", join_or(type_names), got),
        ))
    }

    /// Pull a nested value, such as a container element or a table field
    pub fn pull_value(&mut self, type_name: &str, values: &[LuaValue]) -> LuaResult<Value> {
        let reflector = self.reflector(type_name)?;
        self.pull_from(&reflector, values)
    }

    /// Pull any value
    pub fn pull_variant(&mut self, value: &LuaValue) -> LuaResult<Value> {
        self.pull_value(VARIANT, std::slice::from_ref(value))
    }

    fn pull_from(&mut self, reflector: &Reflector, values: &[LuaValue]) -> LuaResult<Value> {
        let pull = reflector
            .pull
            .ok_or_else(|| Error::runtime(format!("cannot pull {}", reflector.name)))?;
        let err = match self.with_cycle_guard(|s| pull(s, values)) {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if let (Some(convert), [single]) = (reflector.convert_from, values) {
            if let Ok(variant) = self.with_cycle_guard(|s| s.pull_variant(single)) {
                if let Some(converted) = convert(&variant) {
                    return Ok(converted);
                }
            }
        }
        Err(err)
    }

    /// Run `f` under a cycle guard
    ///
    /// The outermost call creates the guard and tears it down when `f`
    /// returns; nested calls share it.
    pub fn with_cycle_guard<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        if self.cycle.is_some() {
            return f(self);
        }
        self.cycle = Some(HashSet::new());
        let result = f(self);
        self.cycle_clear();
        result
    }

    /// Mark a container identity as visited; false if it already was
    ///
    /// # Panics
    ///
    /// Panics if no guard is active.
    pub fn cycle_mark(&mut self, id: *const c_void) -> bool {
        match self.cycle.as_mut() {
            Some(visited) => visited.insert(id),
            None => panic!("cycle_mark called without an active cycle guard"),
        }
    }

    /// Tear down the active guard
    ///
    /// # Panics
    ///
    /// Panics if no guard is active.
    pub fn cycle_clear(&mut self) {
        if self.cycle.take().is_none() {
            panic!("cycle_clear called without an active cycle guard");
        }
    }

    /// Pull a typed field of a table
    pub fn pull_field(&mut self, table: &LuaTable, field: &str, type_name: &str) -> LuaResult<Value> {
        let value: LuaValue = table.raw_get(field)?;
        self.pull_value(type_name, &[value])
            .map_err(|e| Error::runtime(format!("field {field}: {}", message(&e))).into())
    }

    /// Pull a typed field of a table, or `default` when the field is nil
    pub fn pull_field_opt(
        &mut self,
        table: &LuaTable,
        field: &str,
        type_name: &str,
        default: Value,
    ) -> LuaResult<Value> {
        let value: LuaValue = table.raw_get(field)?;
        if value.is_nil() {
            return Ok(default);
        }
        self.pull_field(table, field, type_name)
    }

    /// Push a value into a table field
    pub fn push_field(&mut self, table: &LuaTable, field: &str, value: Value) -> LuaResult<()> {
        let value = self.push_one(value)?;
        table.raw_set(field, value)
    }

    /// Type name of a Lua value as scripts see it
    ///
    /// Host values report their own type; Lua integers and floats are both
    /// `number`.
    pub fn type_of(value: &LuaValue) -> String {
        match value {
            LuaValue::UserData(ud) => {
                if let Ok(object) = ud.borrow::<Object>() {
                    object.0.type_name().to_string()
                } else if ud.is::<Symbol>() {
                    "Symbol".to_string()
                } else {
                    "userdata".to_string()
                }
            }
            LuaValue::Integer(_) | LuaValue::Number(_) => "number".to_string(),
            other => other.type_name().to_string(),
        }
    }
}

/// Wrap a callback taking a [`State`] as a Lua function
pub fn bind(lua: &Lua, f: Constructor) -> LuaResult<LuaFunction> {
    lua.create_function(move |lua, args: LuaMultiValue| {
        let mut state = State::new(lua, args.into_vec())?;
        f(&mut state)
    })
}

/// A type error for a Lua value
pub fn type_error(expected: &str, got: &LuaValue) -> LuaError {
    Error::type_error(expected, State::type_of(got)).into()
}

fn argument_error(position: usize, message: String) -> LuaError {
    Error::Argument { position, message }.into()
}

/// `A`, `A or B`, `A, B, or C`
fn join_or(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [one] => one.to_string(),
        [a, b] => format!("{a} or {b}"),
        [init @ .., last] => format!("{}, or {}", init.join(", "), last),
    }
}
