//! Reflectors: per-type conversion between host values and Lua values
//!
//! A [`Reflector`] describes one type tag: how a value of that type is pushed
//! to Lua, how it is pulled back, and which members, constructors and
//! operators scripts see on it. Reflectors are plain data holding function
//! pointers, collected in a [`ReflectorRegistry`] keyed by name.

use crate::{Error, State};
use mlua::prelude::*;
use rtypes::Value;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Push a value, producing `count` Lua values
pub type PushFn = fn(&mut State<'_>, Value) -> LuaResult<Vec<LuaValue>>;

/// Pull a value from exactly the Lua values the reflector occupies
pub type PullFn = fn(&mut State<'_>, &[LuaValue]) -> LuaResult<Value>;

/// Read a property, or run a method with its arguments in the frame
pub type GetFn = fn(&mut State<'_>, &Value) -> LuaResult<LuaMultiValue>;

/// Write a property; the assigned value is at frame position 1
pub type SetFn = fn(&mut State<'_>, &Value) -> LuaResult<()>;

/// Build a value from the arguments in the frame
pub type Constructor = fn(&mut State<'_>) -> LuaResult<LuaMultiValue>;

/// A binary operator; both operands are in the frame, left first
pub type BinaryOp = fn(&mut State<'_>) -> LuaResult<LuaValue>;

/// A unary operator on the receiver
pub type UnaryOp = fn(&mut State<'_>, &Value) -> LuaResult<LuaValue>;

/// Implicit conversion from a value of another type
pub type ConvertFn = fn(&Value) -> Option<Value>;

/// A property or method exposed on values of a type
#[derive(Clone, Copy)]
pub struct Member {
    pub get: GetFn,
    /// Absent for read-only properties and methods
    pub set: Option<SetFn>,
    /// Indexing a method yields a function that receives the arguments
    pub method: bool,
    /// Type of the property or return value; informational
    pub value_type: &'static str,
}

impl Member {
    pub fn property(value_type: &'static str, get: GetFn) -> Self {
        Self {
            get,
            set: None,
            method: false,
            value_type,
        }
    }

    pub fn settable(value_type: &'static str, get: GetFn, set: SetFn) -> Self {
        Self {
            set: Some(set),
            ..Self::property(value_type, get)
        }
    }

    pub fn method(value_type: &'static str, get: GetFn) -> Self {
        Self {
            method: true,
            ..Self::property(value_type, get)
        }
    }
}

/// Operator overloads on userdata values
#[derive(Clone, Copy, Default)]
pub struct Operators {
    pub add: Option<BinaryOp>,
    pub sub: Option<BinaryOp>,
    pub mul: Option<BinaryOp>,
    pub div: Option<BinaryOp>,
    pub modulo: Option<BinaryOp>,
    pub pow: Option<BinaryOp>,
    /// Replaces structural equality
    pub eq: Option<BinaryOp>,
    pub lt: Option<BinaryOp>,
    pub le: Option<BinaryOp>,
    pub unm: Option<UnaryOp>,
    pub len: Option<UnaryOp>,
    /// Replaces the value's display form
    pub tostring: Option<fn(&Value) -> String>,
}

impl Operators {
    /// Names of the operators that are defined
    pub fn names(&self) -> Vec<&'static str> {
        let binary = [
            ("__add", self.add),
            ("__sub", self.sub),
            ("__mul", self.mul),
            ("__div", self.div),
            ("__mod", self.modulo),
            ("__pow", self.pow),
            ("__eq", self.eq),
            ("__lt", self.lt),
            ("__le", self.le),
        ];
        let mut names: Vec<&'static str> = binary
            .iter()
            .filter(|(_, op)| op.is_some())
            .map(|(name, _)| *name)
            .collect();
        if self.unm.is_some() {
            names.push("__unm");
        }
        if self.len.is_some() {
            names.push("__len");
        }
        if self.tostring.is_some() {
            names.push("__tostring");
        }
        names
    }
}

/// Describes one type tag
#[derive(Clone)]
pub struct Reflector {
    pub name: &'static str,
    /// Number of Lua values occupied: 0 or 1 for one, N for a fixed run,
    /// negative for the rest of the frame
    pub count: i32,
    pub push: Option<PushFn>,
    pub pull: Option<PullFn>,
    pub members: BTreeMap<&'static str, Member>,
    pub constructors: BTreeMap<&'static str, Constructor>,
    pub operators: Operators,
    pub convert_from: Option<ConvertFn>,
}

impl Reflector {
    /// A single-value reflector with no members
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            count: 1,
            push: None,
            pull: None,
            members: BTreeMap::new(),
            constructors: BTreeMap::new(),
            operators: Operators::default(),
            convert_from: None,
        }
    }

    /// Add a member; builder style
    pub fn with_member(mut self, name: &'static str, member: Member) -> Self {
        self.members.insert(name, member);
        self
    }

    /// Add a constructor; builder style
    pub fn with_constructor(mut self, name: &'static str, constructor: Constructor) -> Self {
        self.constructors.insert(name, constructor);
        self
    }

    /// How many Lua values this type reads from a frame of `available`
    /// values starting at the pull position
    pub fn value_count(&self, available: usize) -> usize {
        match self.count {
            c if c < 0 => available,
            0 | 1 => 1,
            c => c as usize,
        }
    }

    /// 1 for single, N for fixed, -1 for variable
    pub(crate) fn count_class(&self) -> i32 {
        match self.count {
            c if c < 0 => -1,
            0 | 1 => 1,
            c => c,
        }
    }
}

/// Reflectors keyed by type name
///
/// Built once when a world is created. Registration mistakes panic;
/// looking up a missing type during script execution is an error.
#[derive(Default)]
pub struct ReflectorRegistry {
    reflectors: BTreeMap<&'static str, Rc<Reflector>>,
}

impl ReflectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reflector
    ///
    /// # Panics
    ///
    /// Panics if the name is empty or already registered, or if the
    /// reflector can neither push nor pull.
    pub fn register(&mut self, reflector: Reflector) {
        if reflector.name.is_empty() {
            panic!("reflector registered without a name");
        }
        if reflector.push.is_none() && reflector.pull.is_none() {
            panic!("reflector {:?} has neither push nor pull", reflector.name);
        }
        if self.reflectors.contains_key(reflector.name) {
            panic!("reflector {:?} registered more than once", reflector.name);
        }
        tracing::debug!(reflector = reflector.name, count = reflector.count, "registered type");
        self.reflectors.insert(reflector.name, Rc::new(reflector));
    }

    pub fn lookup(&self, name: &str) -> Option<Rc<Reflector>> {
        self.reflectors.get(name).cloned()
    }

    /// Like [`lookup`](Self::lookup), but a missing type is an error
    pub fn must_lookup(&self, name: &str) -> Result<Rc<Reflector>, Error> {
        self.lookup(name)
            .ok_or_else(|| Error::UnknownType(name.to_string()))
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&'static str> {
        self.reflectors.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<Reflector>> {
        self.reflectors.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_nothing(_: &mut State<'_>, _: Value) -> LuaResult<Vec<LuaValue>> {
        Ok(vec![])
    }

    fn named(name: &'static str) -> Reflector {
        Reflector {
            push: Some(push_nothing),
            ..Reflector::new(name)
        }
    }

    #[test]
    #[should_panic(expected = "registered more than once")]
    fn test_duplicate_panics() {
        let mut registry = ReflectorRegistry::new();
        registry.register(named("Thing"));
        registry.register(named("Thing"));
    }

    #[test]
    #[should_panic(expected = "neither push nor pull")]
    fn test_missing_functions_panic() {
        ReflectorRegistry::new().register(Reflector::new("Empty"));
    }

    #[test]
    fn test_must_lookup_is_recoverable() {
        let mut registry = ReflectorRegistry::new();
        registry.register(named("Thing"));
        assert!(registry.lookup("Thing").is_some());
        let err = registry.must_lookup("Other").err().unwrap();
        assert_eq!(err.to_string(), "unknown type \"Other\"");
    }

    #[test]
    fn test_value_count() {
        let variable = Reflector {
            count: -1,
            ..named("Tuple")
        };
        assert_eq!(variable.value_count(4), 4);
        assert_eq!(named("Thing").value_count(4), 1);
        let fixed = Reflector { count: 3, ..named("Triple") };
        assert_eq!(fixed.value_count(0), 3);
        assert_eq!(fixed.count_class(), 3);
    }
}
