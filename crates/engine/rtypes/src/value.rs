//! Value types exchanged between the host, scripts and formats

use crate::{
    Array, CFrame, Color3, DescAction, Dictionary, EnumItem, Error, Instance, NumberRange, Result,
    RootDesc, UDim, UDim2,
};
use glam::{Vec2, Vec3};
use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;
use std::sync::Arc;

/// Type tags reported by [`Value::type_name`]
pub mod type_names {
    pub const NIL: &str = "nil";
    pub const BOOL: &str = "bool";
    pub const INT: &str = "int";
    pub const INT64: &str = "int64";
    pub const FLOAT: &str = "float";
    pub const DOUBLE: &str = "double";
    pub const TOKEN: &str = "token";
    pub const STRING: &str = "string";
    pub const BINARY_STRING: &str = "BinaryString";
    pub const PROTECTED_STRING: &str = "ProtectedString";
    pub const SHARED_STRING: &str = "SharedString";
    pub const CONTENT: &str = "Content";
    pub const VECTOR2: &str = "Vector2";
    pub const VECTOR3: &str = "Vector3";
    pub const CFRAME: &str = "CFrame";
    pub const COLOR3: &str = "Color3";
    pub const UDIM: &str = "UDim";
    pub const UDIM2: &str = "UDim2";
    pub const NUMBER_RANGE: &str = "NumberRange";
    pub const ARRAY: &str = "Array";
    pub const DICTIONARY: &str = "Dictionary";
    pub const TUPLE: &str = "Tuple";
    pub const INSTANCE: &str = "Instance";
    pub const ENUM_ITEM: &str = "EnumItem";
    pub const ROOT_DESC: &str = "RootDesc";
    pub const DESC_ACTIONS: &str = "DescActions";

    /// Every tag that holds bytes without semantic loss
    pub const STRINGLIKE: &[&str] = &[
        STRING,
        BINARY_STRING,
        PROTECTED_STRING,
        SHARED_STRING,
        CONTENT,
    ];

    /// Every numeric primitive tag
    pub const NUMERIC: &[&str] = &[INT, INT64, FLOAT, DOUBLE];
}

use type_names as t;

/// A domain value
///
/// Scalars and geometric values have value semantics. `Array`, `Dictionary`
/// and `Instance` are shared references: cloning them shares the underlying
/// storage, and [`Value::copy`] produces an independent copy of containers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absence of a value
    #[default]
    Nil,
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Int64(i64),
    /// Single precision float
    Float(f32),
    /// Double precision float
    Double(f64),
    /// Raw enum value, as stored in an instance property
    Token(u32),
    String(String),
    BinaryString(Vec<u8>),
    ProtectedString(String),
    SharedString(Vec<u8>),
    Content(String),
    Vector2(Vec2),
    Vector3(Vec3),
    CFrame(CFrame),
    Color3(Color3),
    UDim(UDim),
    UDim2(UDim2),
    NumberRange(NumberRange),
    Array(Array),
    Dictionary(Dictionary),
    /// Positional multi-value result; never stored as a property
    Tuple(Vec<Value>),
    Instance(Instance),
    EnumItem(EnumItem),
    RootDesc(Arc<RootDesc>),
    DescActions(Arc<Vec<DescAction>>),
}

impl Value {
    /// Get the type tag of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => t::NIL,
            Value::Bool(_) => t::BOOL,
            Value::Int(_) => t::INT,
            Value::Int64(_) => t::INT64,
            Value::Float(_) => t::FLOAT,
            Value::Double(_) => t::DOUBLE,
            Value::Token(_) => t::TOKEN,
            Value::String(_) => t::STRING,
            Value::BinaryString(_) => t::BINARY_STRING,
            Value::ProtectedString(_) => t::PROTECTED_STRING,
            Value::SharedString(_) => t::SHARED_STRING,
            Value::Content(_) => t::CONTENT,
            Value::Vector2(_) => t::VECTOR2,
            Value::Vector3(_) => t::VECTOR3,
            Value::CFrame(_) => t::CFRAME,
            Value::Color3(_) => t::COLOR3,
            Value::UDim(_) => t::UDIM,
            Value::UDim2(_) => t::UDIM2,
            Value::NumberRange(_) => t::NUMBER_RANGE,
            Value::Array(_) => t::ARRAY,
            Value::Dictionary(_) => t::DICTIONARY,
            Value::Tuple(_) => t::TUPLE,
            Value::Instance(_) => t::INSTANCE,
            Value::EnumItem(_) => t::ENUM_ITEM,
            Value::RootDesc(_) => t::ROOT_DESC,
            Value::DescActions(_) => t::DESC_ACTIONS,
        }
    }

    /// Check if value is nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Whether the value may be stored as an instance property
    pub fn is_prop_value(&self) -> bool {
        !matches!(self, Value::Tuple(_))
    }

    /// Bytes of any string flavour
    pub fn as_stringlike(&self) -> Option<&[u8]> {
        match self {
            Value::String(s) | Value::ProtectedString(s) | Value::Content(s) => Some(s.as_bytes()),
            Value::BinaryString(b) | Value::SharedString(b) => Some(b),
            _ => None,
        }
    }

    /// Any numeric primitive as a double
    pub fn as_numberlike(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Int64(i) => Some(*i as f64),
            Value::Float(f) => Some(*f as f64),
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Any integer-valued primitive as a 64-bit integer
    pub fn as_intlike(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i as i64),
            Value::Int64(i) => Some(*i),
            Value::Token(t) => Some(*t as i64),
            _ => None,
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.type_error(t::BOOL)),
        }
    }

    /// Try to get as i64, truncating floats toward zero
    pub fn as_i64(&self) -> Result<i64> {
        if let Some(i) = self.as_intlike() {
            return Ok(i);
        }
        self.as_numberlike()
            .map(|f| f as i64)
            .ok_or_else(|| self.type_error(t::INT64))
    }

    /// Try to get as f64
    pub fn as_f64(&self) -> Result<f64> {
        self.as_numberlike()
            .ok_or_else(|| self.type_error(t::DOUBLE))
    }

    /// Try to get as a UTF-8 string; binary flavours are converted lossily
    pub fn as_string(&self) -> Result<String> {
        self.as_stringlike()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .ok_or_else(|| self.type_error(t::STRING))
    }

    /// Try to get as an instance
    pub fn as_instance(&self) -> Result<&Instance> {
        match self {
            Value::Instance(inst) => Ok(inst),
            _ => Err(self.type_error(t::INSTANCE)),
        }
    }

    /// Try to get as an array
    pub fn as_array(&self) -> Result<&Array> {
        match self {
            Value::Array(arr) => Ok(arr),
            _ => Err(self.type_error(t::ARRAY)),
        }
    }

    /// Try to get as a dictionary
    pub fn as_dictionary(&self) -> Result<&Dictionary> {
        match self {
            Value::Dictionary(dict) => Ok(dict),
            _ => Err(self.type_error(t::DICTIONARY)),
        }
    }

    fn type_error(&self, expected: &str) -> Error {
        Error::TypeError {
            expected: expected.to_string(),
            actual: self.type_name().to_string(),
        }
    }

    /// Convert between numeric primitives
    ///
    /// Integer targets truncate toward zero and wrap to the target width.
    /// Returns `None` when this value is not numeric or the target is not a
    /// numeric type.
    pub fn convert_numeric(&self, target: &str) -> Option<Value> {
        let int = self.as_intlike();
        let float = self.as_numberlike().or(int.map(|i| i as f64))?;
        let int = int.unwrap_or(float as i64);
        match target {
            t::INT => Some(Value::Int(int as i32)),
            t::INT64 => Some(Value::Int64(int)),
            t::FLOAT => Some(Value::Float(float as f32)),
            t::DOUBLE => Some(Value::Double(float)),
            t::TOKEN => Some(Value::Token(int as u32)),
            _ => None,
        }
    }

    /// Convert between string flavours, preserving the bytes
    ///
    /// The text flavours only hold UTF-8, so converting other bytes into
    /// them returns `None`.
    pub fn convert_stringlike(&self, target: &str) -> Option<Value> {
        let bytes = self.as_stringlike()?;
        let text = || std::str::from_utf8(bytes).ok().map(str::to_string);
        match target {
            t::STRING => text().map(Value::String),
            t::PROTECTED_STRING => text().map(Value::ProtectedString),
            t::CONTENT => text().map(Value::Content),
            t::BINARY_STRING => Some(Value::BinaryString(bytes.to_vec())),
            t::SHARED_STRING => Some(Value::SharedString(bytes.to_vec())),
            _ => None,
        }
    }

    /// Copy the value
    ///
    /// Arrays and dictionaries are copied recursively. Aliased containers stay
    /// aliased in the copy, so cyclic containers copy without looping.
    /// Instances are not copied; use [`Instance::clone_deep`] for that.
    pub fn copy(&self) -> Value {
        let mut copied = HashMap::new();
        self.copy_with(&mut copied)
    }

    fn copy_with(&self, copied: &mut HashMap<*const c_void, Value>) -> Value {
        match self {
            Value::Array(arr) => {
                if let Some(existing) = copied.get(&arr.ptr_id()) {
                    return existing.clone();
                }
                let out = Array::new();
                copied.insert(arr.ptr_id(), Value::Array(out.clone()));
                for item in arr.to_vec() {
                    out.push(item.copy_with(copied));
                }
                Value::Array(out)
            }
            Value::Dictionary(dict) => {
                if let Some(existing) = copied.get(&dict.ptr_id()) {
                    return existing.clone();
                }
                let out = Dictionary::new();
                copied.insert(dict.ptr_id(), Value::Dictionary(out.clone()));
                for (key, item) in dict.entries() {
                    out.insert(key, item.copy_with(copied));
                }
                Value::Dictionary(out)
            }
            Value::Tuple(items) => Value::Tuple(items.iter().map(|v| v.copy_with(copied)).collect()),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Int64(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Token(v) => write!(f, "{}", v),
            Value::String(s) | Value::ProtectedString(s) | Value::Content(s) => write!(f, "{}", s),
            Value::BinaryString(b) | Value::SharedString(b) => {
                write!(f, "{}", String::from_utf8_lossy(b))
            }
            Value::Vector2(v) => write!(f, "{}, {}", v.x, v.y),
            Value::Vector3(v) => write!(f, "{}, {}, {}", v.x, v.y, v.z),
            Value::CFrame(cf) => write!(f, "{}", cf),
            Value::Color3(c) => write!(f, "{}", c),
            Value::UDim(u) => write!(f, "{}", u),
            Value::UDim2(u) => write!(f, "{}", u),
            Value::NumberRange(r) => write!(f, "{}", r),
            Value::Array(arr) => write!(f, "Array({})", arr.len()),
            Value::Dictionary(dict) => write!(f, "Dictionary({})", dict.len()),
            Value::Tuple(items) => write!(f, "Tuple({})", items.len()),
            Value::Instance(inst) => write!(f, "{}", inst.name()),
            Value::EnumItem(item) => write!(f, "{}", item),
            Value::RootDesc(_) => write!(f, "RootDesc"),
            Value::DescActions(actions) => write!(f, "DescActions({})", actions.len()),
        }
    }
}

// Conversion from common types

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec2> for Value {
    fn from(v: Vec2) -> Self {
        Value::Vector2(v)
    }
}

impl From<Vec3> for Value {
    fn from(v: Vec3) -> Self {
        Value::Vector3(v)
    }
}

impl From<Instance> for Value {
    fn from(inst: Instance) -> Self {
        Value::Instance(inst)
    }
}

impl From<Array> for Value {
    fn from(arr: Array) -> Self {
        Value::Array(arr)
    }
}

impl From<Dictionary> for Value {
    fn from(dict: Dictionary) -> Self {
        Value::Dictionary(dict)
    }
}

impl From<RootDesc> for Value {
    fn from(desc: RootDesc) -> Self {
        Value::RootDesc(Arc::new(desc))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(Array::from_vec(v.into_iter().map(Into::into).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        let v = Value::from(42i32);
        assert_eq!(v.as_i64().unwrap(), 42);
        assert_eq!(v.as_f64().unwrap(), 42.0);

        let v = Value::from(3.75f64);
        assert_eq!(v.as_i64().unwrap(), 3);

        let v = Value::from("hello");
        assert_eq!(v.as_string().unwrap(), "hello");

        let v = Value::from(true);
        assert!(v.as_bool().unwrap());
    }

    #[test]
    fn test_type_errors() {
        let v = Value::from("string");
        assert!(v.as_i64().is_err());
        assert!(v.as_bool().is_err());
        assert_eq!(
            v.as_instance().unwrap_err().to_string(),
            "Instance expected, got string"
        );
    }

    #[test]
    fn test_numeric_conversion_truncates() {
        assert_eq!(
            Value::Double(-2.9).convert_numeric("int"),
            Some(Value::Int(-2))
        );
        assert_eq!(Value::Int64(1 << 33).convert_numeric("int"), Some(Value::Int(0)));
        assert_eq!(Value::Int(7).convert_numeric("float"), Some(Value::Float(7.0)));
        assert_eq!(Value::from("7").convert_numeric("int"), None);
        assert_eq!(Value::Int(7).convert_numeric("Vector3"), None);
    }

    #[test]
    fn test_stringlike_flavours() {
        let v = Value::BinaryString(b"abc".to_vec());
        assert_eq!(v.as_stringlike(), Some(&b"abc"[..]));
        assert_eq!(
            v.convert_stringlike("ProtectedString"),
            Some(Value::ProtectedString("abc".into()))
        );
        assert_eq!(Value::Int(1).convert_stringlike("string"), None);

        let raw = Value::BinaryString(vec![0xff]);
        assert_eq!(raw.convert_stringlike("ProtectedString"), None);
        assert_eq!(raw.convert_stringlike("SharedString"), Some(Value::SharedString(vec![0xff])));
    }

    #[test]
    fn test_copy_preserves_aliasing() {
        let inner = Array::from_vec(vec![Value::from(1)]);
        let outer = Array::from_vec(vec![Value::Array(inner.clone()), Value::Array(inner.clone())]);
        let copy = Value::Array(outer.clone()).copy();
        let copy = copy.as_array().unwrap().clone();

        assert!(!copy.ptr_eq(&outer));
        let (a, b) = (copy.get(0).unwrap(), copy.get(1).unwrap());
        let (a, b) = (a.as_array().unwrap(), b.as_array().unwrap());
        assert!(a.ptr_eq(b));
        assert!(!a.ptr_eq(&inner));
    }

    #[test]
    fn test_copy_cyclic_array() {
        let arr = Array::new();
        arr.push(Value::Array(arr.clone()));
        let copy = Value::Array(arr.clone()).copy();
        let copy = copy.as_array().unwrap().clone();
        let first = copy.get(0).unwrap();
        assert!(first.as_array().unwrap().ptr_eq(&copy));
    }

    #[test]
    fn test_tuple_is_not_prop_value() {
        assert!(!Value::Tuple(vec![]).is_prop_value());
        assert!(Value::Nil.is_prop_value());
    }
}
