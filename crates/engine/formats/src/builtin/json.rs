//! JSON to and from value trees

use crate::{Error, Format, OptionSpec, Options, Result};
use rtypes::{type_names as t, Array, Dictionary, Value};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Number, Value as Json};
use std::collections::HashSet;
use std::ffi::c_void;
use std::io::{Read, Write};

const DEFAULT_INDENT: &str = "  ";

pub fn json() -> Format {
    Format {
        media_types: &["application/json", "text/plain"],
        options: &[OptionSpec {
            name: "Indent",
            types: &[t::STRING],
        }],
        encode_types: &[
            t::NIL,
            t::BOOL,
            t::INT,
            t::INT64,
            t::FLOAT,
            t::DOUBLE,
            t::STRING,
            t::ARRAY,
            t::DICTIONARY,
        ],
        can_decode: |name| {
            matches!(
                name,
                "Variant" | t::NIL | t::BOOL | t::DOUBLE | t::STRING | t::ARRAY | t::DICTIONARY
            )
        },
        decode: Some(decode),
        encode: Some(encode),
        ..Format::named("json")
    }
}

fn decode(_: &Options, r: &mut dyn Read) -> Result<Value> {
    let json: Json = serde_json::from_reader(r)?;
    Ok(from_json(json))
}

fn encode(options: &Options, v: &Value, w: &mut dyn Write) -> Result<()> {
    let json = to_json(v)?;
    let indent = options.string("Indent").unwrap_or_else(|| DEFAULT_INDENT.to_string());
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut ser = serde_json::Serializer::with_formatter(w, formatter);
    json.serialize(&mut ser)?;
    Ok(())
}

/// Convert parsed JSON into a value tree
///
/// Numbers become doubles; objects become dictionaries.
pub fn from_json(json: Json) -> Value {
    match json {
        Json::Null => Value::Nil,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::Array(Array::from_vec(items.into_iter().map(from_json).collect())),
        Json::Object(map) => Value::Dictionary(Dictionary::from_map(
            map.into_iter().map(|(k, v)| (k, from_json(v))).collect(),
        )),
    }
}

/// Convert a value tree into JSON
///
/// Fails on values with no JSON form and on containers that contain
/// themselves. Dictionary keys come out sorted.
pub fn to_json(v: &Value) -> Result<Json> {
    to_json_guarded(v, &mut HashSet::new())
}

fn to_json_guarded(v: &Value, visited: &mut HashSet<*const c_void>) -> Result<Json> {
    Ok(match v {
        Value::Nil => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::from(*i),
        Value::Int64(i) => Json::from(*i),
        Value::Float(f) => number(*f as f64),
        Value::Double(f) => number(*f),
        Value::Array(arr) => {
            if !visited.insert(arr.ptr_id()) {
                return Err(Error::Cyclic("arrays"));
            }
            let items = arr
                .to_vec()
                .iter()
                .map(|item| to_json_guarded(item, visited))
                .collect::<Result<Vec<_>>>()?;
            visited.remove(&arr.ptr_id());
            Json::Array(items)
        }
        Value::Dictionary(dict) => {
            if !visited.insert(dict.ptr_id()) {
                return Err(Error::Cyclic("dictionaries"));
            }
            let mut map = Map::new();
            for (key, item) in dict.entries() {
                map.insert(key, to_json_guarded(&item, visited)?);
            }
            visited.remove(&dict.ptr_id());
            Json::Object(map)
        }
        other => match other.as_stringlike() {
            Some(bytes) => Json::String(std::str::from_utf8(bytes)?.to_string()),
            None => return Err(Error::wrong_kind("json", other)),
        },
    })
}

/// Non-finite numbers have no JSON form and become null
fn number(f: f64) -> Json {
    Number::from_f64(f).map(Json::Number).unwrap_or(Json::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_variant_tree() {
        let value = json()
            .decode_bytes(&Options::new(), br#"{"a": [1, "x", null, true]}"#)
            .unwrap();
        let dict = value.as_dictionary().unwrap();
        let arr = dict.get("a").unwrap();
        let arr = arr.as_array().unwrap();
        assert_eq!(arr.len(), 4);
        assert_eq!(arr.get(0), Some(Value::Double(1.0)));
        assert_eq!(arr.get(2), Some(Value::Nil));
    }

    #[test]
    fn test_encode_sorted_with_indent() {
        let dict = Dictionary::new();
        dict.insert("b", Value::Int(2));
        dict.insert("a", Value::ProtectedString("p".into()));
        let out = json()
            .encode_bytes(&Options::new().with("Indent", "\t"), &Value::Dictionary(dict))
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\n\t\"a\": \"p\",\n\t\"b\": 2\n}");
    }

    #[test]
    fn test_encode_rejects_cycles_and_foreign_values() {
        let arr = Array::new();
        arr.push(Value::Array(arr.clone()));
        let err = to_json(&Value::Array(arr)).unwrap_err();
        assert_eq!(err.to_string(), "arrays cannot be cyclic");

        let err = to_json(&Value::Vector3(rtypes::glam::Vec3::ONE)).unwrap_err();
        assert!(matches!(err, Error::WrongKind { .. }));
    }

    #[test]
    fn test_shared_but_acyclic_containers_encode() {
        let leaf = Array::from_vec(vec![Value::Int(1)]);
        let root = Array::from_vec(vec![Value::Array(leaf.clone()), Value::Array(leaf)]);
        let json = to_json(&Value::Array(root)).unwrap();
        assert_eq!(json.to_string(), "[[1],[1]]");
    }
}
