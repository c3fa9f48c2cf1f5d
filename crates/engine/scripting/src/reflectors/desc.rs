//! Reflectors for descriptors and descriptor patches
//!
//! Descriptor parts reach scripts as plain dictionaries in the API-dump
//! shape, so they read the same as the `desc.json` format.

use super::{pull_string, push_object, wrong_receiver};
use crate::reflector::{Member, Operators, Reflector};
use crate::state::State;
use crate::Error;
use mlua::prelude::*;
use rtypes::{type_names as t, Array, RootDesc, Value};
use serde::Serialize;
use std::sync::Arc;

pub(super) fn reflectors() -> Vec<Reflector> {
    vec![root_desc(), desc_actions()]
}

fn as_desc(value: &Value) -> LuaResult<&Arc<RootDesc>> {
    match value {
        Value::RootDesc(desc) => Ok(desc),
        other => Err(wrong_receiver(t::ROOT_DESC, other)),
    }
}

/// A descriptor part as a dictionary, or nil
fn ret_part<T: Serialize>(state: &mut State<'_>, part: Option<&T>) -> LuaResult<LuaMultiValue> {
    let value = match part {
        Some(part) => {
            let json = serde_json::to_value(part).map_err(|e| Error::runtime(e.to_string()))?;
            formats::from_json(json)
        }
        None => Value::Nil,
    };
    state.ret(value)
}

fn strings(names: Vec<String>) -> Value {
    Value::Array(Array::from_vec(names.into_iter().map(Value::String).collect()))
}

fn pull_root_desc(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    super::pull_object(values, t::ROOT_DESC)
}

fn root_desc() -> Reflector {
    Reflector {
        push: Some(push_object),
        pull: Some(pull_root_desc),
        ..Reflector::new(t::ROOT_DESC)
    }
    .with_constructor("new", root_desc_new)
    .with_member(
        "ClassNames",
        Member::method(t::ARRAY, |s, v| s.ret(strings(as_desc(v)?.class_names()))),
    )
    .with_member(
        "EnumNames",
        Member::method(t::ARRAY, |s, v| s.ret(strings(as_desc(v)?.enum_names()))),
    )
    .with_member(
        "Class",
        Member::method(t::DICTIONARY, |s, v| {
            let name = pull_string(s, 1)?;
            let desc = Arc::clone(as_desc(v)?);
            ret_part(s, desc.class(&name))
        }),
    )
    .with_member(
        "Member",
        Member::method(t::DICTIONARY, |s, v| {
            let class = pull_string(s, 1)?;
            let member = pull_string(s, 2)?;
            let desc = Arc::clone(as_desc(v)?);
            ret_part(s, desc.member(&class, &member))
        }),
    )
    .with_member(
        "Enum",
        Member::method(t::DICTIONARY, |s, v| {
            let name = pull_string(s, 1)?;
            let desc = Arc::clone(as_desc(v)?);
            ret_part(s, desc.enum_(&name))
        }),
    )
    .with_member(
        "EnumItems",
        Member::method(t::ARRAY, |s, v| {
            let name = pull_string(s, 1)?;
            let items = as_desc(v)?.enum_(&name).map(|e| e.enum_items());
            s.ret(match items {
                Some(items) => {
                    Value::Array(Array::from_vec(items.into_iter().map(Value::EnumItem).collect()))
                }
                None => Value::Nil,
            })
        }),
    )
}

fn root_desc_new(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    state.ret(Value::RootDesc(Arc::new(RootDesc::new())))
}

fn pull_desc_actions(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    super::pull_object(values, t::DESC_ACTIONS)
}

fn desc_actions() -> Reflector {
    Reflector {
        push: Some(push_object),
        pull: Some(pull_desc_actions),
        operators: Operators {
            len: Some(desc_actions_len),
            ..Default::default()
        },
        ..Reflector::new(t::DESC_ACTIONS)
    }
}

fn desc_actions_len(_: &mut State<'_>, value: &Value) -> LuaResult<LuaValue> {
    match value {
        Value::DescActions(actions) => Ok(LuaValue::Integer(actions.len() as i64)),
        other => Err(wrong_receiver(t::DESC_ACTIONS, other)),
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{eval, world};
    use rtypes::{ClassDesc, EnumDesc, RootDesc, Value};
    use std::sync::Arc;

    #[test]
    fn test_root_desc_queries() {
        let world = world();
        let desc = RootDesc::new()
            .with_class(ClassDesc::new("Part", "Instance"))
            .with_enum(EnumDesc::new("Material").with_item("Wood", 512));
        world.set_global_desc(Some(Arc::new(desc)));
        let src = r#"
            local desc = rbxmk.getGlobalDesc()
            local class = desc:Class("Part")
            local items = desc:EnumItems("Material")
            return class.Name .. ":" .. class.Superclass .. ":" .. items[1].Name .. ":" .. tostring(desc:Class("Nope"))
        "#;
        let result = world.do_string(src, "desc", Vec::new()).unwrap();
        assert_eq!(result[0], Value::from("Part:Instance:Wood:nil"));
    }

    #[test]
    fn test_empty_desc() {
        assert_eq!(eval("return #RootDesc.new():ClassNames()"), Value::Int64(0));
    }
}
