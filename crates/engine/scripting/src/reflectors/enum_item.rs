//! The EnumItem reflector

use super::push_object;
use crate::reflector::{Member, Reflector};
use crate::state::State;
use mlua::prelude::*;
use rtypes::{type_names as t, EnumItem, Value};

pub(super) fn reflector() -> Reflector {
    Reflector {
        push: Some(push_object),
        pull: Some(pull_enum_item),
        ..Reflector::new(t::ENUM_ITEM)
    }
    .with_member("Name", Member::property(t::STRING, |s, v| s.ret(Value::String(item(v)?.name.clone()))))
    .with_member("Value", Member::property(t::INT, |s, v| s.ret(Value::Int(item(v)?.value as i32))))
    .with_member(
        "EnumType",
        Member::property(t::STRING, |s, v| s.ret(Value::String(item(v)?.enum_name.clone()))),
    )
}

fn pull_enum_item(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    super::pull_object(values, t::ENUM_ITEM)
}

fn item(value: &Value) -> LuaResult<&EnumItem> {
    match value {
        Value::EnumItem(item) => Ok(item),
        other => Err(super::wrong_receiver(t::ENUM_ITEM, other)),
    }
}
