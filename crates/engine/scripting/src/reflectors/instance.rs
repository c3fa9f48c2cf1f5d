//! The Instance reflector
//!
//! Members declared here take precedence over properties. Any other string
//! key is a property access resolved by [`crate::reconcile`].

use super::{pull_string, push_object};
use crate::reconcile::active_desc;
use crate::reflector::{Member, Reflector};
use crate::state::State;
use crate::Error;
use mlua::prelude::*;
use rtypes::{type_names as t, Array, Instance, Value};

pub(super) fn reflector() -> Reflector {
    Reflector {
        push: Some(push_object),
        pull: Some(pull_instance),
        ..Reflector::new(t::INSTANCE)
    }
    .with_constructor("new", instance_new)
    .with_member(
        "ClassName",
        Member::settable(
            t::STRING,
            |s, v| s.ret(Value::String(as_instance(v)?.class_name())),
            |s, v| {
                let class = pull_string(s, 1)?;
                as_instance(v)?.set_class_name(class);
                Ok(())
            },
        ),
    )
    .with_member(
        "Name",
        Member::settable(
            t::STRING,
            |s, v| s.ret(Value::String(as_instance(v)?.name())),
            |s, v| {
                let name = pull_string(s, 1)?;
                as_instance(v)?.set_name(name);
                Ok(())
            },
        ),
    )
    .with_member(
        "Parent",
        Member::settable(
            t::INSTANCE,
            |s, v| ret_opt(s, as_instance(v)?.parent()),
            |s, v| {
                let parent = s.pull_opt(1, t::INSTANCE, Value::Nil)?;
                let parent = match &parent {
                    Value::Instance(p) => Some(p),
                    _ => None,
                };
                as_instance(v)?.set_parent(parent).map_err(Error::from)?;
                Ok(())
            },
        ),
    )
    .with_member(
        "ClearAllChildren",
        Member::method(t::NIL, |_, v| {
            as_instance(v)?.clear_all_children();
            Ok(LuaMultiValue::new())
        }),
    )
    .with_member(
        "Clone",
        Member::method(t::INSTANCE, |s, v| s.ret(Value::Instance(as_instance(v)?.clone_deep()))),
    )
    .with_member(
        "Destroy",
        Member::method(t::NIL, |_, v| {
            as_instance(v)?.destroy();
            Ok(LuaMultiValue::new())
        }),
    )
    .with_member(
        "FindFirstAncestor",
        Member::method(t::INSTANCE, |s, v| {
            let name = pull_string(s, 1)?;
            ret_opt(s, as_instance(v)?.find_first_ancestor(&name))
        }),
    )
    .with_member(
        "FindFirstAncestorOfClass",
        Member::method(t::INSTANCE, |s, v| {
            let class = pull_string(s, 1)?;
            ret_opt(s, as_instance(v)?.find_first_ancestor_of_class(&class))
        }),
    )
    .with_member(
        "FindFirstChild",
        Member::method(t::INSTANCE, |s, v| {
            let name = pull_string(s, 1)?;
            let recursive = s.pull_opt(2, t::BOOL, Value::Bool(false))?;
            let recursive = recursive.as_bool().map_err(Error::from)?;
            ret_opt(s, as_instance(v)?.find_first_child(&name, recursive))
        }),
    )
    .with_member(
        "FindFirstChildOfClass",
        Member::method(t::INSTANCE, |s, v| {
            let class = pull_string(s, 1)?;
            ret_opt(s, as_instance(v)?.find_first_child_of_class(&class))
        }),
    )
    .with_member(
        "GetChildren",
        Member::method(t::ARRAY, |s, v| s.ret(instances(as_instance(v)?.children()))),
    )
    .with_member(
        "GetDescendants",
        Member::method(t::ARRAY, |s, v| s.ret(instances(as_instance(v)?.descendants()))),
    )
    .with_member(
        "GetFullName",
        Member::method(t::STRING, |s, v| s.ret(Value::String(as_instance(v)?.full_name()))),
    )
    .with_member("IsA", Member::method(t::BOOL, is_a))
    .with_member(
        "IsAncestorOf",
        Member::method(t::BOOL, |s, v| {
            let other = pull_instance_arg(s, 1)?;
            s.ret(Value::Bool(as_instance(v)?.is_ancestor_of(&other)))
        }),
    )
    .with_member(
        "IsDescendantOf",
        Member::method(t::BOOL, |s, v| {
            let other = pull_instance_arg(s, 1)?;
            s.ret(Value::Bool(as_instance(v)?.is_descendant_of(&other)))
        }),
    )
    .with_member("GetService", Member::method(t::INSTANCE, get_service))
}

fn pull_instance(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    super::pull_object(values, t::INSTANCE)
}

fn as_instance(value: &Value) -> LuaResult<&Instance> {
    Ok(value.as_instance().map_err(Error::from)?)
}

fn pull_instance_arg(state: &mut State<'_>, position: usize) -> LuaResult<Instance> {
    let value = state.pull(position, t::INSTANCE)?;
    Ok(as_instance(&value)?.clone())
}

fn ret_opt(state: &mut State<'_>, inst: Option<Instance>) -> LuaResult<LuaMultiValue> {
    state.ret(inst.map(Value::Instance).unwrap_or(Value::Nil))
}

fn instances(list: Vec<Instance>) -> Value {
    Value::Array(Array::from_vec(list.into_iter().map(Value::Instance).collect()))
}

/// Class check through the descriptor's superclass chain when the class is
/// described, by exact name otherwise
fn is_a(state: &mut State<'_>, value: &Value) -> LuaResult<LuaMultiValue> {
    let target = pull_string(state, 1)?;
    let inst = as_instance(value)?;
    let class = inst.class_name();
    let result = match active_desc(state, inst) {
        Some(desc) if desc.class(&class).is_some() => desc.is_a(&class, &target),
        _ => class == target,
    };
    state.ret(Value::Bool(result))
}

/// Find a service by class, creating it if missing
fn get_service(state: &mut State<'_>, value: &Value) -> LuaResult<LuaMultiValue> {
    let class = pull_string(state, 1)?;
    let inst = as_instance(value)?;
    if !inst.is_data_model() {
        return Err(Error::runtime("GetService can only be called on a DataModel").into());
    }
    if let Some(existing) = inst.find_first_child_of_class(&class) {
        return state.ret(Value::Instance(existing));
    }
    if let Some(desc) = active_desc(state, inst) {
        if desc.class(&class).is_none() {
            return Err(Error::Descriptor(format!("{class} is not a valid service")).into());
        }
    }
    let service = Instance::new(class.as_str());
    service.set_service(true);
    service.set_parent(Some(inst)).map_err(Error::from)?;
    tracing::debug!(class = %class, "created service");
    state.ret(Value::Instance(service))
}

/// `Instance.new(class [, parent [, desc]])`
fn instance_new(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let class = pull_string(state, 1)?;
    let parent = match state.pull_opt(2, t::INSTANCE, Value::Nil)? {
        Value::Instance(p) => Some(p),
        _ => None,
    };
    let desc = match state.pull_opt(3, t::ROOT_DESC, Value::Nil)? {
        Value::RootDesc(d) => Some(d),
        _ => None,
    };

    let active = desc
        .clone()
        .or_else(|| parent.as_ref().and_then(|p| p.nearest_desc()))
        .or_else(|| state.host().global_desc());
    if let Some(active) = active {
        if active.class(&class).is_none() {
            return Err(Error::Descriptor(format!("unable to create instance of type {class}")).into());
        }
    }

    let inst = Instance::new(class.as_str());
    inst.set_desc(desc);
    inst.set_parent(parent.as_ref()).map_err(Error::from)?;
    state.ret(Value::Instance(inst))
}

/// `DataModel.new([desc])`
pub(crate) fn data_model_new(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let desc = match state.pull_opt(1, t::ROOT_DESC, Value::Nil)? {
        Value::RootDesc(d) => Some(d),
        _ => None,
    };
    let dm = Instance::new_data_model();
    dm.set_desc(desc);
    state.ret(Value::Instance(dm))
}

#[cfg(test)]
mod tests {
    use crate::testing::{eval, eval_err};
    use rtypes::Value;

    #[test]
    fn test_tree_members() {
        let src = r#"
            local model = Instance.new("Model")
            model.Name = "Root"
            local part = Instance.new("Part", model)
            local child = Instance.new("Folder", part)
            return child:GetFullName(), #model:GetDescendants(), part.Parent == model
        "#;
        assert_eq!(eval(src), Value::from("Root.Part.Folder"));
        assert_eq!(
            eval("local m = Instance.new('Model'); Instance.new('Part', m); return #m:GetDescendants()"),
            Value::Int64(1)
        );
    }

    #[test]
    fn test_cyclic_parent_is_error() {
        let err = eval_err(
            r#"
            local a = Instance.new("Folder")
            local b = Instance.new("Folder", a)
            a.Parent = b
            "#,
        );
        assert!(err.contains("as its own ancestor"), "{err}");
    }

    #[test]
    fn test_untyped_properties() {
        let src = r#"
            local part = Instance.new("Part")
            assert(part.Anchored == nil)
            part.Anchored = true
            part.Label = "a"
            return part.Anchored, part.Label
        "#;
        assert_eq!(eval(src), Value::Bool(true));
    }

    #[test]
    fn test_get_service_creates_once() {
        let src = r#"
            local game = DataModel.new()
            local ws = game:GetService("Workspace")
            return ws == game:GetService("Workspace") and ws[sym.IsService]
        "#;
        assert_eq!(eval(src), Value::Bool(true));
        let err = eval_err("return Instance.new('Model'):GetService('Workspace')");
        assert!(err.contains("only be called on a DataModel"), "{err}");
    }

    #[test]
    fn test_destroyed_parent_is_locked() {
        let err = eval_err(
            r#"
            local part = Instance.new("Part")
            part:Destroy()
            part.Parent = Instance.new("Model")
            "#,
        );
        assert!(err.contains("locked"), "{err}");
    }

    #[test]
    fn test_clone_is_detached() {
        let src = r#"
            local model = Instance.new("Model")
            local part = Instance.new("Part", model)
            part.Size = 3
            local copy = part:Clone()
            return copy.Parent == nil and copy.Size == 3 and copy ~= part
        "#;
        assert_eq!(eval(src), Value::Bool(true));
    }
}
