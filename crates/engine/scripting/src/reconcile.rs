//! Instance property access against an optional descriptor
//!
//! A property access is resolved in this order:
//!
//! 1. Symbol keys (`sym.Reference`, `sym.Desc`, ...) go to a fixed table.
//! 2. The descriptor is the instance's nearest one, else the host's global.
//! 3. Without a descriptor, or for a class it does not declare, the raw
//!    property map is used. Unset properties read as nil and writes only
//!    coerce between flavours of the value already stored.
//! 4. Otherwise the declared property type governs reads and writes. Reading
//!    an unset declared property is an error.

use crate::state::{State, VARIANT};
use crate::{Error, Result};
use mlua::prelude::*;
use rtypes::{
    type_names as t, EnumDesc, EnumItem, Instance, PropertyDesc, RootDesc, TypeDesc, Value,
};
use std::sync::Arc;

pub const SYM_REFERENCE: &str = "Reference";
pub const SYM_IS_SERVICE: &str = "IsService";
pub const SYM_DESC: &str = "Desc";
pub const SYM_RAW_DESC: &str = "RawDesc";

/// Every symbol, in the order the `sym` library exposes them
pub const SYMBOLS: &[&str] = &[SYM_REFERENCE, SYM_IS_SERVICE, SYM_DESC, SYM_RAW_DESC];

/// The descriptor governing an instance
pub fn active_desc(state: &State<'_>, inst: &Instance) -> Option<Arc<RootDesc>> {
    inst.nearest_desc().or_else(|| state.host().global_desc())
}

/// Resolve the declared property, if the instance's class is described
///
/// `Ok(None)` means untyped mode.
fn typed_property(
    state: &State<'_>,
    inst: &Instance,
    name: &str,
) -> LuaResult<Option<(Arc<RootDesc>, PropertyDesc)>> {
    let Some(desc) = active_desc(state, inst) else {
        return Ok(None);
    };
    let class = inst.class_name();
    if desc.class(&class).is_none() {
        return Ok(None);
    }
    match desc.property(&class, name) {
        Some(prop) => {
            let prop = prop.clone();
            Ok(Some((desc, prop)))
        }
        None => Err(Error::Descriptor(format!("{name} is not a valid member of {class}")).into()),
    }
}

fn enum_desc<'a>(desc: &'a RootDesc, prop: &PropertyDesc) -> Result<&'a EnumDesc> {
    desc.enum_(&prop.value_type.name).ok_or_else(|| {
        Error::Descriptor(format!(
            "no enum descriptor {} for property {}",
            prop.value_type.name, prop.name
        ))
    })
}

/// Read a property
pub fn get_property(state: &mut State<'_>, inst: &Instance, name: &str) -> LuaResult<LuaValue> {
    let Some((desc, prop)) = typed_property(state, inst, name)? else {
        return match inst.get(name) {
            Some(value) => state.push_one(value),
            None => Ok(LuaValue::Nil),
        };
    };

    let value = inst.get(name).ok_or_else(|| {
        Error::Descriptor(format!(
            "property {}.{name} not initialized",
            inst.class_name()
        ))
    })?;

    match prop.value_type.category.as_str() {
        "Enum" => {
            let enum_desc = enum_desc(&desc, &prop)?;
            let item = match &value {
                Value::EnumItem(item) => Some(item.clone()),
                other => other
                    .as_intlike()
                    .and_then(|v| u32::try_from(v).ok())
                    .and_then(|v| enum_desc.item_by_value(v)),
            };
            match item {
                Some(item) => state.push_one(Value::EnumItem(item)),
                None => Err(Error::Descriptor(format!(
                    "{}.{name}: invalid value {value} for enum {}",
                    inst.class_name(),
                    enum_desc.name
                ))
                .into()),
            }
        }
        _ => state.push_one(value),
    }
}

/// Write a property from the value at frame position 1
pub fn set_property(state: &mut State<'_>, inst: &Instance, name: &str) -> LuaResult<()> {
    let Some((desc, prop)) = typed_property(state, inst, name)? else {
        let value = state.pull(1, VARIANT)?;
        if value.is_nil() {
            inst.remove(name);
            return Ok(());
        }
        let value = match inst.get(name) {
            Some(existing) => coerce_untyped(&existing, value),
            None => value,
        };
        inst.set(name, value);
        return Ok(());
    };

    let class = inst.class_name();
    let value = typed_value(state, &desc, &prop).map_err(|e| match e {
        Error::Lua(e) => e,
        e => Error::Descriptor(format!("{class}.{name}: {e}")).into(),
    })?;
    tracing::trace!(class = %class, property = name, kind = value.type_name(), "set property");
    inst.set(name, value);
    Ok(())
}

/// The assigned value, checked against the declared property type
fn typed_value(state: &mut State<'_>, desc: &RootDesc, prop: &PropertyDesc) -> Result<Value> {
    match prop.value_type.category.as_str() {
        "Class" => class_value(state, &prop.value_type),
        "Enum" => Ok(Value::Token(enum_value(state, enum_desc(desc, prop)?)?.value)),
        _ => {
            let value = state.pull(1, VARIANT)?;
            coerce_typed(&prop.value_type, value)
        }
    }
}

/// Keep the flavour of the stored value when the new one is compatible
fn coerce_untyped(existing: &Value, value: Value) -> Value {
    let target = existing.type_name();
    if target == value.type_name() {
        return value;
    }
    if t::STRINGLIKE.contains(&target) {
        if let Some(converted) = value.convert_stringlike(target) {
            return converted;
        }
    }
    if t::NUMERIC.contains(&target) {
        if let Some(converted) = value.convert_numeric(target) {
            return converted;
        }
    }
    value
}

/// Convert to the declared type, or fail naming both types
fn coerce_typed(declared: &TypeDesc, value: Value) -> Result<Value> {
    let target = declared.name.as_str();
    if value.type_name() == target {
        return Ok(value);
    }
    let converted = if t::STRINGLIKE.contains(&target) {
        value.convert_stringlike(target)
    } else if t::NUMERIC.contains(&target) {
        value.convert_numeric(target)
    } else {
        None
    };
    converted.ok_or_else(|| Error::type_error(target, value.type_name()))
}

/// An instance whose class is exactly the declared one, or nil
fn class_value(state: &mut State<'_>, declared: &TypeDesc) -> Result<Value> {
    let value = state
        .pull_opt(1, t::INSTANCE, Value::Nil)
        .map_err(|_| Error::type_error(&declared.name, State::type_of(&state.get(1))))?;
    if let Value::Instance(inst) = &value {
        let class = inst.class_name();
        if class != declared.name {
            return Err(Error::type_error(&declared.name, class));
        }
    }
    Ok(value)
}

/// Resolve the assigned value to an item of `desc`
///
/// Tried in order: an enum item, a raw token, an integer, a number, a name.
fn enum_value(state: &mut State<'_>, desc: &EnumDesc) -> Result<EnumItem> {
    let value = state.pull(1, VARIANT)?;

    let item = if let Value::EnumItem(item) = &value {
        if item.enum_name != desc.name {
            return Err(Error::Descriptor(format!(
                "{item} is not an item of enum {}",
                desc.name
            )));
        }
        desc.item_by_value(item.value)
    } else if let Value::Token(token) = &value {
        desc.item_by_value(*token)
    } else if let Some(int) = value.as_intlike() {
        u32::try_from(int).ok().and_then(|v| desc.item_by_value(v))
    } else if let Some(number) = value.as_numberlike() {
        let int = number as i64;
        u32::try_from(int).ok().and_then(|v| desc.item_by_value(v))
    } else if let Some(name) = value.as_stringlike() {
        std::str::from_utf8(name).ok().and_then(|name| desc.item_by_name(name))
    } else {
        None
    };
    item.ok_or_else(|| {
        Error::Descriptor(format!("invalid value {value} for enum {}", desc.name))
    })
}

/// Read a symbol
pub fn get_symbol(state: &mut State<'_>, inst: &Instance, symbol: &str) -> LuaResult<LuaValue> {
    match symbol {
        SYM_REFERENCE => state.push_one(Value::String(inst.reference())),
        SYM_IS_SERVICE => Ok(LuaValue::Boolean(inst.is_service())),
        SYM_DESC => desc_value(state, inst.nearest_desc()),
        SYM_RAW_DESC => desc_value(state, inst.desc()),
        other => Err(Error::runtime(format!("symbol {other} is not a valid member of Instance")).into()),
    }
}

fn desc_value(state: &mut State<'_>, desc: Option<Arc<RootDesc>>) -> LuaResult<LuaValue> {
    match desc {
        Some(desc) => state.push_one(Value::RootDesc(desc)),
        None => Ok(LuaValue::Nil),
    }
}

/// Write a symbol from the value at frame position 1
pub fn set_symbol(state: &mut State<'_>, inst: &Instance, symbol: &str) -> LuaResult<()> {
    match symbol {
        SYM_REFERENCE => {
            let reference = state.pull(1, t::STRING)?;
            inst.set_reference(reference.as_string().map_err(Error::from)?);
        }
        SYM_IS_SERVICE => {
            let flag = state.pull(1, t::BOOL)?;
            inst.set_service(flag.as_bool().map_err(Error::from)?);
        }
        SYM_DESC | SYM_RAW_DESC => match state.pull_opt(1, t::ROOT_DESC, Value::Nil)? {
            Value::RootDesc(desc) => inst.set_desc(Some(desc)),
            _ => inst.set_desc(None),
        },
        other => {
            return Err(Error::runtime(format!("symbol {other} is not a valid member of Instance")).into())
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::error::message;
    use crate::testing::world;
    use crate::World;
    use rtypes::{ClassDesc, EnumDesc, Instance, MemberDesc, PropertyDesc, RootDesc, TypeDesc, Value};
    use std::sync::Arc;

    fn property(name: &str, category: &str, type_name: &str) -> MemberDesc {
        MemberDesc::Property(PropertyDesc {
            name: name.into(),
            value_type: TypeDesc::new(category, type_name),
            ..Default::default()
        })
    }

    fn typed_world() -> World {
        let mut part = ClassDesc::new("Part", "Instance");
        part.members.extend([
            property("Link", "Class", "Model"),
            property("Size", "Primitive", "float"),
            property("Source", "Primitive", "ProtectedString"),
            property("Shape", "Enum", "PartType"),
            property("Material", "Enum", "Material"),
        ]);
        let desc = RootDesc::new()
            .with_class(ClassDesc::new("Instance", "<<<ROOT>>>"))
            .with_class(ClassDesc::new("Model", "Instance"))
            .with_class(ClassDesc::new("Folder", "Instance"))
            .with_class(part)
            .with_enum(EnumDesc::new("PartType").with_item("Ball", 0).with_item("Block", 1))
            .with_enum(EnumDesc::new("Material").with_item("Plastic", 256));
        let world = world();
        world.set_global_desc(Some(Arc::new(desc)));
        world
    }

    fn run(world: &World, src: &str, args: Vec<Value>) -> Vec<Value> {
        world.do_string(src, "reconcile", args).unwrap()
    }

    fn run_err(world: &World, src: &str) -> String {
        match world.do_string(src, "reconcile", Vec::new()) {
            Ok(values) => panic!("expected an error, got {values:?}"),
            Err(crate::Error::Lua(e)) => message(&e),
            Err(e) => e.to_string(),
        }
    }

    fn instance(value: &Value) -> Instance {
        value.as_instance().unwrap().clone()
    }

    #[test]
    fn test_class_property_takes_exact_class() {
        let world = typed_world();
        let results = run(
            &world,
            r#"
            local part = Instance.new("Part")
            local model = Instance.new("Model")
            part.Link = model
            return part.Link == model, typeof(part.Link)
            "#,
            Vec::new(),
        );
        assert_eq!(results, vec![Value::Bool(true), Value::from("Instance")]);

        assert_eq!(
            run_err(&world, r#"Instance.new("Part").Link = Instance.new("Folder")"#),
            "Part.Link: Model expected, got Folder"
        );
        assert_eq!(
            run_err(&world, r#"Instance.new("Part").Link = 5"#),
            "Part.Link: Model expected, got number"
        );
    }

    #[test]
    fn test_typed_property_coerces_to_declared_type() {
        let world = typed_world();
        let results = run(
            &world,
            r#"
            local part = Instance.new("Part")
            part.Size = 2
            part.Source = "print(1)"
            return part
            "#,
            Vec::new(),
        );
        let part = instance(&results[0]);
        assert_eq!(part.get("Size"), Some(Value::Float(2.0)));
        assert_eq!(part.get("Source"), Some(Value::ProtectedString("print(1)".into())));

        assert_eq!(
            run_err(&world, r#"Instance.new("Part").Size = "big""#),
            "Part.Size: float expected, got string"
        );
        assert_eq!(
            run_err(&world, r#"Instance.new("Part").Source = "\xff""#),
            "Part.Source: ProtectedString expected, got BinaryString"
        );
    }

    #[test]
    fn test_untyped_write_keeps_stored_flavour() {
        let world = world();
        let inst = Instance::new("Script");
        inst.set("Source", Value::ProtectedString("a".into()));
        inst.set("Count", Value::Int(1));

        run(
            &world,
            r#"
            local inst = ...
            inst.Source = "b"
            inst.Count = 7.9
            inst.Blob = "\xff"
            "#,
            vec![Value::Instance(inst.clone())],
        );
        assert_eq!(inst.get("Source"), Some(Value::ProtectedString("b".into())));
        assert_eq!(inst.get("Count"), Some(Value::Int(7)));
        assert_eq!(inst.get("Blob"), Some(Value::BinaryString(vec![0xff])));

        run(&world, "local inst = ...; inst.Source = nil", vec![Value::Instance(inst.clone())]);
        assert_eq!(inst.get("Source"), None);
    }

    #[test]
    fn test_enum_item_from_another_enum_is_rejected() {
        let world = typed_world();
        let err = run_err(
            &world,
            r#"
            local part = Instance.new("Part")
            part.Material = "Plastic"
            part.Shape = part.Material
            "#,
        );
        assert_eq!(
            err,
            "Part.Shape: Enum.Material.Plastic is not an item of enum PartType"
        );

        let err = run_err(&world, r#"Instance.new("Part").Shape = 7"#);
        assert_eq!(err, "Part.Shape: invalid value 7 for enum PartType");
    }

    #[test]
    fn test_symbols_read_and_write_instance_state() {
        let world = world();
        let results = run(
            &world,
            r#"
            local model = Instance.new("Model")
            local part = Instance.new("Part")
            part.Parent = model
            part[sym.Reference] = "RBX1"
            model[sym.IsService] = true
            local before = part[sym.Desc] == nil
            model[sym.Desc] = RootDesc.new()
            local inherited = typeof(part[sym.Desc])
            local raw = part[sym.RawDesc] == nil
            local own = typeof(model[sym.RawDesc])
            model[sym.Desc] = nil
            return part[sym.Reference], model[sym.IsService], part[sym.IsService],
                before, inherited, raw, own, part[sym.Desc] == nil
            "#,
            Vec::new(),
        );
        assert_eq!(
            results,
            vec![
                Value::from("RBX1"),
                Value::Bool(true),
                Value::Bool(false),
                Value::Bool(true),
                Value::from("RootDesc"),
                Value::Bool(true),
                Value::from("RootDesc"),
                Value::Bool(true),
            ]
        );
    }
}
