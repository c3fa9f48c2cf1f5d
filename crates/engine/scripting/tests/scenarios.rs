//! End-to-end behaviour of the scripting host through real Lua chunks

use formats::{Format, Options};
use rtypes::{
    Array, ClassDesc, Dictionary, EnumDesc, MemberDesc, PropertyDesc, RootDesc, TypeDesc, Value,
};
use scripting::mlua::prelude::*;
use scripting::{host_error, Error, HostConfig, Reflector, State, World};
use std::sync::Arc;

fn world() -> World {
    let world = World::new();
    world.open_all().unwrap();
    world
}

fn run(world: &World, src: &str) -> Vec<Value> {
    world.do_string(src, "scenario", Vec::new()).unwrap()
}

fn run_err(world: &World, src: &str) -> String {
    world.do_string(src, "scenario", Vec::new()).unwrap_err().to_string()
}

fn brick_desc() -> RootDesc {
    let mut part = ClassDesc::new("Part", "Instance");
    part.members.push(MemberDesc::Property(PropertyDesc {
        name: "BrickColor".into(),
        value_type: TypeDesc::new("Enum", "BrickColor"),
        ..Default::default()
    }));
    part.members.push(MemberDesc::Property(PropertyDesc {
        name: "Anchored".into(),
        value_type: TypeDesc::new("Primitive", "bool"),
        ..Default::default()
    }));
    RootDesc::new()
        .with_class(ClassDesc::new("Instance", "<<<ROOT>>>"))
        .with_class(part)
        .with_enum(
            EnumDesc::new("BrickColor")
                .with_item("White", 1)
                .with_item("Red", 21),
        )
}

#[test]
fn test_array_push_and_pull() {
    let world = World::new();
    let array = Array::from_vec(vec![Value::from("a"), Value::Int(1), Value::Bool(true)]);

    let pushed = world.push(Value::Array(array)).unwrap();
    let LuaValue::Table(table) = &pushed else {
        panic!("expected a table, got {pushed:?}");
    };
    assert_eq!(table.raw_len(), 3);
    assert_eq!(table.raw_get::<String>(1).unwrap(), "a");
    assert_eq!(table.raw_get::<i64>(2).unwrap(), 1);
    assert!(table.raw_get::<bool>(3).unwrap());

    let Value::Array(pulled) = world.pull(&pushed, "Array").unwrap() else {
        panic!("expected an Array");
    };
    assert_eq!(
        pulled.to_vec(),
        vec![Value::from("a"), Value::Int64(1), Value::Bool(true)]
    );
}

#[test]
fn test_enum_property_by_name() {
    let world = world();
    world.set_global_desc(Some(Arc::new(brick_desc())));

    let results = run(
        &world,
        r#"
        local part = Instance.new("Part")
        part.BrickColor = "Red"
        local color = part.BrickColor
        return typeof(color), color.Name, color.Value, color.EnumType
        "#,
    );
    assert_eq!(
        results,
        vec![
            Value::from("EnumItem"),
            Value::from("Red"),
            Value::Int64(21),
            Value::from("BrickColor"),
        ]
    );

    let err = run_err(
        &world,
        r#"Instance.new("Part").BrickColor = "NotAColor""#,
    );
    assert!(err.contains("enum BrickColor"), "{err}");
}

#[test]
fn test_enum_property_accepts_numbers_and_items() {
    let world = world();
    world.set_global_desc(Some(Arc::new(brick_desc())));

    let results = run(
        &world,
        r#"
        local a = Instance.new("Part")
        local b = Instance.new("Part")
        a.BrickColor = 1
        b.BrickColor = a.BrickColor
        return a.BrickColor.Name, b.BrickColor == a.BrickColor
        "#,
    );
    assert_eq!(results, vec![Value::from("White"), Value::Bool(true)]);
}

#[test]
#[should_panic(expected = "registered more than once")]
fn test_duplicate_json_format_panics_at_registration() {
    let world = World::new();
    world.register_format(Format {
        can_decode: |_| true,
        ..Format::named("json")
    });
}

fn pull_boom(_: &mut State<'_>, _: &[LuaValue]) -> LuaResult<Value> {
    Err(LuaError::RuntimeError("boom pull called".into()))
}

#[test]
fn test_pull_opt_skips_reflector_on_nil() {
    let world = World::new();
    world.register_type(Reflector {
        pull: Some(pull_boom),
        ..Reflector::new("Boom")
    });

    let mut state = State::new(world.lua(), vec![LuaValue::Nil, LuaValue::Integer(1)]).unwrap();
    let value = state.pull_opt(1, "Boom", Value::from("default")).unwrap();
    assert_eq!(value, Value::from("default"));

    let err = state.pull_opt(2, "Boom", Value::Nil).unwrap_err();
    assert!(err.to_string().contains("boom pull called"));
}

#[test]
fn test_self_containing_array_is_rejected() {
    let world = World::new();
    let array = Array::new();
    array.push(Value::Int(1));
    array.push(Value::Array(array.clone()));

    let err = world.push(Value::Array(array)).unwrap_err();
    assert!(matches!(host_error(&err), Some(Error::Cyclic(_))));
}

#[test]
fn test_indirect_dictionary_cycle_is_rejected() {
    let world = World::new();
    let outer = Dictionary::new();
    let inner = Array::from_vec(vec![Value::Dictionary(outer.clone())]);
    outer.insert("items", Value::Array(inner));

    let err = world.push(Value::Dictionary(outer)).unwrap_err();
    assert!(err.to_string().contains("cannot be cyclic"));
}

#[test]
fn test_lua_table_cycle_is_rejected() {
    let world = world();
    let err = run_err(&world, "local t = {1}; t[2] = t; return rbxmk.encodeFormat('json', t)");
    assert!(err.contains("cannot be cyclic"), "{err}");
}

#[test]
fn test_pull_any_of_follows_caller_order() {
    let world = World::new();
    let table: LuaTable = world.lua().load("return {10, 20}").eval().unwrap();
    let frame = vec![LuaValue::Table(table)];

    let mut state = State::new(world.lua(), frame.clone()).unwrap();
    let first = state.pull_any_of(1, &["Array", "Dictionary"]).unwrap();
    assert_eq!(first.type_name(), "Array");

    let mut state = State::new(world.lua(), frame).unwrap();
    let second = state.pull_any_of(1, &["Dictionary", "Array"]).unwrap();
    let Value::Dictionary(dict) = second else {
        panic!("expected a Dictionary");
    };
    assert_eq!(dict.get("1"), Some(Value::Int64(10)));
}

#[test]
fn test_untyped_and_typed_reads_differ() {
    let world = world();
    let results = run(&world, "return Instance.new('Part').Anchored");
    assert_eq!(results, vec![Value::Nil]);

    world.set_global_desc(Some(Arc::new(brick_desc())));
    let err = run_err(&world, "return Instance.new('Part').Anchored");
    assert!(err.contains("property Part.Anchored not initialized"), "{err}");
    let err = run_err(&world, "return Instance.new('Part').Transparency");
    assert!(err.contains("Transparency is not a valid member of Part"), "{err}");
}

#[test]
fn test_encode_with_decode_only_format_is_rejected() {
    fn decode_nothing(_: &Options, _: &mut dyn std::io::Read) -> formats::Result<Value> {
        Ok(Value::Nil)
    }

    let world = world();
    world.register_format(Format {
        can_decode: |_| true,
        decode: Some(decode_nothing),
        ..Format::named("readonly")
    });

    let err = world.encode("readonly", &Options::new(), &Value::Nil).unwrap_err();
    assert_eq!(err.to_string(), "cannot encode with format readonly");
    let err = run_err(&world, "return rbxmk.encodeFormat('readonly', 1)");
    assert!(err.contains("cannot encode with format readonly"), "{err}");
    assert_eq!(
        world.decode("readonly", "Variant", &Options::new(), b"").unwrap(),
        Value::Nil
    );
}

#[test]
fn test_script_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("build.server.lua");
    let world = world();

    let src = r#"
        local path = ...
        local script = Instance.new("Script")
        script.Source = "print('hi')"
        fs.write(path, script)
        local loaded = fs.read(path)
        return loaded.ClassName, loaded.Source, loaded.RunContext
    "#;
    let results = world
        .do_string(src, "scripts", vec![Value::String(path.display().to_string())])
        .unwrap();
    assert_eq!(results[0], Value::from("Script"));
    assert_eq!(results[1].as_stringlike(), Some(&b"print('hi')"[..]));
    assert_eq!(results[2], Value::Int64(1));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "print('hi')");
}

#[test]
fn test_config_drives_world() {
    let dir = tempfile::tempdir().unwrap();
    let desc_path = dir.path().join("api.desc.json");
    std::fs::write(
        &desc_path,
        serde_json::to_vec(&brick_desc()).unwrap(),
    )
    .unwrap();
    let config_path = dir.path().join("rbxhost.kdl");
    std::fs::write(
        &config_path,
        "desc \"api.desc.json\"\nlibraries \"base\" \"rbxmk\"\nformat \"json\" { Indent \"\" }\n",
    )
    .unwrap();

    let world = World::new();
    world
        .apply_config(&HostConfig::from_file(&config_path).unwrap())
        .unwrap();

    let names: Vec<_> = world.opened_libraries().iter().map(|l| l.name).collect();
    assert_eq!(names, vec!["base", "rbxmk"]);
    assert!(world.global_desc().unwrap().class("Part").is_some());

    let results = run(&world, "return rbxmk.decodeFormat('txt', rbxmk.encodeFormat('json', {1}))");
    assert_eq!(results, vec![Value::from("[\n1\n]")]);
    assert_eq!(run(&world, "return fs"), vec![Value::Nil]);
}
