//! File access through the format registry

use super::{pull_format_opt, ret_result, Library};
use crate::reflectors::pull_string;
use crate::state::{bind, State, VARIANT};
use formats::Options;
use mlua::prelude::*;
use std::path::Path;

pub(super) fn library() -> Library {
    Library {
        name: "fs",
        import_as: Some("fs"),
        open,
    }
}

fn open(lua: &Lua) -> LuaResult<LuaTable> {
    let lib = lua.create_table()?;
    lib.set("read", bind(lua, read)?)?;
    lib.set("write", bind(lua, write)?)?;
    Ok(lib)
}

/// `read(path [, format]) -> value`
fn read(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let path = pull_string(state, 1)?;
    let (format, options) = match pull_format_opt(state, 2)? {
        Some((format, options)) => (Some(format.name), options),
        None => (None, Options::new()),
    };
    let result = state.host().read_file(Path::new(&path), format, &options);
    ret_result(state, result)
}

/// `write(path, value [, format])`
fn write(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let path = pull_string(state, 1)?;
    let value = state.pull(2, VARIANT)?;
    let (format, options) = match pull_format_opt(state, 3)? {
        Some((format, options)) => (Some(format.name), options),
        None => (None, Options::new()),
    };
    state
        .host()
        .write_file(Path::new(&path), &value, format, &options)?;
    Ok(LuaMultiValue::new())
}

#[cfg(test)]
mod tests {
    use crate::testing::world;
    use rtypes::Value;

    #[test]
    fn test_write_then_read_guesses_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let world = world();
        let src = r#"
            local path = ...
            fs.write(path, {name = "part", size = 3})
            local value = fs.read(path)
            return value.name, value.size
        "#;
        let results = world
            .do_string(src, "fs", vec![Value::String(path.display().to_string())])
            .unwrap();
        assert_eq!(results, vec![Value::from("part"), Value::Double(3.0)]);
        assert!(std::fs::read_to_string(&path).unwrap().contains("\"name\": \"part\""));
    }

    #[test]
    fn test_explicit_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.data");
        let world = world();
        let src = r#"
            local path = ...
            fs.write(path, "hello", "txt")
            return fs.read(path, "txt")
        "#;
        let results = world
            .do_string(src, "fs", vec![Value::String(path.display().to_string())])
            .unwrap();
        assert_eq!(results, vec![Value::from("hello")]);

        let err = world
            .do_string("return fs.read(...)", "fs", vec![Value::String(path.display().to_string())])
            .unwrap_err();
        assert!(err.to_string().contains("unknown format"));
    }

    #[test]
    fn test_missing_file() {
        let world = world();
        let err = world
            .do_string("return fs.read('/nonexistent/rbxhost/x.json')", "fs", Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("open /nonexistent/rbxhost/x.json"));
    }
}
