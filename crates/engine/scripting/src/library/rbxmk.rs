//! Format codecs, descriptor management and chunk loading for scripts

use super::{pull_format, ret_result, Library};
use crate::reflectors::pull_string;
use crate::state::{bind, State, VARIANT};
use crate::Error;
use mlua::prelude::*;
use rtypes::{type_names as t, RootDesc, Value};
use std::sync::Arc;

pub(super) fn library() -> Library {
    Library {
        name: "rbxmk",
        import_as: Some("rbxmk"),
        open,
    }
}

fn open(lua: &Lua) -> LuaResult<LuaTable> {
    let lib = lua.create_table()?;
    lib.set("encodeFormat", bind(lua, encode_format)?)?;
    lib.set("decodeFormat", bind(lua, decode_format)?)?;
    lib.set("formatCanDecode", bind(lua, format_can_decode)?)?;
    lib.set("getGlobalDesc", bind(lua, get_global_desc)?)?;
    lib.set("setGlobalDesc", bind(lua, set_global_desc)?)?;
    lib.set("patchDesc", bind(lua, patch_desc)?)?;
    lib.set("diffDesc", bind(lua, diff_desc)?)?;
    lib.set("loadFile", bind(lua, load_file)?)?;
    lib.set("loadString", bind(lua, load_string)?)?;
    Ok(lib)
}

/// `encodeFormat(format, value) -> BinaryString`
fn encode_format(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let (format, options) = pull_format(state, 1)?;
    let value = state.pull(2, VARIANT)?;
    let bytes = format.encode_bytes(&options, &value).map_err(Error::from)?;
    state.ret(Value::BinaryString(bytes))
}

/// `decodeFormat(format, bytes) -> value`
fn decode_format(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let (format, options) = pull_format(state, 1)?;
    let Value::BinaryString(bytes) = state.pull(2, t::BINARY_STRING)? else {
        unreachable!("BinaryString reflector pulled another type")
    };
    let result = format.decode_bytes(&options, &bytes).map_err(Error::from);
    ret_result(state, result)
}

/// `formatCanDecode(format, type) -> bool`
fn format_can_decode(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let name = pull_string(state, 1)?;
    let type_name = pull_string(state, 2)?;
    let format = state.host().must_format(&name)?;
    state.ret(Value::Bool(format.can_decode(&type_name)))
}

fn get_global_desc(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let desc = state.host().global_desc();
    state.ret(desc.map_or(Value::Nil, Value::RootDesc))
}

/// `setGlobalDesc(desc|nil)`
fn set_global_desc(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let desc = opt_desc(state, 1)?;
    state.host().set_global_desc(desc);
    Ok(LuaMultiValue::new())
}

fn opt_desc(state: &mut State<'_>, position: usize) -> LuaResult<Option<Arc<RootDesc>>> {
    Ok(match state.pull_opt(position, t::ROOT_DESC, Value::Nil)? {
        Value::RootDesc(desc) => Some(desc),
        _ => None,
    })
}

/// `patchDesc(desc, actions) -> RootDesc`; the input descriptor is untouched
fn patch_desc(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let Value::RootDesc(desc) = state.pull(1, t::ROOT_DESC)? else {
        unreachable!("RootDesc reflector pulled another type")
    };
    let Value::DescActions(actions) = state.pull(2, t::DESC_ACTIONS)? else {
        unreachable!("DescActions reflector pulled another type")
    };
    let patched = desc.patch(&actions).map_err(Error::from)?;
    state.ret(Value::RootDesc(Arc::new(patched)))
}

/// `diffDesc(prev|nil, next|nil) -> DescActions`; nil is an empty descriptor
fn diff_desc(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let prev = opt_desc(state, 1)?.unwrap_or_default();
    let next = opt_desc(state, 2)?.unwrap_or_default();
    let actions = RootDesc::diff(&prev, &next);
    tracing::trace!(actions = actions.len(), "diffed descriptors");
    state.ret(Value::DescActions(Arc::new(actions)))
}

/// `loadFile(path) -> function`
fn load_file(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let path = pull_string(state, 1)?;
    let source = std::fs::read(&path).map_err(|source| Error::File {
        action: "read",
        path: path.clone(),
        source,
    })?;
    let function = state
        .lua
        .load(source.as_slice())
        .set_name(format!("@{path}"))
        .into_function()?;
    Ok(LuaMultiValue::from_vec(vec![LuaValue::Function(function)]))
}

/// `loadString(source) -> function`
fn load_string(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let source = pull_string(state, 1)?;
    let function = state
        .lua
        .load(source.as_str())
        .set_name("=loadString")
        .into_function()?;
    Ok(LuaMultiValue::from_vec(vec![LuaValue::Function(function)]))
}

#[cfg(test)]
mod tests {
    use crate::testing::{eval, eval_err, world};
    use rtypes::Value;

    #[test]
    fn test_encode_decode_json() {
        let src = r#"
            local bytes = rbxmk.encodeFormat("json", {a = 1, b = {true, "x"}})
            local value = rbxmk.decodeFormat("json", bytes)
            return typeof(bytes), value.a, value.b[2]
        "#;
        let world = world();
        let results = world.do_string(src, "json", Vec::new()).unwrap();
        assert_eq!(
            results,
            vec![Value::from("string"), Value::Double(1.0), Value::from("x")]
        );
    }

    #[test]
    fn test_decode_bin_keeps_bytes() {
        let src = r#"
            local value = rbxmk.decodeFormat("bin", "\xff\x00\x80")
            return value, rbxmk.encodeFormat("bin", value) == "\xff\x00\x80"
        "#;
        let results = world().do_string(src, "bin", Vec::new()).unwrap();
        assert_eq!(
            results,
            vec![Value::BinaryString(vec![0xff, 0x00, 0x80]), Value::Bool(true)]
        );
        assert!(eval_err(r#"rbxmk.decodeFormat("txt", "ÿ")"#).contains("invalid UTF-8"));
    }

    #[test]
    fn test_selector_options() {
        let src = r#"
            local bytes = rbxmk.encodeFormat({Format = "json", Indent = "\t"}, {1, 2})
            return rbxmk.decodeFormat("txt", bytes)
        "#;
        assert_eq!(eval(src), Value::from("[\n\t1,\n\t2\n]"));
    }

    #[test]
    fn test_format_errors() {
        assert_eq!(eval_err("rbxmk.encodeFormat('nope', 1)"), "unknown format \"nope\"");
        assert!(eval_err("rbxmk.encodeFormat(5, 1)").contains("string or table expected"));
        assert_eq!(
            eval_err("rbxmk.encodeFormat('txt', Vector3.new())"),
            "format txt cannot encode Vector3"
        );
    }

    #[test]
    fn test_format_can_decode() {
        assert_eq!(eval("return rbxmk.formatCanDecode('txt', 'string')"), Value::Bool(true));
        assert_eq!(eval("return rbxmk.formatCanDecode('txt', 'Instance')"), Value::Bool(false));
    }

    #[test]
    fn test_global_desc() {
        let src = r#"
            assert(rbxmk.getGlobalDesc() == nil)
            rbxmk.setGlobalDesc(RootDesc.new())
            local set = typeof(rbxmk.getGlobalDesc())
            rbxmk.setGlobalDesc(nil)
            return set, rbxmk.getGlobalDesc()
        "#;
        let results = world().do_string(src, "desc", Vec::new()).unwrap();
        assert_eq!(results, vec![Value::from("RootDesc"), Value::Nil]);
    }

    #[test]
    fn test_diff_then_patch() {
        let src = r#"
            local next = rbxmk.decodeFormat("desc.json", [[{
                "Classes": [{"Name": "Part", "Superclass": "Instance", "MemoryCategory": "", "Members": [], "Tags": []}],
                "Enums": []
            }]])
            local actions = rbxmk.diffDesc(nil, next)
            local patched = rbxmk.patchDesc(RootDesc.new(), actions)
            return #actions, patched:Class("Part").Superclass
        "#;
        let results = world().do_string(src, "patch", Vec::new()).unwrap();
        assert_eq!(results, vec![Value::Int64(1), Value::from("Instance")]);
    }

    #[test]
    fn test_load_string() {
        assert_eq!(
            eval("local f = rbxmk.loadString('return 1 + ...'); return f(2)"),
            Value::Int64(3)
        );
        assert!(eval_err("rbxmk.loadString('return +')").contains("syntax error"));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk.lua");
        std::fs::write(&path, "return 'loaded'").unwrap();
        let world = world();
        let results = world
            .do_string(
                "local path = ...; return rbxmk.loadFile(path)()",
                "load",
                vec![Value::String(path.display().to_string())],
            )
            .unwrap();
        assert_eq!(results, vec![Value::from("loaded")]);
    }
}
