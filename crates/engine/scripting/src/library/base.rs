//! `typeof` and the global constructor tables

use super::Library;
use crate::reflectors::data_model_new;
use crate::state::{bind, State};
use mlua::prelude::*;
use rtypes::Value;

pub(super) fn library() -> Library {
    Library {
        name: "base",
        import_as: None,
        open,
    }
}

fn open(lua: &Lua) -> LuaResult<LuaTable> {
    let state = State::new(lua, Vec::new())?;
    let lib = lua.create_table()?;
    lib.set("typeof", bind(lua, type_of)?)?;

    for reflector in state.host().reflectors() {
        if reflector.constructors.is_empty() {
            continue;
        }
        let ctors = lua.create_table_with_capacity(0, reflector.constructors.len())?;
        for (&name, &ctor) in &reflector.constructors {
            ctors.set(name, bind(lua, ctor)?)?;
        }
        lib.set(reflector.name, ctors)?;
    }

    let data_model = lua.create_table()?;
    data_model.set("new", bind(lua, data_model_new)?)?;
    lib.set("DataModel", data_model)?;

    Ok(lib)
}

fn type_of(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let name = State::type_of(&state.get(1));
    state.ret(Value::String(name))
}

#[cfg(test)]
mod tests {
    use crate::testing::eval;
    use rtypes::Value;

    #[test]
    fn test_typeof() {
        assert_eq!(eval("return typeof(Vector3.new())"), Value::from("Vector3"));
        assert_eq!(eval("return typeof(1.5)"), Value::from("number"));
        assert_eq!(eval("return typeof(sym.Desc)"), Value::from("Symbol"));
        assert_eq!(eval("return typeof({})"), Value::from("table"));
    }

    #[test]
    fn test_constructor_tables() {
        assert_eq!(eval("return typeof(DataModel.new())"), Value::from("Instance"));
        assert_eq!(eval("return DataModel.new().ClassName"), Value::from("DataModel"));
        assert_eq!(eval("return type(UDim2.fromScale)"), Value::from("function"));
    }
}
