use super::Library;
use crate::object::Symbol;
use crate::reconcile::SYMBOLS;
use mlua::prelude::*;

pub(super) fn library() -> Library {
    Library {
        name: "sym",
        import_as: Some("sym"),
        open,
    }
}

fn open(lua: &Lua) -> LuaResult<LuaTable> {
    let lib = lua.create_table_with_capacity(0, SYMBOLS.len())?;
    for &name in SYMBOLS {
        lib.set(name, lua.create_userdata(Symbol(name))?)?;
    }
    Ok(lib)
}
