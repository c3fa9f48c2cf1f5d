//! Libraries that can be opened into a world

mod base;
mod fs;
mod rbxmk;
mod sym;

use crate::state::State;
use crate::{Error, Result};
use formats::{Format, Options};
use mlua::prelude::*;
use rtypes::Value;

/// A named set of globals
#[derive(Clone, Copy)]
pub struct Library {
    pub name: &'static str,
    /// Global the library's table is stored under; `None` merges its
    /// entries into the globals
    pub import_as: Option<&'static str>,
    /// Build the library's table
    pub open: fn(&Lua) -> LuaResult<LuaTable>,
}

/// Every built-in library, in opening order
pub fn all() -> Vec<Library> {
    vec![base::library(), sym::library(), rbxmk::library(), fs::library()]
}

pub fn find(name: &str) -> Option<Library> {
    all().into_iter().find(|lib| lib.name == name)
}

/// A format selector argument: a format name, or a table holding the name
/// in `Format` and options in its other string keys
///
/// Options configured on the host fill in what the selector leaves out.
pub(crate) fn pull_format(state: &mut State<'_>, position: usize) -> LuaResult<(Format, Options)> {
    let (name, options) = match state.get(position) {
        LuaValue::String(s) => (String::from(s.to_string_lossy()), Options::new()),
        LuaValue::Table(table) => {
            let name = state
                .pull_field(&table, "Format", rtypes::type_names::STRING)?
                .as_string()
                .map_err(Error::from)?;
            let mut options = Options::new();
            for pair in table.pairs::<LuaValue, LuaValue>() {
                let (key, value) = pair?;
                let LuaValue::String(key) = key else { continue };
                let key: String = key.to_string_lossy().into();
                if key != "Format" {
                    options.insert(key, state.pull_variant(&value)?);
                }
            }
            (name, options)
        }
        other => {
            return Err(Error::Argument {
                position,
                message: format!("string or table expected, got {}", State::type_of(&other)),
            }
            .into())
        }
    };
    let format = state.host().must_format(&name)?;
    let options = state.host().merged_options(format.name, &options);
    Ok((format, options))
}

/// An optional format selector; `None` when the argument is nil
pub(crate) fn pull_format_opt(
    state: &mut State<'_>,
    position: usize,
) -> LuaResult<Option<(Format, Options)>> {
    if state.get(position).is_nil() {
        return Ok(None);
    }
    pull_format(state, position).map(Some)
}

/// Run a host operation and push its result
pub(crate) fn ret_result(state: &mut State<'_>, result: Result<Value>) -> LuaResult<LuaMultiValue> {
    let value = result?;
    state.ret(value)
}
