//! The scripting world: one Lua state plus the host it talks to
//!
//! [`Host`] owns the registries and the global descriptor. It is shared with
//! every Lua callback through the Lua state's app data, so reflectors and
//! libraries reach it from a [`State`] without globals.

use crate::config::HostConfig;
use crate::library;
use crate::reflector::{Reflector, ReflectorRegistry};
use crate::state::State;
use crate::{reflectors, Error, Result};
use formats::{Format, FormatRegistry, Options};
use mlua::prelude::*;
use rtypes::{RootDesc, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

/// Registries and shared host state
pub struct Host {
    reflectors: RefCell<ReflectorRegistry>,
    formats: RefCell<FormatRegistry>,
    global_desc: RefCell<Option<Arc<RootDesc>>>,
    format_defaults: RefCell<BTreeMap<String, Options>>,
}

impl Host {
    fn new() -> Self {
        let mut reflectors = ReflectorRegistry::new();
        reflectors::register_all(&mut reflectors);
        let mut formats = FormatRegistry::new();
        formats::register_all(&mut formats);
        Self {
            reflectors: RefCell::new(reflectors),
            formats: RefCell::new(formats),
            global_desc: RefCell::new(None),
            format_defaults: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn reflector(&self, name: &str) -> Option<Rc<Reflector>> {
        self.reflectors.borrow().lookup(name)
    }

    /// Like [`reflector`](Self::reflector), but a missing type is an error
    pub fn must_reflector(&self, name: &str) -> Result<Rc<Reflector>> {
        self.reflectors.borrow().must_lookup(name)
    }

    /// Every reflector in name order
    pub fn reflectors(&self) -> Vec<Rc<Reflector>> {
        self.reflectors.borrow().iter().cloned().collect()
    }

    pub fn format(&self, name: &str) -> Option<Format> {
        self.formats.borrow().lookup(name).copied()
    }

    pub fn must_format(&self, name: &str) -> Result<Format> {
        self.format(name)
            .ok_or_else(|| Error::UnknownFormat(name.to_string()))
    }

    /// The format matching the longest extension of `path`
    pub fn guess_format(&self, path: &str) -> Option<Format> {
        self.formats.borrow().guess(path).copied()
    }

    /// Every format in name order
    pub fn formats(&self) -> Vec<Format> {
        self.formats.borrow().iter().copied().collect()
    }

    /// Configured default options for a format
    pub fn format_options(&self, name: &str) -> Options {
        self.format_defaults
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// `options` with the configured defaults for `format` filled in
    pub fn merged_options(&self, format: &str, options: &Options) -> Options {
        options.or_defaults(&self.format_options(format))
    }

    pub fn global_desc(&self) -> Option<Arc<RootDesc>> {
        self.global_desc.borrow().clone()
    }

    pub fn set_global_desc(&self, desc: Option<Arc<RootDesc>>) {
        tracing::debug!(present = desc.is_some(), "set global descriptor");
        *self.global_desc.borrow_mut() = desc;
    }

    fn resolve_format(&self, path: &Path, format: Option<&str>) -> Result<Format> {
        match format {
            Some(name) => self.must_format(name),
            None => {
                let name = path.to_string_lossy();
                self.guess_format(&name)
                    .ok_or_else(|| Error::UnknownFormat(format!("for {name}")))
            }
        }
    }

    /// Decode a file, guessing the format from the extension when not given
    pub fn read_file(&self, path: &Path, format: Option<&str>, options: &Options) -> Result<Value> {
        let format = self.resolve_format(path, format)?;
        let mut file = File::open(path).map_err(|source| Error::File {
            action: "open",
            path: path.display().to_string(),
            source,
        })?;
        let options = self.merged_options(format.name, options);
        tracing::debug!(path = %path.display(), format = format.name, "read file");
        Ok(format.decode_from(&options, &mut file)?)
    }

    /// Encode a value into a file, guessing the format when not given
    ///
    /// The value is fully encoded before the file is created.
    pub fn write_file(
        &self,
        path: &Path,
        value: &Value,
        format: Option<&str>,
        options: &Options,
    ) -> Result<()> {
        let format = self.resolve_format(path, format)?;
        let options = self.merged_options(format.name, options);
        let bytes = format.encode_bytes(&options, value)?;
        std::fs::write(path, bytes).map_err(|source| Error::File {
            action: "write",
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), format = format.name, "wrote file");
        Ok(())
    }
}

/// A library installed into the globals
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedLibrary {
    pub name: &'static str,
    /// Global table holding the library, or `None` for top-level globals
    pub import_as: Option<&'static str>,
    /// Global names the library defined, sorted
    pub globals: Vec<String>,
}

/// A Lua state wired to a host
pub struct World {
    lua: Lua,
    host: Rc<Host>,
    opened: RefCell<Vec<OpenedLibrary>>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// A world with every built-in type and format registered and no
    /// libraries opened
    pub fn new() -> Self {
        let lua = Lua::new();
        let host = Rc::new(Host::new());
        lua.set_app_data(Rc::clone(&host));
        Self {
            lua,
            host,
            opened: RefCell::new(Vec::new()),
        }
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    pub fn host(&self) -> &Rc<Host> {
        &self.host
    }

    fn state(&self) -> State<'_> {
        State::with_host(&self.lua, Rc::clone(&self.host), Vec::new())
    }

    /// Register an additional type
    ///
    /// # Panics
    ///
    /// Panics on a duplicate or incomplete reflector, as
    /// [`ReflectorRegistry::register`] does.
    pub fn register_type(&self, reflector: Reflector) {
        self.host.reflectors.borrow_mut().register(reflector);
    }

    /// Register an additional format
    ///
    /// # Panics
    ///
    /// Panics if the name is taken.
    pub fn register_format(&self, format: Format) {
        self.host.formats.borrow_mut().register(format);
    }

    pub fn format(&self, name: &str) -> Option<Format> {
        self.host.format(name)
    }

    pub fn reflector(&self, name: &str) -> Option<Rc<Reflector>> {
        self.host.reflector(name)
    }

    /// Open a library by name
    ///
    /// Opening a library again replaces its globals.
    pub fn open(&self, name: &str) -> Result<()> {
        let lib = library::find(name).ok_or_else(|| Error::UnknownLibrary(name.to_string()))?;
        let table = (lib.open)(&self.lua)?;
        let globals = self.lua.globals();

        let mut names = Vec::new();
        match lib.import_as {
            Some(global) => {
                globals.set(global, table)?;
                names.push(global.to_string());
            }
            None => {
                for pair in table.pairs::<String, LuaValue>() {
                    let (key, value) = pair?;
                    globals.set(key.as_str(), value)?;
                    names.push(key);
                }
            }
        }
        names.sort();
        tracing::debug!(library = lib.name, globals = names.len(), "opened library");

        let mut opened = self.opened.borrow_mut();
        opened.retain(|o| o.name != lib.name);
        opened.push(OpenedLibrary {
            name: lib.name,
            import_as: lib.import_as,
            globals: names,
        });
        Ok(())
    }

    /// Open every built-in library
    pub fn open_all(&self) -> Result<()> {
        for lib in library::all() {
            self.open(lib.name)?;
        }
        Ok(())
    }

    /// Libraries opened so far, in opening order
    pub fn opened_libraries(&self) -> Vec<OpenedLibrary> {
        self.opened.borrow().clone()
    }

    /// Run a script file; arguments are passed as `...`
    pub fn do_file(&self, path: &Path, args: Vec<Value>) -> Result<Vec<Value>> {
        let source = std::fs::read(path).map_err(|source| Error::File {
            action: "read",
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "run file");
        self.run(&source, &format!("@{}", path.display()), args)
    }

    /// Run a chunk of source text
    pub fn do_string(&self, source: &str, name: &str, args: Vec<Value>) -> Result<Vec<Value>> {
        self.run(source.as_bytes(), &format!("={name}"), args)
    }

    fn run(&self, source: &[u8], chunk_name: &str, args: Vec<Value>) -> Result<Vec<Value>> {
        let function = self.lua.load(source).set_name(chunk_name).into_function()?;
        let mut state = self.state();
        let mut lua_args = Vec::new();
        for arg in args {
            lua_args.extend(state.push(arg)?);
        }
        let results: LuaMultiValue = function.call(LuaMultiValue::from_vec(lua_args))?;
        let values = results
            .iter()
            .map(|v| state.pull_variant(v))
            .collect::<LuaResult<Vec<_>>>()?;
        Ok(values)
    }

    pub fn global_desc(&self) -> Option<Arc<RootDesc>> {
        self.host.global_desc()
    }

    pub fn set_global_desc(&self, desc: Option<Arc<RootDesc>>) {
        self.host.set_global_desc(desc);
    }

    /// Push a value into one Lua value; multi-value types keep the first
    pub fn push(&self, value: Value) -> LuaResult<LuaValue> {
        let values = self.state().push(value)?;
        Ok(values.into_iter().next().unwrap_or(LuaValue::Nil))
    }

    /// Pull a Lua value as `type_name`
    pub fn pull(&self, value: &LuaValue, type_name: &str) -> LuaResult<Value> {
        self.state().pull_value(type_name, std::slice::from_ref(value))
    }

    /// Set a global variable
    pub fn set_global(&self, name: &str, value: Value) -> Result<()> {
        let value = self.push(value)?;
        self.lua.globals().set(name, value)?;
        Ok(())
    }

    /// Decode bytes into a value of `type_name`
    ///
    /// The format is asked whether it produces that type before decoding.
    pub fn decode(
        &self,
        format: &str,
        type_name: &str,
        options: &Options,
        bytes: &[u8],
    ) -> Result<Value> {
        let format = self.host.must_format(format)?;
        if !format.can_decode(type_name) {
            return Err(Error::CannotDecodeAs {
                format: format.name.to_string(),
                type_name: type_name.to_string(),
            });
        }
        let options = self.host.merged_options(format.name, options);
        Ok(format.decode_bytes(&options, bytes)?)
    }

    /// Encode a value with a format
    pub fn encode(&self, format: &str, options: &Options, value: &Value) -> Result<Vec<u8>> {
        let format = self.host.must_format(format)?;
        let options = self.host.merged_options(format.name, options);
        Ok(format.encode_bytes(&options, value)?)
    }

    /// Apply a host configuration
    ///
    /// Format defaults are installed first so the descriptor is decoded with
    /// them. Libraries are opened last; an absent list opens all of them.
    pub fn apply_config(&self, config: &HostConfig) -> Result<()> {
        for (name, options) in &config.formats {
            self.host.must_format(name)?;
            self.host
                .format_defaults
                .borrow_mut()
                .insert(name.clone(), options.clone());
        }

        if let Some(path) = &config.desc {
            let value = self.host.read_file(path, None, &Options::new())?;
            match value {
                Value::RootDesc(desc) => self.set_global_desc(Some(desc)),
                other => return Err(Error::type_error(rtypes::type_names::ROOT_DESC, other.type_name())),
            }
        }

        match &config.libraries {
            Some(names) => {
                for name in names {
                    self.open(name)?;
                }
            }
            None => self.open_all()?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_world_has_builtins() {
        let world = World::new();
        assert!(world.reflector("Vector3").is_some());
        assert!(world.format("json").is_some());
        assert!(world.opened_libraries().is_empty());
    }

    #[test]
    fn test_open_records_globals() {
        let world = World::new();
        world.open("sym").unwrap();
        world.open("sym").unwrap();
        let opened = world.opened_libraries();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].globals, vec!["sym".to_string()]);

        let err = world.open("http").unwrap_err();
        assert_eq!(err.to_string(), "unknown library \"http\"");
    }

    #[test]
    fn test_do_string_passes_arguments() {
        let world = World::new();
        let results = world
            .do_string("local a, b = ...; return b, a", "args", vec![Value::Int(1), Value::from("x")])
            .unwrap();
        assert_eq!(results, vec![Value::from("x"), Value::Int64(1)]);
    }

    #[test]
    fn test_decode_checks_capability() {
        let world = World::new();
        let err = world
            .decode("txt", "Instance", &Options::new(), b"hello")
            .unwrap_err();
        assert_eq!(err.to_string(), "format txt cannot decode Instance");
        let value = world.decode("txt", "string", &Options::new(), b"hello").unwrap();
        assert_eq!(value, Value::from("hello"));
    }

    fn encode_only(_: &Options, _: &Value, w: &mut dyn std::io::Write) -> formats::Result<()> {
        w.write_all(b"ok")?;
        Ok(())
    }

    #[test]
    fn test_encode_only_format() {
        let world = World::new();
        world.register_format(Format {
            encode: Some(encode_only),
            ..Format::named("sink")
        });
        assert_eq!(world.encode("sink", &Options::new(), &Value::Nil).unwrap(), b"ok");
        let err = world.decode("sink", "Variant", &Options::new(), b"").unwrap_err();
        assert_eq!(err.to_string(), "format sink cannot decode Variant");
    }

    #[test]
    #[should_panic(expected = "registered more than once")]
    fn test_duplicate_format_panics() {
        World::new().register_format(Format::named("json"));
    }

    fn failing_eq(_: &mut State<'_>) -> LuaResult<LuaValue> {
        Err(LuaError::RuntimeError("udim comparison failed".into()))
    }

    #[test]
    fn test_eq_operator_errors_reach_the_script() {
        let world = World::new();
        let mut registry = ReflectorRegistry::new();
        for reflector in world.host().reflectors() {
            let mut reflector = (*reflector).clone();
            if reflector.name == "UDim" {
                reflector.operators.eq = Some(failing_eq);
            }
            registry.register(reflector);
        }
        *world.host.reflectors.borrow_mut() = registry;

        let udim = Value::UDim(rtypes::UDim::new(0.5, 2));
        world.set_global("a", udim.clone()).unwrap();
        world.set_global("b", udim).unwrap();
        let err = world.do_string("return a == b", "eq", Vec::new()).unwrap_err();
        assert!(err.to_string().contains("udim comparison failed"), "{err}");

        world.set_global("c", Value::Vector3(glam::Vec3::ONE)).unwrap();
        world.set_global("d", Value::Vector3(glam::Vec3::ONE)).unwrap();
        let results = world.do_string("return c == d", "eq", Vec::new()).unwrap();
        assert_eq!(results, vec![Value::Bool(true)]);
    }
}
