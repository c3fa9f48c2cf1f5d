//! Lua scripting host for rbxhost
//!
//! This crate provides:
//! - **Reflector**: per-type descriptions of how a value crosses into Lua
//! - **State**: the marshalling context of one call, with typed pulls and pushes
//! - **World**: a Lua state bound to reflector and format registries
//! - **Libraries**: `base`, `sym`, `rbxmk` and `fs`, opened into a world
//! - **HostConfig**: KDL configuration of descriptors, libraries and format options
//!
//! # Example
//!
//! ```rust,ignore
//! use scripting::{HostConfig, World};
//!
//! let world = World::new();
//! world.apply_config(&HostConfig::from_file("rbxhost.kdl")?)?;
//! world.do_file("scripts/build.lua".as_ref(), Vec::new())?;
//! ```

mod config;
pub mod dump;
mod error;
pub mod library;
mod object;
mod reconcile;
mod reflector;
pub mod reflectors;
mod state;
mod world;

pub use config::HostConfig;
pub use error::{host_error, Error, Result};
pub use object::{Object, Symbol};
pub use reconcile::{SYMBOLS, SYM_DESC, SYM_IS_SERVICE, SYM_RAW_DESC, SYM_REFERENCE};
pub use reflector::{
    BinaryOp, Constructor, ConvertFn, GetFn, Member, Operators, PullFn, PushFn, Reflector,
    ReflectorRegistry, SetFn, UnaryOp,
};
pub use state::{bind, type_error, State, VARIANT};
pub use world::{Host, OpenedLibrary, World};

// Re-export mlua for downstream crates
pub use mlua;

#[cfg(test)]
pub(crate) mod testing {
    use crate::World;
    use rtypes::Value;

    /// A world with every library opened
    pub fn world() -> World {
        let world = World::new();
        world.open_all().unwrap();
        world
    }

    /// First result of a chunk, or nil
    pub fn eval(src: &str) -> Value {
        world()
            .do_string(src, "test", Vec::new())
            .unwrap()
            .into_iter()
            .next()
            .unwrap_or(Value::Nil)
    }

    /// Message of the error raised by a chunk
    pub fn eval_err(src: &str) -> String {
        match world().do_string(src, "test", Vec::new()) {
            Ok(values) => panic!("expected an error, got {values:?}"),
            Err(crate::Error::Lua(e)) => crate::error::message(&e),
            Err(e) => e.to_string(),
        }
    }
}
