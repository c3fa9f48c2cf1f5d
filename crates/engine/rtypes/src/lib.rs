//! Domain values for the rbxhost scripting host
//!
//! This crate provides:
//! - **Value**: the tagged set of values exchanged with scripts and formats
//! - **Instance**: a mutable tree node with properties and a weak parent link
//! - **RootDesc**: an immutable class/enum/member schema, with patch and diff support
//!
//! Nothing here knows about the scripting engine. Formats and the scripting
//! host both build on these types.
//!
//! # Example
//!
//! ```rust
//! use rtypes::{Instance, Value};
//!
//! let model = Instance::new("Model");
//! let part = Instance::new("Part");
//! part.set_parent(Some(&model)).unwrap();
//! part.set("Anchored", Value::Bool(true));
//!
//! assert_eq!(model.children().len(), 1);
//! assert_eq!(part.full_name(), "Model.Part");
//! ```

mod container;
mod desc;
mod error;
mod geometry;
mod instance;
mod patch;
mod value;

pub use container::{Array, Dictionary};
pub use desc::{
    CallbackDesc, ClassDesc, EnumDesc, EnumItem, EnumItemDesc, EventDesc, FunctionDesc,
    MemberDesc, ParameterDesc, PropertyDesc, PropertySecurity, RootDesc, Serialization, TypeDesc,
};
pub use error::{Error, Result};
pub use geometry::{CFrame, Color3, NumberRange, UDim, UDim2};
pub use instance::Instance;
pub use patch::{ActionKind, DescAction, Element};
pub use value::{type_names, Value};

// Re-export glam so downstream crates agree on the vector types
pub use glam;
