//! Error types for the value model

use thiserror::Error;

/// Result type for value model operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the instance tree, descriptors and value conversions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Parenting would make an instance its own ancestor
    #[error("attempt to set {child} as its own ancestor via {parent}")]
    CyclicParent { child: String, parent: String },

    /// A DataModel cannot have a parent
    #[error("cannot set parent of DataModel")]
    DataModelParent,

    /// The instance was destroyed and its parent can no longer change
    #[error("the Parent property of {0} is locked")]
    ParentLocked(String),

    /// Type conversion error
    #[error("{expected} expected, got {actual}")]
    TypeError { expected: String, actual: String },

    /// Invalid value
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Descriptor patch could not be applied
    #[error("cannot {action} {element} {name}: {reason}")]
    Patch {
        action: String,
        element: String,
        name: String,
        reason: String,
    },
}
