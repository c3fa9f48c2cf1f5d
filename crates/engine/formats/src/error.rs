//! Error types for formats

use thiserror::Error;

/// Result type for format operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while encoding or decoding
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Text formats only carry UTF-8
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Base64 error
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The format has no encoder
    #[error("cannot encode with format {0}")]
    CannotEncode(String),

    /// The format has no decoder
    #[error("cannot decode with format {0}")]
    CannotDecode(String),

    /// The encoder does not accept this kind of value
    #[error("format {format} cannot encode {actual}")]
    WrongKind { format: String, actual: String },

    /// Containers referring to themselves cannot be serialized
    #[error("{0} cannot be cyclic")]
    Cyclic(&'static str),
}

impl Error {
    pub(crate) fn wrong_kind(format: &str, value: &rtypes::Value) -> Self {
        Error::WrongKind {
            format: format.to_string(),
            actual: value.type_name().to_string(),
        }
    }
}
