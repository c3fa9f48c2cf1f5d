//! Format definition and options

use crate::{Error, Result};
use rtypes::Value;
use std::collections::BTreeMap;
use std::io::{Read, Write};

pub type DecodeFn = fn(&Options, &mut dyn Read) -> Result<Value>;
pub type EncodeFn = fn(&Options, &Value, &mut dyn Write) -> Result<()>;

/// A declared option: its name and the value types it accepts
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub name: &'static str,
    pub types: &'static [&'static str],
}

/// A named codec
///
/// Either function may be absent. Callers go through [`Format::decode_from`]
/// and [`Format::encode_to`], which report a missing function as an error.
/// `decode` does not consult `can_decode`; checking the target type first is
/// the caller's job.
#[derive(Debug, Clone, Copy)]
pub struct Format {
    /// Unique key, usually a file extension without the leading dot
    pub name: &'static str,
    pub media_types: &'static [&'static str],
    pub options: &'static [OptionSpec],
    /// Value types the encoder accepts; informational
    pub encode_types: &'static [&'static str],
    pub can_decode: fn(&str) -> bool,
    pub decode: Option<DecodeFn>,
    pub encode: Option<EncodeFn>,
}

fn never(_: &str) -> bool {
    false
}

impl Format {
    /// A format with no capabilities; fill in the fields that apply
    pub const fn named(name: &'static str) -> Self {
        Self {
            name,
            media_types: &[],
            options: &[],
            encode_types: &[],
            can_decode: never,
            decode: None,
            encode: None,
        }
    }

    pub fn can_encode(&self) -> bool {
        self.encode.is_some()
    }

    /// Whether the decoder can produce a value of `type_name`
    pub fn can_decode(&self, type_name: &str) -> bool {
        self.decode.is_some() && (self.can_decode)(type_name)
    }

    pub fn decode_from(&self, options: &Options, reader: &mut dyn Read) -> Result<Value> {
        let decode = self
            .decode
            .ok_or_else(|| Error::CannotDecode(self.name.to_string()))?;
        tracing::trace!(format = self.name, "decode");
        decode(options, reader)
    }

    pub fn encode_to(&self, options: &Options, value: &Value, writer: &mut dyn Write) -> Result<()> {
        let encode = self
            .encode
            .ok_or_else(|| Error::CannotEncode(self.name.to_string()))?;
        tracing::trace!(format = self.name, kind = value.type_name(), "encode");
        encode(options, value, writer)
    }

    pub fn decode_bytes(&self, options: &Options, mut bytes: &[u8]) -> Result<Value> {
        self.decode_from(options, &mut bytes)
    }

    pub fn encode_bytes(&self, options: &Options, value: &Value) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_to(options, value, &mut out)?;
        Ok(out)
    }
}

/// Options passed to a codec
///
/// Codecs apply their own defaults for absent options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options(BTreeMap<String, Value>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option; builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// An integer option; numbers are truncated
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| v.as_i64().ok())
    }

    pub fn string(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| v.as_string().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// These options with `defaults` filling the gaps
    pub fn or_defaults(&self, defaults: &Options) -> Options {
        let mut merged = defaults.clone();
        merged.0.extend(self.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}
