//! Raw text, raw bytes and base64

use crate::{Error, Format, OptionSpec, Options, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rtypes::{type_names as t, Value};
use std::io::{Read, Write};

/// Line width used when `Width` is absent or zero
const DEFAULT_WIDTH: usize = 76;

pub fn txt() -> Format {
    Format {
        media_types: &["text/plain"],
        encode_types: t::STRINGLIKE,
        can_decode: |name| name == t::STRING,
        decode: Some(decode_txt),
        encode: Some(encode_txt),
        ..Format::named("txt")
    }
}

pub fn bin() -> Format {
    Format {
        media_types: &["application/octet-stream"],
        encode_types: t::STRINGLIKE,
        can_decode: |name| name == t::BINARY_STRING,
        decode: Some(decode_bin),
        encode: Some(encode_bin),
        ..Format::named("bin")
    }
}

pub fn base64() -> Format {
    Format {
        media_types: &["text/plain"],
        options: &[OptionSpec {
            name: "Width",
            types: &[t::INT],
        }],
        encode_types: t::STRINGLIKE,
        can_decode: |name| name == t::BINARY_STRING,
        decode: Some(decode_base64),
        encode: Some(encode_base64),
        ..Format::named("base64")
    }
}

fn read_all(r: &mut dyn Read) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    r.read_to_end(&mut buf)?;
    Ok(buf)
}

fn write_stringlike(format: &str, v: &Value, w: &mut dyn Write) -> Result<()> {
    let bytes = v.as_stringlike().ok_or_else(|| Error::wrong_kind(format, v))?;
    w.write_all(bytes)?;
    Ok(())
}

fn decode_txt(_: &Options, r: &mut dyn Read) -> Result<Value> {
    let text = String::from_utf8(read_all(r)?).map_err(|e| e.utf8_error())?;
    Ok(Value::String(text))
}

fn encode_txt(_: &Options, v: &Value, w: &mut dyn Write) -> Result<()> {
    write_stringlike("txt", v, w)
}

fn decode_bin(_: &Options, r: &mut dyn Read) -> Result<Value> {
    Ok(Value::BinaryString(read_all(r)?))
}

fn encode_bin(_: &Options, v: &Value, w: &mut dyn Write) -> Result<()> {
    write_stringlike("bin", v, w)
}

fn decode_base64(_: &Options, r: &mut dyn Read) -> Result<Value> {
    let mut text = read_all(r)?;
    text.retain(|b| !b.is_ascii_whitespace());
    Ok(Value::BinaryString(STANDARD.decode(text)?))
}

fn encode_base64(options: &Options, v: &Value, w: &mut dyn Write) -> Result<()> {
    let bytes = v.as_stringlike().ok_or_else(|| Error::wrong_kind("base64", v))?;
    let width = match options.int("Width") {
        Some(n) if n > 0 => n as usize,
        _ => DEFAULT_WIDTH,
    };
    let encoded = STANDARD.encode(bytes);
    for (i, line) in encoded.as_bytes().chunks(width).enumerate() {
        if i > 0 {
            w.write_all(b"\n")?;
        }
        w.write_all(line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txt_decodes_string() {
        let value = txt().decode_bytes(&Options::new(), b"hello").unwrap();
        assert_eq!(value, Value::from("hello"));
        assert!(txt().can_decode("string"));
        assert!(!txt().can_decode("BinaryString"));
    }

    #[test]
    fn test_txt_rejects_invalid_utf8() {
        let err = txt().decode_bytes(&Options::new(), b"\xff\x00").unwrap_err();
        assert!(matches!(err, Error::Utf8(_)));
    }

    #[test]
    fn test_bin_keeps_raw_bytes() {
        let raw = [0xff, 0x00, 0x80];
        let value = bin().decode_bytes(&Options::new(), &raw).unwrap();
        assert_eq!(value, Value::BinaryString(raw.to_vec()));
        assert_eq!(bin().encode_bytes(&Options::new(), &value).unwrap(), raw);
    }

    #[test]
    fn test_raw_encoders_accept_any_stringlike() {
        let value = Value::ProtectedString("secret".into());
        assert_eq!(bin().encode_bytes(&Options::new(), &value).unwrap(), b"secret");
        let err = txt().encode_bytes(&Options::new(), &Value::Int(3)).unwrap_err();
        assert_eq!(err.to_string(), "format txt cannot encode int");
    }

    #[test]
    fn test_base64_width() {
        let value = Value::BinaryString(vec![0u8; 60]);
        let default = base64().encode_bytes(&Options::new(), &value).unwrap();
        let lines: Vec<&[u8]> = default.split(|b| *b == b'\n').collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 76);

        let zero = base64()
            .encode_bytes(&Options::new().with("Width", 0), &value)
            .unwrap();
        assert_eq!(zero, default);

        let narrow = base64()
            .encode_bytes(&Options::new().with("Width", 10), &value)
            .unwrap();
        assert_eq!(narrow.split(|b| *b == b'\n').count(), 8);

        let decoded = base64().decode_bytes(&Options::new(), &narrow).unwrap();
        assert_eq!(decoded, value);
    }
}
