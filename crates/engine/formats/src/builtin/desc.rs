//! API dumps and descriptor patches

use crate::{Error, Format, Options, Result};
use rtypes::{type_names as t, DescAction, RootDesc, Value};
use std::io::{Read, Write};
use std::sync::Arc;

pub fn desc_json() -> Format {
    Format {
        media_types: &["application/json"],
        encode_types: &[t::ROOT_DESC],
        can_decode: |name| name == t::ROOT_DESC,
        decode: Some(decode_desc),
        encode: Some(encode_desc),
        ..Format::named("desc.json")
    }
}

pub fn desc_patch_json() -> Format {
    Format {
        media_types: &["application/json"],
        encode_types: &[t::DESC_ACTIONS],
        can_decode: |name| name == t::DESC_ACTIONS,
        decode: Some(decode_patch),
        encode: Some(encode_patch),
        ..Format::named("desc-patch.json")
    }
}

fn decode_desc(_: &Options, r: &mut dyn Read) -> Result<Value> {
    let desc: RootDesc = serde_json::from_reader(r)?;
    tracing::debug!(classes = desc.classes.len(), enums = desc.enums.len(), "decoded descriptor");
    Ok(Value::RootDesc(Arc::new(desc)))
}

fn encode_desc(_: &Options, v: &Value, w: &mut dyn Write) -> Result<()> {
    match v {
        Value::RootDesc(desc) => Ok(serde_json::to_writer_pretty(w, desc.as_ref())?),
        other => Err(Error::wrong_kind("desc.json", other)),
    }
}

fn decode_patch(_: &Options, r: &mut dyn Read) -> Result<Value> {
    let actions: Vec<DescAction> = serde_json::from_reader(r)?;
    Ok(Value::DescActions(Arc::new(actions)))
}

fn encode_patch(_: &Options, v: &Value, w: &mut dyn Write) -> Result<()> {
    match v {
        Value::DescActions(actions) => Ok(serde_json::to_writer_pretty(w, actions.as_ref())?),
        other => Err(Error::wrong_kind("desc-patch.json", other)),
    }
}
