//! CSV as an array of rows

use crate::{Error, Format, Options, Result};
use rtypes::{type_names as t, Array, Value};
use std::io::{Read, Write};

pub fn csv() -> Format {
    Format {
        media_types: &["text/csv", "text/plain"],
        encode_types: &[t::ARRAY],
        can_decode: |name| name == t::ARRAY,
        decode: Some(decode),
        encode: Some(encode),
        ..Format::named("csv")
    }
}

fn decode(_: &Options, r: &mut dyn Read) -> Result<Value> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(r);
    let rows = Array::new();
    for record in reader.records() {
        let record = record?;
        let row = record.iter().map(|field| Value::String(field.to_string())).collect();
        rows.push(Value::Array(Array::from_vec(row)));
    }
    Ok(Value::Array(rows))
}

fn encode(_: &Options, v: &Value, w: &mut dyn Write) -> Result<()> {
    let rows = v.as_array().map_err(|_| Error::wrong_kind("csv", v))?;
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(w);
    for row in rows.to_vec() {
        let row = row.as_array().map_err(|_| Error::wrong_kind("csv", &row))?;
        let fields = row
            .to_vec()
            .iter()
            .map(cell)
            .collect::<Result<Vec<String>>>()?;
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}

fn cell(v: &Value) -> Result<String> {
    match v {
        Value::Bool(b) => Ok(b.to_string()),
        Value::Int(_) | Value::Int64(_) | Value::Float(_) | Value::Double(_) => Ok(v.to_string()),
        other => {
            let bytes = other
                .as_stringlike()
                .ok_or_else(|| Error::wrong_kind("csv", other))?;
            Ok(std::str::from_utf8(bytes)?.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ragged_rows() {
        let value = csv().decode_bytes(&Options::new(), b"a,b,c\n1,2\n").unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        let second = rows.get(1).unwrap();
        assert_eq!(second.as_array().unwrap().to_vec(), vec![Value::from("1"), Value::from("2")]);
    }

    #[test]
    fn test_encode_mixed_cells() {
        let row = Array::from_vec(vec![Value::from("x,y"), Value::Int(3), Value::Bool(false)]);
        let table = Value::Array(Array::from_vec(vec![Value::Array(row)]));
        let out = csv().encode_bytes(&Options::new(), &table).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\"x,y\",3,false\n");
    }

    #[test]
    fn test_encode_rejects_nested_tables() {
        let inner = Value::Array(Array::new());
        let row = Array::from_vec(vec![inner]);
        let table = Value::Array(Array::from_vec(vec![Value::Array(row)]));
        assert!(csv().encode_bytes(&Options::new(), &table).is_err());
    }
}
