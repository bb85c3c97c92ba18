use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::{Map, Value as JsonValue};

use strata_core::{FlatTable, Value};

/// Write a table as a JSON array of row objects.
pub fn write_table_json(path: &Path, table: &FlatTable) -> Result<(), serde_json::Error> {
    let file = File::create(path).map_err(serde_json::Error::io)?;
    write_json(BufWriter::new(file), table)
}

pub fn write_json<W: Write>(mut writer: W, table: &FlatTable) -> Result<(), serde_json::Error> {
    let rows: Vec<JsonValue> = table
        .iter_rows()
        .map(|row| {
            let object: Map<String, JsonValue> = table
                .column_names()
                .iter()
                .zip(row)
                .map(|(name, value)| (name.clone(), to_json(value)))
                .collect();
            JsonValue::Object(object)
        })
        .collect();
    serde_json::to_writer_pretty(&mut writer, &rows)?;
    writer.flush().map_err(serde_json::Error::io)
}

fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(value) => JsonValue::Bool(*value),
        Value::Int(value) => JsonValue::from(*value),
        // Non-finite floats have no JSON form.
        Value::Float(value) => serde_json::Number::from_f64(*value)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Text(value) => JsonValue::String(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_become_objects() {
        let mut table = FlatTable::new(1);
        table.insert("block", vec![Value::Int(1)]).unwrap();
        table.insert("score", vec![Value::Float(f64::NAN)]).unwrap();

        let mut out = Vec::new();
        write_json(&mut out, &table).unwrap();
        let parsed: JsonValue = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, serde_json::json!([{ "block": 1, "score": null }]));
    }
}
