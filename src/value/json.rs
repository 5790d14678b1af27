//! Conversion between the value graph and `serde_json::Value`, which is the
//! intermediate the typed serde API goes through.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Number, Value as JsonValue};

use crate::num::format_float_default;
use crate::options::YamlVersion;
use crate::value::{Mapping, Sequence, Value};
use crate::{Error, Result};

impl Value {
    /// Converts to JSON. Mapping keys become their scalar text, binary
    /// becomes base64, timestamps become ISO 8601 strings and non-finite
    /// floats become `.inf`, `-.inf` or `.nan`. A value that contains
    /// itself cannot be converted.
    pub fn to_json(&self) -> Result<JsonValue> {
        let mut visiting = Vec::new();
        to_json(self, &mut visiting)
    }

    pub fn from_json(json: &JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::null(),
            JsonValue::Bool(value) => Value::from(*value),
            JsonValue::Number(number) => {
                if let Some(value) = number.as_i64() {
                    Value::from(value)
                } else if let Some(value) = number.as_u64() {
                    Value::from(value)
                } else {
                    Value::from(number.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(value) => Value::from(value.as_str()),
            JsonValue::Array(items) => {
                Value::Seq(Sequence::from_items(items.iter().map(Value::from_json).collect()))
            }
            JsonValue::Object(entries) => Value::Map(Mapping::from_entries(
                entries
                    .iter()
                    .map(|(key, value)| (Value::from(key.as_str()), Value::from_json(value))),
            )),
        }
    }
}

fn enter(visiting: &mut Vec<usize>, identity: usize) -> Result<()> {
    if visiting.contains(&identity) {
        return Err(Error::serde(
            "cannot convert a recursive structure to JSON",
        ));
    }
    visiting.push(identity);
    Ok(())
}

fn key_text(key: &Value) -> String {
    key.scalar_text().unwrap_or_else(|| key.to_string())
}

fn to_json(value: &Value, visiting: &mut Vec<usize>) -> Result<JsonValue> {
    Ok(match value {
        Value::Null(_) => JsonValue::Null,
        Value::Bool(value, _) => JsonValue::Bool(*value),
        Value::Int(value, _) => {
            if let Ok(value) = i64::try_from(*value) {
                JsonValue::from(value)
            } else if let Ok(value) = u64::try_from(*value) {
                JsonValue::from(value)
            } else {
                Number::from_f64(*value as f64)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            }
        }
        Value::Float(value, _) => match Number::from_f64(*value) {
            Some(number) => JsonValue::Number(number),
            None => JsonValue::String(format_float_default(*value, YamlVersion::V1_2)),
        },
        Value::Str(value, _) => JsonValue::String(value.clone()),
        Value::Binary(value, _) => JsonValue::String(STANDARD.encode(value)),
        Value::Timestamp(value, _) => JsonValue::String(value.to_iso8601()),
        Value::Seq(seq) => {
            enter(visiting, seq.identity())?;
            let items = seq
                .items()
                .iter()
                .map(|item| to_json(item, visiting))
                .collect::<Result<Vec<_>>>()?;
            visiting.pop();
            JsonValue::Array(items)
        }
        Value::Set(set) => {
            enter(visiting, set.identity())?;
            let items = set
                .items()
                .iter()
                .map(|item| to_json(item, visiting))
                .collect::<Result<Vec<_>>>()?;
            visiting.pop();
            JsonValue::Array(items)
        }
        Value::Map(map) => {
            enter(visiting, map.identity())?;
            let mut object = Map::new();
            for (key, value) in map.entries() {
                object.insert(key_text(&key), to_json(&value, visiting)?);
            }
            visiting.pop();
            JsonValue::Object(object)
        }
    })
}
