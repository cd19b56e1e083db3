//! Firestore typed-value codec.
//!
//! Documents are converted to plain JSON objects so the domain types decode
//! them with their ordinary serde impls. The document id is exposed as an
//! `id` field.

use serde_json::{json, Map, Value};

use crate::error::StoreError;

/// Last path segment of a document resource name.
pub fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

pub fn decode_value(value: &Value) -> Value {
    let Some(typed) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = typed.iter().next() else {
        return Value::Null;
    };
    match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => inner.clone(),
        "integerValue" => match inner {
            Value::String(text) => text.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            Value::Number(_) => inner.clone(),
            _ => Value::Null,
        },
        // Non-finite doubles arrive as "NaN" / "Infinity" strings.
        "doubleValue" => match inner {
            Value::Number(_) => inner.clone(),
            _ => Value::Null,
        },
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "geoPointValue" => inner.clone(),
        "arrayValue" => {
            let values = inner.get("values").and_then(Value::as_array);
            Value::Array(values.map(|vs| vs.iter().map(decode_value).collect()).unwrap_or_default())
        }
        "mapValue" => Value::Object(decode_fields(inner.get("fields"))),
        _ => Value::Null,
    }
}

fn decode_fields(fields: Option<&Value>) -> Map<String, Value> {
    fields
        .and_then(Value::as_object)
        .map(|fields| fields.iter().map(|(k, v)| (k.clone(), decode_value(v))).collect())
        .unwrap_or_default()
}

/// `{name, fields}` to a plain object carrying the document id.
pub fn decode_document(document: &Value) -> Result<Value, StoreError> {
    let name = document
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Decode("document without a name".to_string()))?;
    let mut object = decode_fields(document.get("fields"));
    object.insert("id".to_string(), Value::String(document_id(name).to_string()));
    Ok(Value::Object(object))
}

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) if n.is_i64() || n.is_u64() => json!({ "integerValue": n.to_string() }),
        Value::Number(n) => json!({ "doubleValue": n }),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_map(map, &[]) } }),
    }
}

fn encode_map(map: &Map<String, Value>, timestamps: &[&str]) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let encoded = match value {
                Value::String(s) if timestamps.contains(&key.as_str()) => json!({ "timestampValue": s }),
                other => encode_value(other),
            };
            (key.clone(), encoded)
        })
        .collect()
}

/// Encodes a top-level object as document `fields`, dropping `id` and
/// writing the keys named in `timestamps` as timestamp values.
pub fn encode_fields(value: &Value, timestamps: &[&str]) -> Result<Value, StoreError> {
    let mut map = value
        .as_object()
        .cloned()
        .ok_or_else(|| StoreError::Decode("only objects can be stored as documents".to_string()))?;
    map.remove("id");
    Ok(Value::Object(encode_map(&map, timestamps)))
}
