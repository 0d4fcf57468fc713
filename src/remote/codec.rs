// src/remote/codec.rs

//! Conversion between plain JSON and the document store's typed REST values.
//!
//! The REST surface wraps every value in a one-key object naming its type:
//!
//! ```text
//! "abc"          <-> {"stringValue": "abc"}
//! 12             <-> {"integerValue": "12"}
//! 1.5            <-> {"doubleValue": 1.5}
//! [1]            <-> {"arrayValue": {"values": [{"integerValue": "1"}]}}
//! {"a": true}    <-> {"mapValue": {"fields": {"a": {"booleanValue": true}}}}
//! ```
//!
//! Timestamps, references and bytes decode to strings; geo points decode to
//! `{"latitude", "longitude"}` objects.

use serde_json::{json, Map, Number, Value};

use crate::errors::MillError;
use crate::store::Document;

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn encode_fields(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

pub fn decode_value(value: &Value) -> Result<Value, MillError> {
    let obj = value
        .as_object()
        .ok_or_else(|| MillError::Json(format!("typed value is not an object: {value}")))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| MillError::Json("empty typed value".into()))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(Value::Bool(inner.as_bool().unwrap_or(false))),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            parsed
                .map(|i| Value::Number(i.into()))
                .ok_or_else(|| MillError::Json(format!("bad integerValue: {inner}")))
        }
        "doubleValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<f64>().ok(),
                other => other.as_f64(),
            };
            // NaN and infinities have no JSON form.
            Ok(parsed
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null))
        }
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => {
            Ok(Value::String(inner.as_str().unwrap_or_default().to_string()))
        }
        "geoPointValue" => Ok(json!({
            "latitude": inner.get("latitude").cloned().unwrap_or(Value::Null),
            "longitude": inner.get("longitude").cloned().unwrap_or(Value::Null),
        })),
        "arrayValue" => {
            let values = match inner.get("values").and_then(Value::as_array) {
                Some(values) => values
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };
            Ok(Value::Array(values))
        }
        "mapValue" => match inner.get("fields") {
            Some(fields) => Ok(Value::Object(decode_fields(fields)?)),
            None => Ok(Value::Object(Map::new())),
        },
        other => Err(MillError::Json(format!("unknown value type '{other}'"))),
    }
}

pub fn decode_fields(fields: &Value) -> Result<Map<String, Value>, MillError> {
    let Some(map) = fields.as_object() else {
        return Err(MillError::Json("fields is not an object".into()));
    };
    map.iter()
        .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
        .collect()
}

/// Decode a REST document (`{"name": ".../documents/<col>/<id>", "fields": {...}}`).
pub fn decode_document(doc: &Value) -> Result<Document, MillError> {
    let name = doc
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| MillError::Json("document has no name".into()))?;
    let id = name.rsplit('/').next().unwrap_or(name).to_string();

    let data = match doc.get("fields") {
        Some(fields) => decode_fields(fields)?,
        None => Map::new(),
    };
    Ok(Document { id, data })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_travel_as_strings() {
        assert_eq!(encode_value(&json!(32000)), json!({"integerValue": "32000"}));
        assert_eq!(
            decode_value(&json!({"integerValue": "32000"})).unwrap(),
            json!(32000)
        );
    }

    #[test]
    fn nested_maps_and_arrays_decode() {
        let typed = json!({
            "mapValue": {"fields": {
                "items": {"arrayValue": {"values": [
                    {"mapValue": {"fields": {
                        "name": {"stringValue": "Keeri Samba"},
                        "qty": {"doubleValue": 12.5}
                    }}}
                ]}},
                "paid": {"booleanValue": false},
                "note": {"nullValue": null}
            }}
        });

        assert_eq!(
            decode_value(&typed).unwrap(),
            json!({
                "items": [{"name": "Keeri Samba", "qty": 12.5}],
                "paid": false,
                "note": null
            })
        );
    }

    #[test]
    fn encode_then_decode_preserves_a_dealer_record() {
        let dealer = json!({
            "name": "Ravi Stores",
            "creditLimit": 1000000,
            "creditUsed": 2500.75,
            "paymentMethods": ["online", "cash"],
            "savedAddress": {"city": "Polonnaruwa"}
        });
        assert_eq!(decode_value(&encode_value(&dealer)).unwrap(), dealer);
    }

    #[test]
    fn special_types_decode_to_plain_json() {
        assert_eq!(
            decode_value(&json!({"timestampValue": "2024-05-01T08:00:00Z"})).unwrap(),
            json!("2024-05-01T08:00:00Z")
        );
        assert_eq!(
            decode_value(&json!({"geoPointValue": {"latitude": 7.9, "longitude": 81.0}}))
                .unwrap(),
            json!({"latitude": 7.9, "longitude": 81.0})
        );
        assert_eq!(
            decode_value(&json!({"doubleValue": "NaN"})).unwrap(),
            Value::Null
        );
        assert!(decode_value(&json!({"mysteryValue": 1})).is_err());
    }

    #[test]
    fn document_id_is_last_name_segment() {
        let doc = decode_document(&json!({
            "name": "projects/p/databases/(default)/documents/dealers/abc123",
            "fields": {"uid": {"stringValue": "u1"}}
        }))
        .unwrap();
        assert_eq!(doc.id, "abc123");
        assert_eq!(doc.data["uid"], "u1");
    }
}
