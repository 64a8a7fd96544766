use chrono::NaiveDateTime;
use twinstore_common::err::error::ErrorContext;
use twinstore_common::err::{CoreError, CoreResult};

use crate::descriptor::FieldKind;
use crate::value::Value;

/// Parses a raw driver byte column into a typed [`Value`] according to a
/// field's declared kind.
///
/// Empty input is tolerated and yields the kind's zero value. Malformed
/// non-empty input is a `DecodeError`.
pub fn parse_scalar(kind: FieldKind, is_date: bool, raw: &[u8]) -> CoreResult<Value> {
    if raw.is_empty() {
        return Ok(zero_value(kind));
    }

    let text = std::str::from_utf8(raw).map_err(|e| {
        CoreError::DecodeError(ErrorContext::new("parse_scalar").cause(e))
    })?;

    if is_date && is_integral(kind) {
        return Ok(Value::I64(parse_date_to_epoch(text)?));
    }

    match kind {
        FieldKind::Int8
        | FieldKind::Int16
        | FieldKind::Int32
        | FieldKind::Int64 => Ok(Value::I64(text.parse::<i64>()?)),
        FieldKind::UInt8 | FieldKind::UInt16 | FieldKind::UInt32 | FieldKind::UInt64 => {
            Ok(Value::U64(text.parse::<u64>().map_err(|e| {
                CoreError::DecodeError(ErrorContext::new("parse_scalar").cause(e))
            })?))
        }
        FieldKind::Float32 | FieldKind::Float64 => {
            Ok(Value::F64(text.parse::<f64>().map_err(|e| {
                CoreError::DecodeError(ErrorContext::new("parse_scalar").cause(e))
            })?))
        }
        FieldKind::Bool => Ok(Value::Bool(text != "0" && text != "false")),
        FieldKind::String => Ok(Value::Str(text.to_string())),
        FieldKind::DocumentId => Ok(Value::DocumentId(text.to_string())),
        FieldKind::Sequence | FieldKind::Mapping => {
            // Already-canonical JSON text round-trips verbatim; this also
            // validates it actually parses as JSON.
            let _: serde_json::Value = serde_json::from_str(text)?;
            Ok(Value::Json(text.to_string()))
        }
    }
}

fn is_integral(kind: FieldKind) -> bool {
    matches!(
        kind,
        FieldKind::Int8
            | FieldKind::Int16
            | FieldKind::Int32
            | FieldKind::Int64
            | FieldKind::UInt8
            | FieldKind::UInt16
            | FieldKind::UInt32
            | FieldKind::UInt64
    )
}

fn zero_value(kind: FieldKind) -> Value {
    match kind {
        FieldKind::Int8
        | FieldKind::Int16
        | FieldKind::Int32
        | FieldKind::Int64 => Value::I64(0),
        FieldKind::UInt8 | FieldKind::UInt16 | FieldKind::UInt32 | FieldKind::UInt64 => {
            Value::U64(0)
        }
        FieldKind::Float32 | FieldKind::Float64 => Value::F64(0.0),
        FieldKind::Bool => Value::Bool(false),
        FieldKind::String => Value::Str(String::new()),
        FieldKind::DocumentId => Value::DocumentId(String::new()),
        FieldKind::Sequence => Value::Json("[]".to_string()),
        FieldKind::Mapping => Value::Json("{}".to_string()),
    }
}

/// Date-typed integer columns accept either a numeric epoch (milliseconds)
/// or a formatted `YYYY-MM-DD HH:MM:SS` timestamp string.
fn parse_date_to_epoch(text: &str) -> CoreResult<i64> {
    if let Ok(epoch) = text.parse::<i64>() {
        return Ok(epoch);
    }

    let fmts = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    for fmt in fmts {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    Err(CoreError::DecodeError(
        ErrorContext::new("parse_date_to_epoch").cause(format!("unrecognized timestamp {text:?}")),
    ))
}

/// Serializes a [`Value`] to the textual form a MySQL `?` parameter or a
/// Mongo scalar expects. Sequence/mapping values are already canonical JSON
/// text and pass through unchanged.
pub fn encode_scalar(value: &Value) -> String {
    value.to_display_string()
}

/// Document-side entry point for decoding: widens a driver-returned BSON
/// value into the same raw-byte textual form [`parse_scalar`] expects, so a
/// field's hand-written `set` closure works unchanged whether it was fed by
/// a MySQL column or a Mongo document. `_id`/date handling stays with the
/// caller — this only narrows the BSON shape to bytes.
pub fn bson_to_raw(value: &bson::Bson) -> Vec<u8> {
    use bson::Bson;
    match value {
        Bson::Null | Bson::Undefined => Vec::new(),
        Bson::Boolean(b) => if *b { b"1".to_vec() } else { b"0".to_vec() },
        Bson::Int32(v) => v.to_string().into_bytes(),
        Bson::Int64(v) => v.to_string().into_bytes(),
        Bson::Double(v) => v.to_string().into_bytes(),
        Bson::String(s) => s.clone().into_bytes(),
        Bson::ObjectId(oid) => oid.to_hex().into_bytes(),
        Bson::DateTime(dt) => dt.timestamp_millis().to_string().into_bytes(),
        Bson::Array(_) | Bson::Document(_) => {
            serde_json::to_vec(&value.clone().into_relaxed_extjson()).unwrap_or_default()
        }
        other => other.to_string().into_bytes(),
    }
}

/// Document-side entry point for encoding: widens a typed [`Value`] into the
/// BSON shape a Mongo insert/update document carries. `Value::Json` round
/// -trips through `serde_json` into native BSON (arrays/sub-documents rather
/// than a string), and `Value::DocumentId` becomes a real `ObjectId` when it
/// parses as one, falling back to a plain string for ids sourced from MySQL.
pub fn value_to_bson(value: &Value) -> bson::Bson {
    use bson::Bson;
    match value {
        Value::Null => Bson::Null,
        Value::I64(v) => Bson::Int64(*v),
        Value::U64(v) => Bson::Int64(*v as i64),
        Value::F64(v) => Bson::Double(*v),
        Value::Bool(v) => Bson::Boolean(*v),
        Value::Str(v) => Bson::String(v.clone()),
        Value::Json(v) => serde_json::from_str::<serde_json::Value>(v)
            .ok()
            .and_then(|j| bson::to_bson(&j).ok())
            .unwrap_or(Bson::Null),
        Value::DocumentId(v) => bson::oid::ObjectId::parse_str(v)
            .map(Bson::ObjectId)
            .unwrap_or_else(|_| Bson::String(v.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bytes_yield_zero_value() {
        assert_eq!(parse_scalar(FieldKind::Int64, false, b"").unwrap(), Value::I64(0));
        assert_eq!(
            parse_scalar(FieldKind::String, false, b"").unwrap(),
            Value::Str(String::new())
        );
    }

    #[test]
    fn date_accepts_epoch_or_formatted_string() {
        let from_epoch = parse_scalar(FieldKind::Int64, true, b"1700000000000").unwrap();
        assert_eq!(from_epoch, Value::I64(1_700_000_000_000));

        let from_text =
            parse_scalar(FieldKind::Int64, true, b"2023-11-14 22:13:20").unwrap();
        assert_eq!(from_text, Value::I64(1_699_999_600_000));
    }

    #[test]
    fn malformed_bytes_fail() {
        assert!(parse_scalar(FieldKind::Int64, false, b"not-a-number").is_err());
    }

    #[test]
    fn sequence_round_trips_json_text() {
        let v = parse_scalar(FieldKind::Sequence, false, br#"[1,2,3]"#).unwrap();
        assert_eq!(v, Value::Json("[1,2,3]".to_string()));
    }
}
