use mysql_async::Value as SqlValue;
use twinstore_model::Value;

/// Converts a driver column into the raw bytes [`twinstore_model::FieldDescriptor::write`]
/// expects: empty bytes for `NULL` (the codec's zero-value contract), UTF-8
/// text for everything else.
pub fn column_to_raw(v: &SqlValue) -> Vec<u8> {
    match v {
        SqlValue::NULL => Vec::new(),
        SqlValue::Bytes(b) => b.clone(),
        SqlValue::Int(i) => i.to_string().into_bytes(),
        SqlValue::UInt(u) => u.to_string().into_bytes(),
        SqlValue::Float(f) => f.to_string().into_bytes(),
        SqlValue::Double(d) => d.to_string().into_bytes(),
        SqlValue::Date(year, month, day, hour, min, sec, micro) => format!(
            "{year:04}-{month:02}-{day:02} {hour:02}:{min:02}:{sec:02}.{micro:06}"
        )
        .into_bytes(),
        SqlValue::Time(neg, days, hours, minutes, seconds, micro) => {
            let sign = if *neg { "-" } else { "" };
            format!("{sign}{}:{minutes:02}:{seconds:02}.{micro:06}", u32::from(*days) * 24 + u32::from(*hours))
                .into_bytes()
        }
    }
}

/// Renders a [`Value`] bind argument the way `mysql_async` expects it.
pub fn value_to_bind(v: &Value) -> SqlValue {
    match v {
        Value::Null => SqlValue::NULL,
        Value::I64(i) => SqlValue::Int(*i),
        Value::U64(u) => SqlValue::UInt(*u),
        Value::F64(f) => SqlValue::Double(*f),
        Value::Bool(b) => SqlValue::Int(if *b { 1 } else { 0 }),
        Value::Str(s) => SqlValue::Bytes(s.clone().into_bytes()),
        Value::Json(s) => SqlValue::Bytes(s.clone().into_bytes()),
        Value::DocumentId(s) => SqlValue::Bytes(s.clone().into_bytes()),
    }
}

pub fn values_to_params(values: &[Value]) -> mysql_async::Params {
    mysql_async::Params::Positional(values.iter().map(value_to_bind).collect())
}
