use twinstore_common::err::{CoreError, CoreResult};
use twinstore_common::err::error::ErrorContext;

/// Runtime representation of a single field value, widened to the handful
/// of shapes the two backing stores and the wire codecs agree on.
///
/// Sequence and mapping fields never appear in their native shape here: the
/// codec round-trips them through `Value::Json` canonical text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Str(String),
    /// Canonical JSON text backing a sequence or mapping field.
    Json(String),
    /// A document-store native id, carried as its hex/string form.
    DocumentId(String),
}

impl Value {
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::I64(v) => *v == 0,
            Value::U64(v) => *v == 0,
            Value::F64(v) => *v == 0.0,
            Value::Bool(v) => !v,
            Value::Str(v) => v.is_empty(),
            Value::Json(v) => v.is_empty() || v == "null",
            Value::DocumentId(v) => v.is_empty(),
        }
    }

    pub fn as_i64(&self) -> CoreResult<i64> {
        match self {
            Value::I64(v) => Ok(*v),
            Value::U64(v) => Ok(*v as i64),
            Value::Str(s) => s.parse::<i64>().map_err(|e| {
                CoreError::DecodeError(ErrorContext::new("as_i64").cause(e))
            }),
            other => Err(CoreError::DecodeError(
                ErrorContext::new("as_i64").cause(format!("{other:?} is not integral")),
            )),
        }
    }

    pub fn as_str(&self) -> CoreResult<&str> {
        match self {
            Value::Str(s) => Ok(s.as_str()),
            Value::DocumentId(s) => Ok(s.as_str()),
            other => Err(CoreError::DecodeError(
                ErrorContext::new("as_str").cause(format!("{other:?} is not a string")),
            )),
        }
    }

    /// Renders a value the way it must appear as a MySQL bind parameter or a
    /// Mongo BSON-adjacent scalar — the caller picks the concrete
    /// destination type; this is the shared textual fallback used for
    /// logging and for LIKE's `%…%` wrapping.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::I64(v) => v.to_string(),
            Value::U64(v) => v.to_string(),
            Value::F64(v) => v.to_string(),
            Value::Bool(v) => v.to_string(),
            Value::Str(v) => v.clone(),
            Value::Json(v) => v.clone(),
            Value::DocumentId(v) => v.clone(),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I64(v as i64)
    }
}
impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}
impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U64(v as u64)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}
impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F64(v as f64)
    }
}
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}
