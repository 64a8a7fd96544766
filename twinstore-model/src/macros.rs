//! Narrow scalar-conversion helpers used when hand-writing a [`crate::registry::Model`]
//! impl, so each field's `set` closure can end in one short `?`-propagating
//! line instead of a per-kind `match`.
//!
//! There is deliberately no derive/declarative macro here: field discovery
//! happens once at registration, not by reflecting over the type at query
//! time, and that contract ("capture once, call directly forever after")
//! is most honestly expressed as a small hand-written impl per record type
//! — see `twinstore/tests` for a worked example (`User`).

use twinstore_common::err::CoreResult;

use crate::value::Value;

/// Implemented for the scalar Rust types a decoded [`Value`] can be
/// narrowed back into.
pub trait FromValueShim: Sized {
    fn from_value(v: Value) -> CoreResult<Self>;
}

macro_rules! impl_from_value_shim_int {
    ($($t:ty),*) => {
        $(impl FromValueShim for $t {
            fn from_value(v: Value) -> CoreResult<Self> {
                Ok(v.as_i64()? as $t)
            }
        })*
    };
}
impl_from_value_shim_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromValueShim for String {
    fn from_value(v: Value) -> CoreResult<Self> {
        Ok(v.as_str()?.to_string())
    }
}

impl FromValueShim for bool {
    fn from_value(v: Value) -> CoreResult<Self> {
        match v {
            Value::Bool(b) => Ok(b),
            other => Ok(!other.is_zero()),
        }
    }
}

impl FromValueShim for f64 {
    fn from_value(v: Value) -> CoreResult<Self> {
        match v {
            Value::F64(f) => Ok(f),
            other => other.as_i64().map(|i| i as f64),
        }
    }
}

impl FromValueShim for f32 {
    fn from_value(v: Value) -> CoreResult<Self> {
        f64::from_value(v).map(|f| f as f32)
    }
}

/// Narrows a decoded [`Value`] into `T`. Used from a `FieldDescriptor`'s
/// `set` closure: `rec.field = from_value(v)?;`.
pub fn from_value<T: FromValueShim>(v: Value) -> CoreResult<T> {
    T::from_value(v)
}
