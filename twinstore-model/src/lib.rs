//! Model registry (C1) and value codec (C2): reflect once over a
//! user-defined record type, cache its field layout and primary-key kind,
//! and expose zero-reflection field access for the rest of the runtime.

pub mod codec;
pub mod descriptor;
pub mod macros;
pub mod registry;
pub mod value;

pub use codec::{bson_to_raw, encode_scalar, parse_scalar, value_to_bson};
pub use descriptor::{FieldDescriptor, FieldKind, PrimaryKeyDescriptor, PrimaryKeyKind, RecordDescriptor};
pub use macros::{from_value, FromValueShim};
pub use registry::{register_model, Model, ModelInfo, ModelRegistry, MODEL_REGISTRY};
pub use value::Value;
