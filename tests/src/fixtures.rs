//! Worked example of a hand-written [`Model`] impl, the shape every embedding
//! application's derive macro (not part of this crate) is expected to
//! produce. Shared by every integration test module below.

use twinstore_model::{FieldDescriptor, FieldKind, Model, PrimaryKeyDescriptor, RecordDescriptor, Value};

#[derive(Debug, Clone, Default)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl Model for User {
    fn descriptor() -> RecordDescriptor<Self> {
        RecordDescriptor::new(
            "user",
            "User",
            PrimaryKeyDescriptor::new_i64(
                "id",
                true,
                true,
                |r: &User| Value::I64(r.id),
                |r: &mut User, v| r.id = v,
            ),
            vec![
                FieldDescriptor::new(
                    "name",
                    "name",
                    "name",
                    FieldKind::String,
                    "string",
                    false,
                    false,
                    |r: &User| Value::Str(r.name.clone()),
                    |r: &mut User, raw| {
                        r.name = twinstore_model::from_value(twinstore_model::parse_scalar(FieldKind::String, false, raw)?)?;
                        Ok(())
                    },
                ),
                FieldDescriptor::new(
                    "email",
                    "email",
                    "email",
                    FieldKind::String,
                    "string",
                    false,
                    false,
                    |r: &User| Value::Str(r.email.clone()),
                    |r: &mut User, raw| {
                        r.email = twinstore_model::from_value(twinstore_model::parse_scalar(FieldKind::String, false, raw)?)?;
                        Ok(())
                    },
                ),
            ],
            || User::default(),
            |container, one| container.push(one),
        )
    }
}
