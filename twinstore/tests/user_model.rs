//! Worked example referenced by `twinstore_model`'s doc comment: a hand-
//! written `Model` impl for a `User` record, registered once and then driven
//! through the condition tree and both renderers. No database is touched —
//! this only exercises the registration/codec/builder seam.

use twinstore::{register_model, Cnd, Direction, FieldDescriptor, FieldKind, Model, PrimaryKeyDescriptor, RecordDescriptor, Value};

#[derive(Debug, Clone, Default)]
struct User {
    id: i64,
    name: String,
    age: i32,
}

impl Model for User {
    fn descriptor() -> RecordDescriptor<Self> {
        RecordDescriptor::new(
            "user",
            "User",
            PrimaryKeyDescriptor::new_i64(
                "id",
                true,
                false,
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
                    "age",
                    "age",
                    "age",
                    FieldKind::Int32,
                    "int",
                    false,
                    false,
                    |r: &User| Value::I64(r.age as i64),
                    |r: &mut User, raw| {
                        r.age = twinstore_model::from_value(twinstore_model::parse_scalar(FieldKind::Int32, false, raw)?)?;
                        Ok(())
                    },
                ),
            ],
            || User::default(),
            |container, one| container.push(one),
        )
    }
}

#[test]
fn user_registers_and_is_discoverable_by_table_name() {
    register_model::<User>();
    assert!(twinstore_model::MODEL_REGISTRY.is_registered("user"));
    let info = twinstore_model::MODEL_REGISTRY.describe("user").unwrap();
    assert_eq!(info.model_name, "User");
    assert!(info.auto_id);
}

#[test]
fn cnd_over_user_renders_to_both_stores() {
    register_model::<User>();
    let descriptor = User::descriptor();

    let cnd = Cnd::model::<User>().gte("age", 18i32).orderby("id", Direction::Desc).limit(10);

    let rendered = twinstore_sql::render_find_list(&descriptor, &cnd, twinstore_sql::Dialect::MySql).unwrap();
    assert!(rendered.sql.contains("`age` >= ?"));
    assert!(rendered.sql.contains("LIMIT 10"));

    let filter = twinstore_mongo::render_filter(&cnd).unwrap();
    assert!(filter.contains_key("age"));
}

#[test]
fn codec_round_trips_a_decoded_row() {
    let descriptor = User::descriptor();
    let mut user = descriptor.new_one();
    descriptor
        .field_by_wire_sql("name")
        .unwrap()
        .write(&mut user, b"Ada Lovelace")
        .unwrap();
    descriptor.field_by_wire_sql("age").unwrap().write(&mut user, b"36").unwrap();

    assert_eq!(user.name, "Ada Lovelace");
    assert_eq!(user.age, 36);
}
