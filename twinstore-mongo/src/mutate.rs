use bson::Document;

use twinstore_condition::Cnd;
use twinstore_model::{value_to_bson, RecordDescriptor};

use crate::filter::id_field_for;

/// Renders one record into an insertable document. `_id` is included only
/// when the in-memory primary key is non-zero: a zero int64/string key means
/// the caller's session is expected to have generated and written one back
/// before insertion (C9 §4.7), and a zero document-id key is left absent on
/// purpose so the Mongo driver assigns a native `ObjectId`.
pub fn render_insert_doc<T>(descriptor: &RecordDescriptor<T>, record: &T) -> Document {
    let mut doc = Document::new();
    if !descriptor.primary_key.is_zero(record) {
        doc.insert("_id", value_to_bson(&descriptor.primary_key.read(record)));
    }
    for field in descriptor.insertable_fields() {
        doc.insert(field.wire_name_doc, value_to_bson(&field.read(record)));
    }
    doc
}

/// Renders a full replacement document for `replaceOne({_id: pk}, doc)`,
/// always including `_id` since the record's identity must already be
/// resolved by the time an update-by-record call is made.
pub fn render_replace_doc<T>(descriptor: &RecordDescriptor<T>, record: &T) -> Document {
    let mut doc = Document::new();
    doc.insert("_id", value_to_bson(&descriptor.primary_key.read(record)));
    for field in descriptor.insertable_fields() {
        doc.insert(field.wire_name_doc, value_to_bson(&field.read(record)));
    }
    doc
}

/// Renders `{$set: {...}}` for an update-by-condition call, stripping the
/// primary key from the upsets map the same way a direct `_id` mutation
/// through `$set` would be rejected by Mongo itself.
pub fn render_set_doc(cnd: &Cnd, pk_name: &str) -> Document {
    let mut set = Document::new();
    for (k, v) in &cnd.upsets {
        if k == pk_name || k == "id" {
            continue;
        }
        set.insert(id_field_for(k), value_to_bson(v));
    }
    let mut doc = Document::new();
    doc.insert("$set", set);
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use twinstore_model::{FieldDescriptor, FieldKind, PrimaryKeyDescriptor, Value};

    struct Demo {
        id: String,
        name: String,
    }

    fn descriptor() -> RecordDescriptor<Demo> {
        RecordDescriptor::new(
            "demo",
            "Demo",
            PrimaryKeyDescriptor::new_string(
                "id",
                false,
                false,
                |r| Value::Str(r.id.clone()),
                |r, v| r.id = v,
            ),
            vec![FieldDescriptor::new(
                "name",
                "name",
                "name",
                FieldKind::String,
                "string",
                false,
                false,
                |r| Value::Str(r.name.clone()),
                |r, raw| {
                    r.name = String::from_utf8_lossy(raw).to_string();
                    Ok(())
                },
            )],
            || Demo { id: String::new(), name: String::new() },
            |v, one| v.push(one),
        )
    }

    #[test]
    fn insert_doc_omits_zero_primary_key() {
        let d = descriptor();
        let rec = Demo { id: String::new(), name: "ann".into() };
        let doc = render_insert_doc(&d, &rec);
        assert!(!doc.contains_key("_id"));
        assert_eq!(doc.get_str("name").unwrap(), "ann");
    }

    #[test]
    fn insert_doc_includes_nonzero_primary_key() {
        let d = descriptor();
        let rec = Demo { id: "abc".into(), name: "ann".into() };
        let doc = render_insert_doc(&d, &rec);
        assert_eq!(doc.get_str("_id").unwrap(), "abc");
    }

    #[test]
    fn set_doc_strips_primary_key() {
        let cnd = Cnd::new().upset("id", "x").upset("name", "b");
        let doc = render_set_doc(&cnd, "id");
        let set = doc.get_document("$set").unwrap();
        assert!(!set.contains_key("id"));
        assert!(!set.contains_key("_id"));
        assert_eq!(set.get_str("name").unwrap(), "b");
    }
}
