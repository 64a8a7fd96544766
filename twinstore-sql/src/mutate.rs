use twinstore_common::err::{CoreError, CoreResult};
use twinstore_common::err::error::ErrorContext;
use twinstore_condition::Cnd;
use twinstore_model::{PrimaryKeyKind, RecordDescriptor, Value};

use crate::where_clause::{pk_column_for, render_where};
use crate::Rendered;

/// Records cannot be inserted/deleted in a single batch larger than this;
/// callers split oversized batches into multiple calls.
pub const MAX_BATCH_SIZE: usize = 2000;

fn quote(name: &str, escape: bool) -> String {
    if escape {
        format!("`{name}`")
    } else {
        name.to_string()
    }
}

/// Renders a single-row or multi-row `INSERT`.
///
/// `omit_pk` is the caller's resolved "is this key database-generated right
/// now" decision (spec §4.2: "if the descriptor marks the type's primary
/// as `auto_id` the key is omitted"); when true the primary-key column is
/// left out of both the column list and the argument vector entirely, so
/// the driver's own default (e.g. `AUTO_INCREMENT`) applies. When false,
/// every record's primary key is expected to already be a usable value —
/// the session layer owns deciding whether that value came from the caller
/// or from the external id generator, and writing it back.
pub fn render_insert<T>(descriptor: &RecordDescriptor<T>, records: &[T], escape: bool, omit_pk: bool) -> CoreResult<Rendered> {
    if records.is_empty() {
        return Err(CoreError::invalid_argument("insert batch is empty"));
    }
    if records.len() > MAX_BATCH_SIZE {
        return Err(CoreError::invalid_argument(format!(
            "insert batch of {} exceeds the {} row cap",
            records.len(),
            MAX_BATCH_SIZE
        )));
    }

    let mut columns = Vec::new();
    if !omit_pk {
        columns.push(descriptor.primary_key.name.to_string());
    }
    columns.extend(descriptor.insertable_fields().map(|f| f.wire_name_sql.to_string()));

    let quoted_cols = columns
        .iter()
        .map(|c| quote(c, escape))
        .collect::<Vec<_>>()
        .join(", ");

    let row_placeholders = format!("({})", vec!["?"; columns.len()].join(","));
    let all_placeholders = vec![row_placeholders; records.len()].join(", ");

    let mut args = Vec::with_capacity(columns.len() * records.len());
    for record in records {
        if !omit_pk {
            args.push(descriptor.primary_key.read(record));
        }
        for field in descriptor.insertable_fields() {
            args.push(field.read(record));
        }
    }

    let table = quote(descriptor.table_name, escape);
    let sql = format!("INSERT INTO {table} ({quoted_cols}) VALUES {all_placeholders}");
    Ok(Rendered { sql, args })
}

/// Renders `UPDATE … WHERE pk = ?` for a single record. The primary key
/// must already be non-zero: updating a record with no identity is always a
/// caller error, never a zero-affected-rows warning.
pub fn render_update_by_record<T>(descriptor: &RecordDescriptor<T>, record: &T, escape: bool) -> CoreResult<Rendered> {
    if descriptor.primary_key.is_zero(record) {
        return Err(CoreError::InvalidArgument(
            ErrorContext::new("update_by_record")
                .table(descriptor.table_name)
                .cause("primary key is zero"),
        ));
    }

    let mut sets = Vec::new();
    let mut args = Vec::new();
    for field in descriptor.insertable_fields() {
        let value = field.read(record);
        // A date field left at its zero value is "not provided", not
        // "explicitly cleared": MySQL zero-dates round-trip poorly and the
        // column keeps whatever it already holds.
        if field.is_date && value.is_zero() {
            continue;
        }
        sets.push(format!("{} = ?", quote(field.wire_name_sql, escape)));
        args.push(value);
    }

    if sets.is_empty() {
        return Err(CoreError::invalid_argument("update has no settable fields"));
    }

    let pk_col = quote(descriptor.primary_key.name, escape);
    args.push(descriptor.primary_key.read(record));

    let table = quote(descriptor.table_name, escape);
    let sql = format!("UPDATE {table} SET {} WHERE {pk_col} = ?", sets.join(", "));
    Ok(Rendered { sql, args })
}

/// Renders `UPDATE … SET … WHERE …` from a condition tree's `upsets` and
/// `conditions`. Both must be non-empty: an unconditioned mass update, or an
/// update with nothing to set, is rejected before a statement is built.
pub fn render_update_by_condition<T>(descriptor: &RecordDescriptor<T>, cnd: &Cnd) -> CoreResult<Rendered> {
    if cnd.upsets.is_empty() {
        return Err(CoreError::invalid_argument("update_by_condition has no upsets"));
    }
    if cnd.conditions.is_empty() {
        return Err(CoreError::invalid_argument(
            "update_by_condition refuses an unconditioned WHERE clause",
        ));
    }

    let escape = cnd.escape;
    let mut args = Vec::with_capacity(cnd.upsets.len());
    let sets = cnd
        .upsets
        .iter()
        .map(|(k, v)| {
            args.push(v.clone());
            format!("{} = ?", quote(k, escape))
        })
        .collect::<Vec<_>>()
        .join(", ");

    let table = quote(descriptor.table_name, escape);
    let mut sql = format!("UPDATE {table} SET {sets}");

    let (where_sql, mut where_args) = render_where(cnd, pk_column_for(cnd, descriptor.primary_key.name), escape)?;
    sql.push_str(&where_sql);
    args.append(&mut where_args);

    Ok(Rendered { sql, args })
}

/// Renders `DELETE … WHERE pk = ?` for a single record.
pub fn render_delete_by_record<T>(descriptor: &RecordDescriptor<T>, record: &T, escape: bool) -> CoreResult<Rendered> {
    if descriptor.primary_key.is_zero(record) {
        return Err(CoreError::InvalidArgument(
            ErrorContext::new("delete_by_record")
                .table(descriptor.table_name)
                .cause("primary key is zero"),
        ));
    }
    let pk_col = quote(descriptor.primary_key.name, escape);
    let table = quote(descriptor.table_name, escape);
    let sql = format!("DELETE FROM {table} WHERE {pk_col} = ?");
    Ok(Rendered {
        sql,
        args: vec![descriptor.primary_key.read(record)],
    })
}

/// Renders `DELETE … WHERE pk IN (…)` for a batch of ids, capped the same
/// way an insert batch is.
pub fn render_delete_by_ids<T>(descriptor: &RecordDescriptor<T>, ids: &[Value], escape: bool) -> CoreResult<Rendered> {
    if ids.is_empty() {
        return Err(CoreError::invalid_argument("delete batch is empty"));
    }
    if ids.len() > MAX_BATCH_SIZE {
        return Err(CoreError::invalid_argument(format!(
            "delete batch of {} exceeds the {} row cap",
            ids.len(),
            MAX_BATCH_SIZE
        )));
    }
    if descriptor.primary_key.kind == PrimaryKeyKind::DocumentId {
        return Err(CoreError::UnsupportedDialect(
            "document ids are not deletable through the SQL builder".to_string(),
        ));
    }

    let placeholders = vec!["?"; ids.len()].join(",");
    let pk_col = quote(descriptor.primary_key.name, escape);
    let table = quote(descriptor.table_name, escape);
    let sql = format!("DELETE FROM {table} WHERE {pk_col} IN ({placeholders})");
    Ok(Rendered {
        sql,
        args: ids.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use twinstore_model::{FieldDescriptor, FieldKind, PrimaryKeyDescriptor};

    struct Demo {
        id: i64,
        name: String,
    }

    fn descriptor() -> RecordDescriptor<Demo> {
        RecordDescriptor::new(
            "demo",
            "Demo",
            PrimaryKeyDescriptor::new_i64("id", true, false, |r| Value::I64(r.id), |r, v| r.id = v),
            vec![FieldDescriptor::new(
                "name",
                "name",
                "name",
                FieldKind::String,
                "varchar",
                false,
                false,
                |r| Value::Str(r.name.clone()),
                |r, raw| {
                    r.name = String::from_utf8_lossy(raw).to_string();
                    Ok(())
                },
            )],
            || Demo { id: 0, name: String::new() },
            |v, one| v.push(one),
        )
    }

    #[test]
    fn insert_renders_one_row_placeholder_group() {
        let d = descriptor();
        let rows = vec![Demo { id: 1, name: "a".into() }];
        let rendered = render_insert(&d, &rows, true, false).unwrap();
        assert_eq!(rendered.sql, "INSERT INTO `demo` (`id`, `name`) VALUES (?,?)");
        assert_eq!(rendered.args.len(), 2);
    }

    #[test]
    fn insert_omits_pk_column_when_database_generated() {
        let d = descriptor();
        let rows = vec![Demo { id: 0, name: "a".into() }];
        let rendered = render_insert(&d, &rows, true, true).unwrap();
        assert_eq!(rendered.sql, "INSERT INTO `demo` (`name`) VALUES (?)");
        assert_eq!(rendered.args.len(), 1);
    }

    #[test]
    fn insert_batch_over_cap_is_rejected() {
        let d = descriptor();
        let rows: Vec<Demo> = (0..(MAX_BATCH_SIZE + 1))
            .map(|i| Demo { id: i as i64, name: "x".into() })
            .collect();
        assert!(render_insert(&d, &rows, true, false).is_err());
    }

    #[test]
    fn update_by_record_requires_nonzero_pk() {
        let d = descriptor();
        let rec = Demo { id: 0, name: "a".into() };
        assert!(render_update_by_record(&d, &rec, true).is_err());
    }

    #[test]
    fn update_by_record_renders_set_and_where() {
        let d = descriptor();
        let rec = Demo { id: 5, name: "a".into() };
        let rendered = render_update_by_record(&d, &rec, true).unwrap();
        assert_eq!(rendered.sql, "UPDATE `demo` SET `name` = ? WHERE `id` = ?");
        assert_eq!(rendered.args.len(), 2);
    }

    #[test]
    fn update_by_condition_requires_where_and_upsets() {
        let d = descriptor();
        let empty = Cnd::model::<Demo>().upset("name", "b");
        assert!(render_update_by_condition(&d, &empty).is_err());

        let no_upsets = Cnd::model::<Demo>().eq("id", 1i64);
        assert!(render_update_by_condition(&d, &no_upsets).is_err());

        let ok = Cnd::model::<Demo>().upset("name", "b").eq("id", 1i64);
        let rendered = render_update_by_condition(&d, &ok).unwrap();
        assert_eq!(rendered.sql, "UPDATE `demo` SET `name` = ? WHERE `id` = ?");
    }

    #[test]
    fn delete_by_ids_expands_in_list() {
        let d = descriptor();
        let ids = vec![Value::I64(1), Value::I64(2)];
        let rendered = render_delete_by_ids(&d, &ids, true).unwrap();
        assert_eq!(rendered.sql, "DELETE FROM `demo` WHERE `id` IN (?,?)");
    }
}
