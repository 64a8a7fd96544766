use twinstore_common::err::CoreResult;
use twinstore_condition::Cnd;
use twinstore_model::RecordDescriptor;

use crate::dialect::Dialect;
use crate::where_clause::{pk_column_for, render_group_by, render_order_by, render_where};
use crate::Rendered;

fn quote(name: &str, escape: bool) -> String {
    if escape {
        format!("`{name}`")
    } else {
        name.to_string()
    }
}

fn projection<T>(descriptor: &RecordDescriptor<T>, cnd: &Cnd) -> Vec<String> {
    if !cnd.any_fields.is_empty() {
        let mut cols: Vec<String> = cnd.any_fields.clone();
        if !cols.iter().any(|c| c == descriptor.primary_key.name) {
            cols.insert(0, descriptor.primary_key.name.to_string());
        }
        return cols;
    }

    let mut cols = vec![descriptor.primary_key.name.to_string()];
    cols.extend(
        descriptor
            .insertable_fields()
            .filter(|f| !cnd.any_not_fields.iter().any(|ex| ex == f.wire_name_sql))
            .map(|f| f.wire_name_sql.to_string()),
    );
    cols
}

fn from_clause<T>(descriptor: &RecordDescriptor<T>, cnd: &Cnd, escape: bool) -> String {
    match &cnd.from {
        Some(from) => format!("{} AS {}", quote(&from.table, escape), from.alias),
        None => quote(descriptor.table_name, escape),
    }
}

fn joins_clause(cnd: &Cnd) -> String {
    use twinstore_condition::JoinKind;
    cnd.joins
        .iter()
        .map(|j| {
            let kw = match j.kind {
                JoinKind::Left => "LEFT JOIN",
                JoinKind::Right => "RIGHT JOIN",
                JoinKind::Inner => "INNER JOIN",
            };
            let alias = j.alias.as_deref().map(|a| format!(" AS {a}")).unwrap_or_default();
            format!(" {kw} {}{} ON {}", j.table, alias, j.on)
        })
        .collect::<Vec<_>>()
        .join("")
}

/// Renders a full `SELECT` for a list of rows, including pagination.
pub fn render_find_list<T>(descriptor: &RecordDescriptor<T>, cnd: &Cnd, dialect: Dialect) -> CoreResult<Rendered> {
    let escape = cnd.escape;
    let cols = projection(descriptor, cnd)
        .into_iter()
        .map(|c| quote(&c, escape))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!("SELECT {cols} FROM {}", from_clause(descriptor, cnd, escape));
    sql.push_str(&joins_clause(cnd));

    let (where_sql, args) = render_where(cnd, pk_column_for(cnd, descriptor.primary_key.name), escape)?;
    sql.push_str(&where_sql);
    sql.push_str(&render_group_by(cnd, escape));
    sql.push_str(&render_order_by(cnd, escape));

    if cnd.pagination.is_page || cnd.pagination.is_fast_page {
        dialect.render_limit(&mut sql, &cnd.pagination)?;
    } else if let Some(n) = cnd.limit_size {
        sql.push_str(&format!(" LIMIT {n}"));
    }

    Ok(Rendered { sql, args })
}

/// Renders a single-row `SELECT … LIMIT 1`, ignoring any pagination on `cnd`.
pub fn render_find_one<T>(descriptor: &RecordDescriptor<T>, cnd: &Cnd) -> CoreResult<Rendered> {
    let escape = cnd.escape;
    let cols = projection(descriptor, cnd)
        .into_iter()
        .map(|c| quote(&c, escape))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!("SELECT {cols} FROM {}", from_clause(descriptor, cnd, escape));
    sql.push_str(&joins_clause(cnd));

    let (where_sql, args) = render_where(cnd, pk_column_for(cnd, descriptor.primary_key.name), escape)?;
    sql.push_str(&where_sql);
    sql.push_str(&render_order_by(cnd, escape));
    sql.push_str(" LIMIT 1");

    Ok(Rendered { sql, args })
}

/// Renders `COUNT(1)` over the same filtered set a list query would return,
/// stripping ordering and pagination since they don't affect cardinality.
pub fn render_count<T>(descriptor: &RecordDescriptor<T>, cnd: &Cnd, dialect: Dialect) -> CoreResult<Rendered> {
    let escape = cnd.escape;

    if !cnd.groupbys.is_empty() {
        let inner_cols = cnd
            .groupbys
            .iter()
            .map(|c| quote(c, escape))
            .collect::<Vec<_>>()
            .join(", ");
        let mut inner = format!("SELECT {inner_cols} FROM {}", from_clause(descriptor, cnd, escape));
        inner.push_str(&joins_clause(cnd));
        let (where_sql, args) = render_where(cnd, pk_column_for(cnd, descriptor.primary_key.name), escape)?;
        inner.push_str(&where_sql);
        inner.push_str(&render_group_by(cnd, escape));
        let sql = dialect.render_count_wrapper(&inner)?;
        return Ok(Rendered { sql, args });
    }

    let mut sql = format!("SELECT COUNT(1) FROM {}", from_clause(descriptor, cnd, escape));
    sql.push_str(&joins_clause(cnd));
    let (where_sql, args) = render_where(cnd, pk_column_for(cnd, descriptor.primary_key.name), escape)?;
    sql.push_str(&where_sql);
    Ok(Rendered { sql, args })
}

/// Renders `SELECT EXISTS(SELECT 1 … LIMIT 1)`, cheaper than a full row
/// fetch when only presence is needed.
pub fn render_exists<T>(descriptor: &RecordDescriptor<T>, cnd: &Cnd) -> CoreResult<Rendered> {
    let escape = cnd.escape;
    let mut inner = format!("SELECT 1 FROM {}", from_clause(descriptor, cnd, escape));
    inner.push_str(&joins_clause(cnd));
    let (where_sql, args) = render_where(cnd, pk_column_for(cnd, descriptor.primary_key.name), escape)?;
    inner.push_str(&where_sql);
    inner.push_str(" LIMIT 1");
    Ok(Rendered {
        sql: format!("SELECT EXISTS({inner})"),
        args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use twinstore_model::{FieldDescriptor, FieldKind, PrimaryKeyDescriptor, Value};

    struct Demo {
        id: i64,
        name: String,
    }

    fn descriptor() -> RecordDescriptor<Demo> {
        RecordDescriptor::new(
            "demo",
            "Demo",
            PrimaryKeyDescriptor::new_i64(
                "id",
                true,
                false,
                |r| Value::I64(r.id),
                |r, v| r.id = v,
            ),
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
    fn find_list_renders_projection_and_where() {
        let d = descriptor();
        let cnd = Cnd::model::<Demo>().eq("name", "ann").offset(1, 10);
        let rendered = render_find_list(&d, &cnd, Dialect::MySql).unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT `id`, `name` FROM `demo` WHERE `name` = ? LIMIT 0,10"
        );
        assert_eq!(rendered.args.len(), 1);
    }

    #[test]
    fn find_one_always_limits_to_one() {
        let d = descriptor();
        let cnd = Cnd::model::<Demo>().eq("id", 7i64);
        let rendered = render_find_one(&d, &cnd).unwrap();
        assert_eq!(rendered.sql, "SELECT `id`, `name` FROM `demo` WHERE `id` = ? LIMIT 1");
    }

    #[test]
    fn count_drops_order_and_pagination() {
        let d = descriptor();
        let cnd = Cnd::model::<Demo>().eq("name", "ann").offset(1, 10).orderby("name", twinstore_condition::Direction::Asc);
        let rendered = render_count(&d, &cnd, Dialect::MySql).unwrap();
        assert_eq!(rendered.sql, "SELECT COUNT(1) FROM `demo` WHERE `name` = ?");
    }

    #[test]
    fn exists_wraps_select_one_in_exists() {
        let d = descriptor();
        let cnd = Cnd::model::<Demo>().eq("id", 7i64);
        let rendered = render_exists(&d, &cnd).unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT EXISTS(SELECT 1 FROM `demo` WHERE `id` = ? LIMIT 1)"
        );
    }
}
