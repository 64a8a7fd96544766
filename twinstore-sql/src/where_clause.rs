use twinstore_common::err::{CoreError, CoreResult};
use twinstore_condition::{plan_fast_page, Cnd, Logic, Predicate};
use twinstore_model::Value;

/// `id` is only rewritten to the physical primary-key column when `cnd`
/// carries model context (built via `Cnd::model::<T>()`); a raw `Cnd::new()`
/// tree never gets the rewrite, even when a descriptor is available to the
/// caller.
pub fn pk_column_for<'a>(cnd: &Cnd, pk_name: &'a str) -> Option<&'a str> {
    if cnd.model_table.is_some() {
        Some(pk_name)
    } else {
        None
    }
}

fn quote(key: &str, escape: bool) -> String {
    if escape {
        format!("`{key}`")
    } else {
        key.to_string()
    }
}

/// `id` is rewritten to the physical primary-key column only when the tree
/// carries model context; in raw condition mode the key passes through
/// unchanged.
fn resolve_key<'a>(key: &'a str, pk_column: Option<&'a str>) -> &'a str {
    if key == "id" {
        pk_column.unwrap_or(key)
    } else {
        key
    }
}

fn missing_value(logic: Logic, key: &str) -> CoreError {
    CoreError::invalid_argument(format!("{logic:?} predicate on `{key}` carries no value"))
}

fn render_predicate(pred: &Predicate, pk_column: Option<&str>, escape: bool, out_args: &mut Vec<Value>) -> CoreResult<String> {
    match pred {
        Predicate::Cmp { key, logic, value, values } => {
            let k = quote(resolve_key(key, pk_column), escape);
            let require = |v: &Option<Value>| v.clone().ok_or_else(|| missing_value(*logic, key));
            Ok(match logic {
                Logic::Eq => {
                    out_args.push(require(value)?);
                    format!("{k} = ?")
                }
                Logic::Neq => {
                    out_args.push(require(value)?);
                    format!("{k} <> ?")
                }
                Logic::Lt => {
                    out_args.push(require(value)?);
                    format!("{k} < ?")
                }
                Logic::Lte => {
                    out_args.push(require(value)?);
                    format!("{k} <= ?")
                }
                Logic::Gt => {
                    out_args.push(require(value)?);
                    format!("{k} > ?")
                }
                Logic::Gte => {
                    out_args.push(require(value)?);
                    format!("{k} >= ?")
                }
                Logic::IsNull => format!("{k} IS NULL"),
                Logic::IsNotNull => format!("{k} IS NOT NULL"),
                Logic::Between => {
                    out_args.push(values[0].clone());
                    out_args.push(values[1].clone());
                    format!("{k} BETWEEN ? AND ?")
                }
                Logic::NotBetween => {
                    out_args.push(values[0].clone());
                    out_args.push(values[1].clone());
                    format!("{k} NOT BETWEEN ? AND ?")
                }
                Logic::In => {
                    let placeholders = vec!["?"; values.len()].join(",");
                    out_args.extend(values.iter().cloned());
                    format!("{k} IN ({placeholders})")
                }
                Logic::NotIn => {
                    let placeholders = vec!["?"; values.len()].join(",");
                    out_args.extend(values.iter().cloned());
                    format!("{k} NOT IN ({placeholders})")
                }
                Logic::Like => {
                    out_args.push(require(value)?);
                    format!("{k} LIKE CONCAT('%',?,'%')")
                }
                Logic::NotLike => {
                    out_args.push(require(value)?);
                    format!("{k} NOT LIKE CONCAT('%',?,'%')")
                }
            })
        }
        Predicate::Or(branches) => {
            let mut subs = Vec::with_capacity(branches.len());
            for branch in branches {
                let (frag, mut args) = render_conditions(branch, pk_column, escape)?;
                subs.push(frag);
                out_args.append(&mut args);
            }
            Ok(format!("({})", subs.join(" OR ")))
        }
    }
}

/// Renders every predicate in `cnd.conditions`, joined by ` AND`, plus the
/// extra fast-page sentinel predicate when pagination requests it. Returns
/// the empty string (no args) when there is nothing to render.
pub fn render_conditions(cnd: &Cnd, pk_column: Option<&str>, escape: bool) -> CoreResult<(String, Vec<Value>)> {
    let mut args = Vec::new();
    let mut frags: Vec<String> = Vec::with_capacity(cnd.conditions.len());
    for p in &cnd.conditions {
        frags.push(render_predicate(p, pk_column, escape, &mut args)?);
    }

    if let Some(plan) = plan_fast_page(&cnd.pagination) {
        if let Some(extra) = plan.extra_predicate {
            frags.push(render_predicate(&extra, pk_column, escape, &mut args)?);
        }
    }

    Ok((frags.join(" AND "), args))
}

/// Renders a full ` WHERE …` clause, or the empty string when `cnd` has no
/// predicates and no fast-page sentinel to add.
pub fn render_where(cnd: &Cnd, pk_column: Option<&str>, escape: bool) -> CoreResult<(String, Vec<Value>)> {
    let (frag, args) = render_conditions(cnd, pk_column, escape)?;
    if frag.is_empty() {
        Ok((String::new(), args))
    } else {
        Ok((format!(" WHERE {frag}"), args))
    }
}

pub fn render_order_by(cnd: &Cnd, escape: bool) -> String {
    // The fast-page protocol can flip the effective sort direction; when
    // active it takes precedence over any explicit `orderbys`.
    if let Some(plan) = plan_fast_page(&cnd.pagination) {
        if let Some(key) = &cnd.pagination.fast_page_key {
            let k = quote(key, escape);
            return format!(" ORDER BY {k} {}", plan.effective_sort.as_sql());
        }
    }

    if cnd.orderbys.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = cnd
        .orderbys
        .iter()
        .map(|(k, d)| format!("{} {}", quote(k, escape), d.as_sql()))
        .collect();
    format!(" ORDER BY {}", parts.join(", "))
}

pub fn render_group_by(cnd: &Cnd, escape: bool) -> String {
    if cnd.groupbys.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = cnd.groupbys.iter().map(|k| quote(k, escape)).collect();
    format!(" GROUP BY {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use twinstore_condition::Cnd;

    #[test]
    fn eq_and_neq_join_with_and_and_trim_trailer() {
        let cnd = Cnd::new().eq("status", 1i64).neq("kind", 2i64);
        let (where_sql, args) = render_where(&cnd, None, true).unwrap();
        assert_eq!(where_sql, " WHERE `status` = ? AND `kind` <> ?");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn escape_false_skips_backticks() {
        let cnd = Cnd::new().eq("status", 1i64);
        let (where_sql, _) = render_where(&cnd, None, false).unwrap();
        assert_eq!(where_sql, " WHERE status = ?");
    }

    #[test]
    fn id_rewritten_only_with_model_context() {
        let cnd = Cnd::new().eq("id", 7i64);
        let (with_ctx, _) = render_where(&cnd, Some("user_id"), true).unwrap();
        assert_eq!(with_ctx, " WHERE `user_id` = ?");

        let (raw, _) = render_where(&cnd, None, true).unwrap();
        assert_eq!(raw, " WHERE `id` = ?");
    }

    #[test]
    fn like_wraps_concat() {
        let cnd = Cnd::new().like("name", "ali");
        let (where_sql, args) = render_where(&cnd, None, true).unwrap();
        assert_eq!(where_sql, " WHERE `name` LIKE CONCAT('%',?,'%')");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn or_nests_recursively() {
        let cnd = Cnd::new().or(vec![
            Cnd::new().eq("a", 1i64),
            Cnd::new().eq("b", 2i64),
        ]);
        let (where_sql, args) = render_where(&cnd, None, true).unwrap();
        assert_eq!(where_sql, " WHERE (`a` = ? OR `b` = ?)");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn in_list_expands_placeholders() {
        let cnd = Cnd::new().in_list("id", vec![Value::I64(1), Value::I64(2), Value::I64(3)]);
        let (where_sql, args) = render_where(&cnd, None, true).unwrap();
        assert_eq!(where_sql, " WHERE `id` IN (?,?,?)");
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn comparison_predicate_with_no_value_is_a_core_error() {
        let mut cnd = Cnd::new();
        cnd.conditions.push(Predicate::Cmp {
            key: "status".to_string(),
            logic: Logic::Eq,
            value: None,
            values: Vec::new(),
        });
        let err = render_where(&cnd, None, true).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }
}
