use bson::{doc, Bson, Document};

use twinstore_common::err::{CoreError, CoreResult};
use twinstore_condition::{plan_fast_page, Cnd, Logic, Predicate};
use twinstore_model::value_to_bson;

/// Unlike the SQL builder, `id` is rewritten to `_id` unconditionally: a
/// document store has no separate physical-column identity for the builder
/// to need model context to resolve.
pub fn id_field_for(key: &str) -> &str {
    if key == "id" {
        "_id"
    } else {
        key
    }
}

fn missing_value(logic: Logic, key: &str) -> CoreError {
    CoreError::invalid_argument(format!("{logic:?} predicate on `{key}` carries no value"))
}

fn render_predicate(pred: &Predicate) -> CoreResult<Document> {
    match pred {
        Predicate::Cmp { key, logic, value, values } => {
            let k = id_field_for(key);
            let require = || value.as_ref().ok_or_else(|| missing_value(*logic, key));
            Ok(match logic {
                Logic::Eq => doc! { k: value_to_bson(require()?) },
                Logic::Neq => doc! { k: { "$ne": value_to_bson(require()?) } },
                Logic::Lt => doc! { k: { "$lt": value_to_bson(require()?) } },
                Logic::Lte => doc! { k: { "$lte": value_to_bson(require()?) } },
                Logic::Gt => doc! { k: { "$gt": value_to_bson(require()?) } },
                Logic::Gte => doc! { k: { "$gte": value_to_bson(require()?) } },
                Logic::IsNull => doc! { k: Bson::Null },
                Logic::IsNotNull => doc! { k: { "$ne": Bson::Null } },
                Logic::Between => doc! { k: { "$gte": value_to_bson(&values[0]), "$lte": value_to_bson(&values[1]) } },
                Logic::NotBetween => {
                    doc! { k: { "$not": { "$gte": value_to_bson(&values[0]), "$lte": value_to_bson(&values[1]) } } }
                }
                Logic::In => {
                    let arr: Vec<Bson> = values.iter().map(value_to_bson).collect();
                    doc! { k: { "$in": arr } }
                }
                Logic::NotIn => {
                    let arr: Vec<Bson> = values.iter().map(value_to_bson).collect();
                    doc! { k: { "$nin": arr } }
                }
                Logic::Like => {
                    let v = require()?.to_display_string();
                    doc! { k: { "$regex": v, "$options": "i" } }
                }
                Logic::NotLike => {
                    let v = require()?.to_display_string();
                    doc! { k: { "$not": { "$regex": v, "$options": "i" } } }
                }
            })
        }
        Predicate::Or(branches) => {
            let mut subs = Vec::with_capacity(branches.len());
            for b in branches {
                subs.push(Bson::Document(render_filter(b)?));
            }
            Ok(doc! { "$or": subs })
        }
    }
}

/// Renders every predicate in `cnd.conditions` plus the fast-page sentinel
/// predicate into one filter document. Multiple predicates are combined
/// under `$and` so that two conditions on the same field (e.g. two `$lt`
/// bounds) never silently overwrite each other the way top-level key merge
/// would.
pub fn render_filter(cnd: &Cnd) -> CoreResult<Document> {
    let mut frags: Vec<Document> = Vec::with_capacity(cnd.conditions.len());
    for p in &cnd.conditions {
        frags.push(render_predicate(p)?);
    }

    if let Some(plan) = plan_fast_page(&cnd.pagination) {
        if let Some(extra) = plan.extra_predicate {
            frags.push(render_predicate(&extra)?);
        }
    }

    Ok(match frags.len() {
        0 => Document::new(),
        1 => frags.into_iter().next().expect("len checked above"),
        _ => {
            let arr: Vec<Bson> = frags.into_iter().map(Bson::Document).collect();
            doc! { "$and": arr }
        }
    })
}

/// Renders the sort document, accounting for the fast-page protocol's
/// sentinel-driven direction flip, which takes precedence over any explicit
/// `orderbys` the same way it does in the SQL builder.
pub fn render_sort(cnd: &Cnd) -> Option<Document> {
    if let Some(plan) = plan_fast_page(&cnd.pagination) {
        if let Some(key) = &cnd.pagination.fast_page_key {
            let dir = if plan.effective_sort == twinstore_condition::Direction::Asc { 1 } else { -1 };
            return Some(doc! { id_field_for(key): dir });
        }
    }

    if cnd.orderbys.is_empty() {
        return None;
    }
    let mut sort = Document::new();
    for (k, d) in &cnd.orderbys {
        let dir = if *d == twinstore_condition::Direction::Asc { 1 } else { -1 };
        sort.insert(id_field_for(k), dir);
    }
    Some(sort)
}

#[cfg(test)]
mod tests {
    use super::*;
    use twinstore_model::Value;

    #[test]
    fn eq_renders_plain_key_value() {
        let cnd = Cnd::new().eq("status", 1i64);
        let filter = render_filter(&cnd).unwrap();
        assert_eq!(filter, doc! { "status": 1i64 });
    }

    #[test]
    fn id_is_always_rewritten_to_underscore_id() {
        let cnd = Cnd::new().eq("id", 7i64);
        let filter = render_filter(&cnd).unwrap();
        assert_eq!(filter, doc! { "_id": 7i64 });
    }

    #[test]
    fn multiple_conditions_combine_under_and() {
        let cnd = Cnd::new().eq("status", 1i64).gt("age", 18i64);
        let filter = render_filter(&cnd).unwrap();
        assert_eq!(
            filter,
            doc! { "$and": [ { "status": 1i64 }, { "age": { "$gt": 18i64 } } ] }
        );
    }

    #[test]
    fn or_nests_recursively() {
        let cnd = Cnd::new().or(vec![Cnd::new().eq("a", 1i64), Cnd::new().eq("b", 2i64)]);
        let filter = render_filter(&cnd).unwrap();
        assert_eq!(filter, doc! { "$or": [ { "a": 1i64 }, { "b": 2i64 } ] });
    }

    #[test]
    fn in_list_renders_in_operator() {
        let cnd = Cnd::new().in_list("id", vec![Value::I64(1), Value::I64(2)]);
        let filter = render_filter(&cnd).unwrap();
        assert_eq!(filter, doc! { "_id": { "$in": [1i64, 2i64] } });
    }

    #[test]
    fn sort_document_reflects_direction() {
        let cnd = Cnd::new().orderby("name", twinstore_condition::Direction::Desc);
        let sort = render_sort(&cnd).unwrap();
        assert_eq!(sort, doc! { "name": -1 });
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
        let err = render_filter(&cnd).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }
}
