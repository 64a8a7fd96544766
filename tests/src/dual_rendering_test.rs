//! Scenario from spec §8: the same `Cnd` tree renders into both a valid
//! MySQL statement (via `twinstore-sql`) and a valid Mongo filter (via
//! `twinstore-mongo`), agreeing on which predicates apply and in what order,
//! without either builder knowing the other exists.

use twinstore_condition::{Cnd, Direction};
use twinstore_mongo::{render_filter, render_sort};
use twinstore_sql::{render_find_list, Dialect};

use crate::fixtures::User;

fn sample_cnd() -> Cnd {
    Cnd::model::<User>()
        .eq("name", "ada")
        .gt("id", 100i64)
        .orderby("id", Direction::Desc)
        .offset(1, 20)
}

#[test]
fn sql_and_mongo_agree_on_predicate_count() {
    let cnd = sample_cnd();
    let descriptor = User::descriptor();

    let rendered = render_find_list(&descriptor, &cnd, Dialect::MySql).unwrap();
    assert!(rendered.sql.contains("WHERE"));
    assert!(rendered.sql.contains("`name` = ?"));
    assert!(rendered.sql.contains("`id` > ?"));
    assert!(rendered.sql.contains("ORDER BY `id` DESC"));
    assert!(rendered.sql.contains("LIMIT 0,20"));
    assert_eq!(rendered.args.len(), 2);

    let filter = render_filter(&cnd).unwrap();
    assert_eq!(filter.get_array("$and").unwrap().len(), 2);
    let sort = render_sort(&cnd).unwrap();
    assert_eq!(sort.get_i32("id").unwrap(), -1);
}

#[test]
fn id_rewrites_to_each_store_own_key_column() {
    // `id` is a logical name; SQL rewrites it to the physical PK column
    // (here also "id"), Mongo always rewrites it to "_id" regardless.
    let cnd = Cnd::model::<User>().eq("id", 7i64);
    let descriptor = User::descriptor();

    let rendered = twinstore_sql::render_find_one(&descriptor, &cnd).unwrap();
    assert!(rendered.sql.contains("`id` = ?"));

    let filter = render_filter(&cnd).unwrap();
    assert!(filter.contains_key("_id"));
}
