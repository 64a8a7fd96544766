//! Scenario from spec §8: batched INSERT/DELETE rendering rejects payloads
//! over the 2000-row cap rather than silently truncating or splitting them.

use twinstore_model::Value;
use twinstore_sql::{render_delete_by_ids, render_insert, MAX_BATCH_SIZE};

use crate::fixtures::User;

#[test]
fn insert_rejects_batches_over_the_cap() {
    let descriptor = User::descriptor();
    let records: Vec<User> = (0..MAX_BATCH_SIZE + 1)
        .map(|i| User { id: i as i64 + 1, name: format!("u{i}"), email: format!("u{i}@example.com") })
        .collect();

    let err = render_insert(&descriptor, &records, true, false).unwrap_err();
    assert!(matches!(err, twinstore_common::err::CoreError::InvalidArgument(_)));
}

#[test]
fn insert_accepts_a_batch_at_exactly_the_cap() {
    let descriptor = User::descriptor();
    let records: Vec<User> = (0..MAX_BATCH_SIZE)
        .map(|i| User { id: i as i64 + 1, name: format!("u{i}"), email: format!("u{i}@example.com") })
        .collect();

    let rendered = render_insert(&descriptor, &records, true, false).unwrap();
    assert_eq!(rendered.args.len(), MAX_BATCH_SIZE * 3);
}

#[test]
fn delete_by_ids_rejects_batches_over_the_cap() {
    let descriptor = User::descriptor();
    let ids: Vec<Value> = (0..MAX_BATCH_SIZE + 1).map(|i| Value::I64(i as i64 + 1)).collect();

    let err = render_delete_by_ids(&descriptor, &ids, true).unwrap_err();
    assert!(matches!(err, twinstore_common::err::CoreError::InvalidArgument(_)));
}
