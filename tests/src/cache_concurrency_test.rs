//! Scenario from spec §8: N concurrent lookups for the same key race through
//! `get_or_prepare` and all land on the same underlying handle, with
//! `prepare` invoked exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use twinstore_cache::StatementCache;

#[tokio::test]
async fn concurrent_lookups_share_one_prepared_handle() {
    let cache = Arc::new(StatementCache::<u32>::new());
    let prepare_calls = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let cache = cache.clone();
        let prepare_calls = prepare_calls.clone();
        tasks.push(tokio::spawn(async move {
            cache
                .get_or_prepare(
                    "master",
                    "app_db",
                    "SELECT 1",
                    || {
                        let prepare_calls = prepare_calls.clone();
                        async move {
                            prepare_calls.fetch_add(1, Ordering::SeqCst);
                            Ok(42u32)
                        }
                    },
                    |_| {},
                )
                .await
        }));
    }

    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.unwrap().unwrap());
    }

    assert!(handles.iter().all(|h| h.handle == 42));
    assert_eq!(prepare_calls.load(Ordering::SeqCst), 1, "prepare must run exactly once across all racers");

    for h in &handles {
        cache.release(h.key);
    }

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 31);
}
