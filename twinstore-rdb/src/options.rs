use twinstore_common::hash::fnv64;
use twinstore_common::CacheKeyed;

/// The recognized session-option controls: which data source to use, which
/// schema to default to, whether to open a driver transaction, whether
/// primary keys are database-generated, whether mutations are mirrored to
/// the document store, and the per-call deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub ds_name: String,
    pub database: Option<String>,
    pub open_tx: bool,
    pub auto_id: bool,
    pub mongo_sync: bool,
    pub timeout_ms: u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            ds_name: "master".to_string(),
            database: None,
            open_tx: false,
            auto_id: false,
            mongo_sync: false,
            timeout_ms: 10_000,
        }
    }
}

impl SessionOptions {
    /// Hashes every field except `open_tx`, which always forks a fresh
    /// transaction and is therefore never cacheable.
    pub fn cache_key(&self) -> u64 {
        fnv64(&[
            &self.ds_name,
            self.database.as_deref().unwrap_or(""),
            if self.auto_id { "1" } else { "0" },
            if self.mongo_sync { "1" } else { "0" },
            &self.timeout_ms.to_string(),
        ])
    }
}

impl CacheKeyed for SessionOptions {
    fn cache_key(&self) -> u64 {
        debug_assert!(!self.open_tx, "transactional sessions are never cached");
        SessionOptions::cache_key(self)
    }
}
