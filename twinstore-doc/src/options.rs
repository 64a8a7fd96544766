use twinstore_common::hash::fnv64;
use twinstore_common::CacheKeyed;

/// The recognized document-session option controls. Mirrors
/// `twinstore_rdb::SessionOptions` in shape; `timeout_ms` defaults higher
/// since a Mongo round trip (including server selection) tends to run
/// longer than a MySQL one.
#[derive(Debug, Clone, PartialEq)]
pub struct DocSessionOptions {
    pub ds_name: String,
    pub database: Option<String>,
    pub timeout_ms: u64,
}

impl Default for DocSessionOptions {
    fn default() -> Self {
        DocSessionOptions {
            ds_name: "master".to_string(),
            database: None,
            timeout_ms: 60_000,
        }
    }
}

impl DocSessionOptions {
    pub fn cache_key(&self) -> u64 {
        fnv64(&[
            &self.ds_name,
            self.database.as_deref().unwrap_or(""),
            &self.timeout_ms.to_string(),
        ])
    }
}

impl CacheKeyed for DocSessionOptions {
    fn cache_key(&self) -> u64 {
        DocSessionOptions::cache_key(self)
    }
}
