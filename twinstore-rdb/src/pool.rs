use std::sync::Arc;

use dashmap::DashMap;
use mysql_async::{Opts, OptsBuilder, Pool, Statement};
use twinstore_common::config::sql_config::SqlSourceConfig;
use twinstore_common::err::{CoreError, CoreResult};

use twinstore_cache::StatementCache;

/// One configured MySQL data source: its connection pool plus the config it
/// was built from, kept around so a session can read timeouts/charset/etc.
///
/// `stmt_cache` is the C6 prepared-statement cache keyed by
/// `(ds_name, database, sql_text)`. A `mysql_async::Statement` is cheap to
/// clone and, per the driver's own contract, transparently re-prepares
/// itself on whichever pooled connection executes it next — this is what
/// lets many concurrent sessions, each holding a different physical
/// connection, share one cache entry the way spec scenario 4 expects.
pub struct DataSource {
    pub pool: Pool,
    pub config: SqlSourceConfig,
    pub stmt_cache: Arc<StatementCache<Statement>>,
}

/// Process-wide table of named MySQL data sources, populated by `init_sql`.
#[derive(Default)]
pub struct DataSourceRegistry {
    sources: DashMap<String, DataSource>,
}

impl DataSourceRegistry {
    pub fn new() -> Self {
        DataSourceRegistry::default()
    }

    pub fn register(&self, config: SqlSourceConfig) -> CoreResult<()> {
        let opts: Opts = OptsBuilder::default()
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port)
            .user(Some(config.username.clone()))
            .pass(Some(config.password.clone()))
            .db_name(Some(config.database.clone()))
            .pool_opts(
                mysql_async::PoolOpts::default()
                    .with_constraints(
                        mysql_async::PoolConstraints::new(config.max_idle_conns as usize, config.max_open_conns as usize)
                            .ok_or_else(|| CoreError::ConfigError("max_idle_conns must not exceed max_open_conns".into()))?,
                    ),
            )
            .into();
        let pool = Pool::new(opts);
        let ds_name = config.ds_name.clone();
        self.sources.insert(
            ds_name,
            DataSource {
                pool,
                config,
                stmt_cache: Arc::new(StatementCache::new()),
            },
        );
        Ok(())
    }

    pub fn get(&self, ds_name: &str) -> CoreResult<Pool> {
        self.sources
            .get(ds_name)
            .map(|e| e.pool.clone())
            .ok_or_else(|| CoreError::DataSourceNotFound(ds_name.to_string()))
    }

    /// Returns the pool plus its C6 statement cache together, since the
    /// session layer needs both to prepare through the cache and fall back
    /// to the pool for the cache's `close` callback.
    pub fn get_with_cache(&self, ds_name: &str) -> CoreResult<(Pool, Arc<StatementCache<Statement>>)> {
        self.sources
            .get(ds_name)
            .map(|e| (e.pool.clone(), e.stmt_cache.clone()))
            .ok_or_else(|| CoreError::DataSourceNotFound(ds_name.to_string()))
    }

    pub fn config_of(&self, ds_name: &str) -> CoreResult<SqlSourceConfig> {
        self.sources
            .get(ds_name)
            .map(|e| e.config.clone())
            .ok_or_else(|| CoreError::DataSourceNotFound(ds_name.to_string()))
    }

    pub async fn close_all(&self) {
        for entry in self.sources.iter() {
            entry.stmt_cache.shutdown().await;
            let _ = entry.pool.clone().disconnect().await;
        }
    }
}
