//! Root facade: the single entry point an embedding application depends on.
//! Wires the model registry (C1), the two backing-store session layers
//! (C8 RDB, C9 Mongo), and the cross-store replicator (C10) together behind
//! `register_model`/`init_sql`/`init_doc`/`new_sql_session`/`new_doc_session`.

use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};

use twinstore_common::err::{CoreError, CoreResult};
use twinstore_common::id::{IdGenerator, SnowflakeIdGenerator};

pub use twinstore_common::config::{DocSourceConfig, SqlSourceConfig};
pub use twinstore_condition::{
    AggFunc, Aggregate, Cnd, Direction, FromClause, JoinClause, JoinKind, Logic, Pagination, Predicate,
};
pub use twinstore_doc::{DocDataSourceRegistry, DocReplicationSink, DocSession, DocSessionOptions};
pub use twinstore_model::{register_model, FieldDescriptor, FieldKind, Model, PrimaryKeyDescriptor, PrimaryKeyKind, RecordDescriptor, Value};
pub use twinstore_rdb::{DataSourceRegistry, RdbSession, SessionOptions};

static RDB_REGISTRY: Lazy<DataSourceRegistry> = Lazy::new(DataSourceRegistry::new);
static DOC_REGISTRY: Lazy<Arc<DocDataSourceRegistry>> = Lazy::new(|| Arc::new(DocDataSourceRegistry::new()));
static ID_GEN: Lazy<Arc<dyn IdGenerator>> = Lazy::new(|| Arc::new(SnowflakeIdGenerator::default()));
static REPLICATOR: OnceCell<Arc<dyn twinstore_condition::ReplicationSink>> = OnceCell::new();

/// Registers every configured MySQL data source. Call once at startup,
/// before opening any SQL session.
pub fn init_sql(configs: Vec<SqlSourceConfig>) -> CoreResult<()> {
    if configs.is_empty() {
        return Err(CoreError::ConfigError("init_sql called with an empty config list".to_string()));
    }
    for config in configs {
        RDB_REGISTRY.register(config)?;
    }
    Ok(())
}

/// Registers every configured Mongo data source and, on first success,
/// installs the process-wide [`DocReplicationSink`] that RDB sessions with
/// `mongo_sync = true` replay their deferred mutations against. The sink
/// always targets the first config in `configs`: a deployment mirroring to
/// more than one document store is out of scope for C10 (spec §4.8 describes
/// a single replay destination).
pub async fn init_doc(configs: Vec<DocSourceConfig>) -> CoreResult<()> {
    if configs.is_empty() {
        return Err(CoreError::ConfigError("init_doc called with an empty config list".to_string()));
    }
    let primary_ds_name = configs[0].ds_name.clone();
    for config in configs {
        DOC_REGISTRY.register(config).await?;
    }
    let _ = REPLICATOR.set(Arc::new(DocReplicationSink::new(DOC_REGISTRY.clone(), primary_ds_name)));
    Ok(())
}

/// Opens a fresh RDB session. A session with `options.mongo_sync = true`
/// replays its deferred cross-store mutations at `close()` against whatever
/// sink `init_doc` installed; with no `init_doc` call, those mutations are
/// simply dropped there (see [`twinstore_rdb::open_session`]).
pub async fn new_sql_session(options: Option<SessionOptions>) -> CoreResult<RdbSession> {
    let options = options.unwrap_or_default();
    twinstore_rdb::open_session(&RDB_REGISTRY, options, ID_GEN.clone(), REPLICATOR.get().cloned()).await
}

/// Opens a fresh Mongo session.
pub async fn new_doc_session(options: Option<DocSessionOptions>) -> CoreResult<DocSession> {
    let options = options.unwrap_or_default();
    twinstore_doc::open_session(&DOC_REGISTRY, options, ID_GEN.clone()).await
}
