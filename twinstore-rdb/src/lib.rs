//! Relational session coordinator (C8): owns the MySQL data-source registry
//! and the per-session CRUD surface built on [`twinstore_sql`] and
//! [`twinstore_condition`].

mod options;
mod pool;
mod session;
mod value_conv;

use std::sync::Arc;

use twinstore_common::err::CoreResult;
use twinstore_common::id::IdGenerator;
use twinstore_condition::ReplicationSink;

pub use options::SessionOptions;
pub use pool::{DataSource, DataSourceRegistry};
pub use twinstore_common::OptionCache;
pub use session::RdbSession;
pub use value_conv::{column_to_raw, value_to_bind, values_to_params};

/// Opens a fresh [`RdbSession`] against `options.ds_name`. A transactional
/// session (`options.open_tx`) always gets its own connection; the caller
/// decides whether non-transactional sessions are reused, since a live
/// session requires exclusive (`&mut`) access and cannot be shared the way
/// [`OptionCache`] shares plain `Clone` values.
///
/// `replicator` is `None` when the embedding application never called
/// `init_doc`; a session with `mongo_sync` set but no replicator simply
/// drops its deferred entries at close, since there is nowhere to play them
/// back.
pub async fn open_session(
    registry: &DataSourceRegistry,
    options: SessionOptions,
    id_gen: Arc<dyn IdGenerator>,
    replicator: Option<Arc<dyn ReplicationSink>>,
) -> CoreResult<RdbSession> {
    let (pool, stmt_cache) = registry.get_with_cache(&options.ds_name)?;
    let database = match &options.database {
        Some(db) => db.clone(),
        None => registry.config_of(&options.ds_name)?.database,
    };
    RdbSession::open(&pool, stmt_cache, database, options, id_gen, replicator).await
}
