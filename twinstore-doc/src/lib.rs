//! Document-store session coordinator (C9): owns the Mongo data-source
//! registry and the per-session CRUD surface built on [`twinstore_mongo`].
//! Also hosts [`DocReplicationSink`], the concrete destination the RDB
//! side's cross-store replicator (C10) plays deferred mutations back
//! against.

mod options;
mod pool;
mod replicator;
mod session;

use std::sync::Arc;

use twinstore_common::err::CoreResult;
use twinstore_common::id::IdGenerator;

pub use options::DocSessionOptions;
pub use pool::{DocDataSource, DocDataSourceRegistry};
pub use replicator::DocReplicationSink;
pub use session::DocSession;

/// Opens a fresh [`DocSession`] against `options.ds_name`. There is no
/// pooled-connection handoff the way `twinstore_rdb::open_session` does one:
/// a `mongodb::Client` is already an internally pooled, freely cloneable
/// handle, so "opening a session" here only resolves the target database.
pub async fn open_session(
    registry: &DocDataSourceRegistry,
    options: DocSessionOptions,
    id_gen: Arc<dyn IdGenerator>,
) -> CoreResult<DocSession> {
    let database = match &options.database {
        Some(db) => registry.client(&options.ds_name)?.database(db),
        None => registry.database(&options.ds_name)?,
    };
    Ok(DocSession::new(database, options, id_gen))
}
