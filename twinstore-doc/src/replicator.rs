use std::sync::Arc;

use async_trait::async_trait;
use bson::{doc, Document};
use mongodb::options::ReplaceOptions;

use twinstore_common::err::error::ErrorContext;
use twinstore_common::err::{CoreError, CoreResult};
use twinstore_condition::{ReplicationOp, ReplicationSink};
use twinstore_model::value_to_bson;
use twinstore_mongo::{render_filter, render_set_doc};

use crate::pool::DocDataSourceRegistry;

/// Replays deferred RDB mutations against one named Mongo data source.
/// `Save`/`UpdateByRecord` both resolve to an upserting `replaceOne`: the
/// RDB side has already decided a record exists (or was just inserted), so
/// the mirrored write only needs to converge the document to match, not
/// distinguish insert from update.
pub struct DocReplicationSink {
    registry: Arc<DocDataSourceRegistry>,
    ds_name: String,
}

impl DocReplicationSink {
    pub fn new(registry: Arc<DocDataSourceRegistry>, ds_name: impl Into<String>) -> Self {
        DocReplicationSink {
            registry,
            ds_name: ds_name.into(),
        }
    }

    fn collection(&self, name: &str) -> CoreResult<mongodb::Collection<Document>> {
        let database = self.registry.database(&self.ds_name)?;
        Ok(database.collection::<Document>(name))
    }
}

#[async_trait]
impl ReplicationSink for DocReplicationSink {
    async fn replay(&self, op: ReplicationOp) -> CoreResult<()> {
        match op {
            ReplicationOp::Save { collection, fields } | ReplicationOp::UpdateByRecord { collection, fields } => {
                let coll = self.collection(collection)?;
                let mut doc = Document::new();
                for (key, value) in &fields {
                    doc.insert(key, value_to_bson(value));
                }
                let id = doc.get("_id").cloned().ok_or_else(|| {
                    CoreError::ReplicationError(ErrorContext::new("replay").table(collection).cause("missing _id field"))
                })?;
                let filter = doc! { "_id": id };
                let mut opts = ReplaceOptions::default();
                opts.upsert = Some(true);
                coll.replace_one(filter, doc, opts)
                    .await
                    .map_err(|e| CoreError::ReplicationError(ErrorContext::new("replay").table(collection).cause(e)))?;
            }
            ReplicationOp::UpdateByCondition { collection, cnd } => {
                let coll = self.collection(collection)?;
                let filter = render_filter(&cnd)?;
                let update = render_set_doc(&cnd, "id");
                coll.update_many(filter, update, None)
                    .await
                    .map_err(|e| CoreError::ReplicationError(ErrorContext::new("replay").table(collection).cause(e)))?;
            }
            ReplicationOp::Delete { collection, cnd } => {
                let coll = self.collection(collection)?;
                let filter = render_filter(&cnd)?;
                coll.delete_many(filter, None)
                    .await
                    .map_err(|e| CoreError::ReplicationError(ErrorContext::new("replay").table(collection).cause(e)))?;
            }
        }
        Ok(())
    }
}
