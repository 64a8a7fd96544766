use async_trait::async_trait;

use twinstore_common::err::CoreResult;
use twinstore_model::Value;

use crate::cnd::Cnd;

/// One mutating RDB operation, captured in a form that carries no
/// reference to the originating record type — the cross-store replicator
/// (C10) plays these back against a document-store session after the RDB
/// session that produced them has already committed.
///
/// `fields` pairs use the field's document-side wire name, since the only
/// consumer is a Mongo session.
#[derive(Debug, Clone)]
pub enum ReplicationOp {
    Save {
        collection: &'static str,
        fields: Vec<(String, Value)>,
    },
    UpdateByRecord {
        collection: &'static str,
        fields: Vec<(String, Value)>,
    },
    UpdateByCondition {
        collection: &'static str,
        cnd: Cnd,
    },
    Delete {
        collection: &'static str,
        cnd: Cnd,
    },
}

/// Implemented by whatever owns a live document-store session. An RDB
/// session holds one of these as `Option<Arc<dyn ReplicationSink>>` and
/// calls `replay` best-effort at `close()` — a failure here is the
/// implementation's to log, never the already-committed RDB mutation's to
/// answer for (spec §4.8).
#[async_trait]
pub trait ReplicationSink: Send + Sync {
    async fn replay(&self, op: ReplicationOp) -> CoreResult<()>;
}
