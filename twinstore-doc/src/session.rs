use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bson::{doc, Bson, Document};
use futures::stream::TryStreamExt;
use mongodb::options::{CountOptions, FindOneOptions, FindOptions, InsertManyOptions};
use mongodb::{ClientSession, Collection, Database};
use tracing::warn;

use twinstore_common::err::error::ErrorContext;
use twinstore_common::err::{CoreError, CoreResult};
use twinstore_common::id::IdGenerator;
use twinstore_common::time_util::to_duration_pretty;
use twinstore_condition::Cnd;
use twinstore_model::{bson_to_raw, value_to_bson, Model, PrimaryKeyDescriptor, PrimaryKeyKind, RecordDescriptor, Value};
use twinstore_mongo::{plan_page, render_filter, render_insert_doc, render_projection, render_replace_doc, render_set_doc, render_sort};

use crate::options::DocSessionOptions;

/// Awaits `$plain` when no transaction is attached, `$with_session` (which
/// receives `$session` bound to the live `ClientSession`) otherwise. Both
/// arms are timed and deadline-bounded by `options.timeout_ms`, and a
/// failure of either kind is both recorded on the session and returned.
macro_rules! run_driver {
    ($self:ident, $op:expr, $plain:expr, $session:ident => $with_session:expr) => {{
        let timeout_ms = $self.options.timeout_ms;
        let start = Instant::now();
        let outcome = tokio::time::timeout(Duration::from_millis(timeout_ms), async {
            match $self.tx.as_mut() {
                Some($session) => $with_session.await,
                None => $plain.await,
            }
        })
        .await;

        if start.elapsed().as_millis() as u64 > timeout_ms / 2 {
            warn!(op = $op, elapsed = %to_duration_pretty(&start.elapsed()), "slow doc query");
        }

        match outcome {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => {
                $self.record_error($op, &e);
                Err(CoreError::DriverError(ErrorContext::new($op).cause(e)))
            }
            Err(_) => {
                let err = CoreError::Timeout(ErrorContext::new($op));
                $self.record_error($op, &err);
                Err(err)
            }
        }
    }};
}

/// An open Mongo session: a resolved default database, an optional attached
/// transaction (`tx`), and the accumulated error list `use_transaction`
/// consults when deciding to commit or abort.
pub struct DocSession {
    database: Database,
    options: DocSessionOptions,
    id_gen: Arc<dyn IdGenerator>,
    tx: Option<ClientSession>,
    errors: Vec<CoreError>,
}

impl DocSession {
    pub fn new(database: Database, options: DocSessionOptions, id_gen: Arc<dyn IdGenerator>) -> Self {
        DocSession {
            database,
            options,
            id_gen,
            tx: None,
            errors: Vec::new(),
        }
    }

    fn collection(&self, table_name: &str) -> Collection<Document> {
        self.database.collection::<Document>(table_name)
    }

    fn record_error(&mut self, op: &str, err: &impl std::fmt::Display) {
        self.errors.push(CoreError::DriverError(ErrorContext::new(op).cause(err.to_string())));
    }

    /// Generates and writes back a primary key when the in-memory value is
    /// still zero, covering all three primary-key kinds (spec §4.7): a
    /// document-id key gets a client-generated `ObjectId` rather than
    /// leaving `_id` absent, so the caller can read the assigned id back
    /// immediately after `save` returns.
    fn assign_doc_id<T: Model>(&self, descriptor: &RecordDescriptor<T>, record: &mut T) {
        if !descriptor.primary_key.is_zero(record) {
            return;
        }
        match descriptor.primary_key.kind {
            PrimaryKeyKind::Int64 => descriptor.primary_key.write_i64(record, self.id_gen.next_i64()),
            PrimaryKeyKind::String => descriptor.primary_key.write_string(record, self.id_gen.next_string()),
            PrimaryKeyKind::DocumentId => {
                descriptor.primary_key.write_string(record, bson::oid::ObjectId::new().to_hex())
            }
        }
    }

    fn write_primary_key<T>(pk: &PrimaryKeyDescriptor<T>, record: &mut T, value: &Bson) -> CoreResult<()> {
        match pk.kind {
            PrimaryKeyKind::Int64 => {
                let v = value.as_i64().or_else(|| value.as_i32().map(i64::from)).ok_or_else(|| {
                    CoreError::DecodeError(ErrorContext::new("decode_pk").cause("expected integer _id"))
                })?;
                pk.write_i64(record, v);
            }
            PrimaryKeyKind::String => {
                let v = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
                pk.write_string(record, v);
            }
            PrimaryKeyKind::DocumentId => {
                let v = match value {
                    Bson::ObjectId(oid) => oid.to_hex(),
                    other => other.to_string(),
                };
                pk.write_string(record, v);
            }
        }
        Ok(())
    }

    fn decode_doc<T: Model>(descriptor: &RecordDescriptor<T>, doc: Document) -> CoreResult<T> {
        let mut record = descriptor.new_one();
        for (key, value) in doc.iter() {
            if key == "_id" {
                Self::write_primary_key(&descriptor.primary_key, &mut record, value)?;
                continue;
            }
            let Some(field) = descriptor.field_by_wire_doc(key) else {
                continue;
            };
            field.write(&mut record, &bson_to_raw(value))?;
        }
        Ok(record)
    }

    pub async fn find_by_id<T: Model>(&mut self, id: impl Into<Value>) -> CoreResult<Option<T>> {
        let cnd = Cnd::model::<T>().eq("id", id);
        self.find_one(&cnd).await
    }

    pub async fn find_one<T: Model>(&mut self, cnd: &Cnd) -> CoreResult<Option<T>> {
        let descriptor = T::descriptor();
        let coll = self.collection(descriptor.table_name);
        let filter = render_filter(cnd)?;
        let mut opts = FindOneOptions::default();
        opts.sort = render_sort(cnd);
        opts.projection = render_projection(cnd);

        let doc = run_driver!(
            self,
            "find_one",
            coll.find_one(filter.clone(), opts.clone()),
            s => coll.find_one_with_session(filter, opts, s)
        )?;
        doc.map(|d| Self::decode_doc(&descriptor, d)).transpose()
    }

    /// Identical to [`Self::find_one`]; a `Cnd` already carries every join
    /// projection would need, just as on the RDB side.
    pub async fn find_one_complex<T: Model>(&mut self, cnd: &Cnd) -> CoreResult<Option<T>> {
        self.find_one(cnd).await
    }

    pub async fn find_list<T: Model>(&mut self, cnd: &mut Cnd) -> CoreResult<Vec<T>> {
        let descriptor = T::descriptor();
        let coll = self.collection(descriptor.table_name);
        let filter = render_filter(cnd)?;

        if cnd.pagination.is_page && !cnd.pagination.is_offset {
            let total = run_driver!(
                self,
                "count",
                coll.count_documents(filter.clone(), None),
                s => coll.count_documents_with_session(filter.clone(), None, s)
            )?;
            cnd.pagination.page_total = total;
            cnd.pagination.recompute_page_count();
        }

        let plan = plan_page(cnd);
        let mut opts = FindOptions::default();
        opts.sort = render_sort(cnd);
        opts.projection = render_projection(cnd);
        opts.skip = plan.skip;
        opts.limit = plan.limit;

        let mut out = Vec::new();
        match self.tx.as_mut() {
            Some(session) => {
                let mut cursor = coll
                    .find_with_session(filter, opts, session)
                    .await
                    .map_err(|e| CoreError::DriverError(ErrorContext::new("find_list").cause(e)))?;
                while let Some(doc) = cursor
                    .next(session)
                    .await
                    .transpose()
                    .map_err(|e| CoreError::DriverError(ErrorContext::new("find_list").cause(e)))?
                {
                    descriptor.append_one(&mut out, Self::decode_doc(&descriptor, doc)?);
                }
            }
            None => {
                let mut cursor = coll
                    .find(filter, opts)
                    .await
                    .map_err(|e| CoreError::DriverError(ErrorContext::new("find_list").cause(e)))?;
                while let Some(doc) = cursor
                    .try_next()
                    .await
                    .map_err(|e| CoreError::DriverError(ErrorContext::new("find_list").cause(e)))?
                {
                    descriptor.append_one(&mut out, Self::decode_doc(&descriptor, doc)?);
                }
            }
        }
        Ok(out)
    }

    /// Identical to [`Self::find_list`]; see [`Self::find_one_complex`].
    pub async fn find_list_complex<T: Model>(&mut self, cnd: &mut Cnd) -> CoreResult<Vec<T>> {
        self.find_list(cnd).await
    }

    /// Prefers `estimatedDocumentCount` when `cnd` renders no filter,
    /// `countDocuments` otherwise (spec §4.7).
    pub async fn count<T: Model>(&mut self, cnd: &Cnd) -> CoreResult<u64> {
        let descriptor = T::descriptor();
        let coll = self.collection(descriptor.table_name);
        let filter = render_filter(cnd)?;

        if filter.is_empty() {
            // `estimatedDocumentCount` has no session-scoped driver variant,
            // since it reads collection metadata rather than running a
            // query; inside a transaction fall back to an unfiltered
            // `countDocuments` so the count still observes the transaction.
            run_driver!(
                self,
                "count",
                coll.estimated_document_count(None),
                s => coll.count_documents_with_session(Document::new(), None, s)
            )
        } else {
            run_driver!(
                self,
                "count",
                coll.count_documents(filter.clone(), None),
                s => coll.count_documents_with_session(filter, None, s)
            )
        }
    }

    pub async fn exists<T: Model>(&mut self, cnd: &Cnd) -> CoreResult<bool> {
        let descriptor = T::descriptor();
        let coll = self.collection(descriptor.table_name);
        let filter = render_filter(cnd)?;
        let mut opts = CountOptions::default();
        opts.limit = Some(1);
        let n: u64 = run_driver!(
            self,
            "exists",
            coll.count_documents(filter.clone(), opts.clone()),
            s => coll.count_documents_with_session(filter, opts, s)
        )?;
        Ok(n > 0)
    }

    pub async fn save<T: Model>(&mut self, record: &mut T) -> CoreResult<()> {
        let descriptor = T::descriptor();
        self.assign_doc_id(&descriptor, record);
        let doc = render_insert_doc(&descriptor, record);
        let coll = self.collection(descriptor.table_name);
        run_driver!(
            self,
            "save",
            coll.insert_one(doc.clone(), None),
            s => coll.insert_one_with_session(doc, None, s)
        )?;
        Ok(())
    }

    /// Batches every record into one `insertMany` with `ordered=false`
    /// (spec §4.7): one malformed document never blocks the rest from
    /// landing.
    pub async fn save_batch<T: Model>(&mut self, records: &mut [T]) -> CoreResult<()> {
        let descriptor = T::descriptor();
        for record in records.iter_mut() {
            self.assign_doc_id(&descriptor, record);
        }
        let docs: Vec<Document> = records.iter().map(|r| render_insert_doc(&descriptor, r)).collect();
        let coll = self.collection(descriptor.table_name);
        let mut opts = InsertManyOptions::default();
        opts.ordered = Some(false);
        run_driver!(
            self,
            "save_batch",
            coll.insert_many(docs.clone(), opts.clone()),
            s => coll.insert_many_with_session(docs, opts, s)
        )?;
        Ok(())
    }

    pub async fn update_by_record<T: Model>(&mut self, record: &T) -> CoreResult<u64> {
        let descriptor = T::descriptor();
        let coll = self.collection(descriptor.table_name);
        let filter = doc! { "_id": value_to_bson(&descriptor.primary_key.read(record)) };
        let replacement = render_replace_doc(&descriptor, record);

        let result = run_driver!(
            self,
            "update_by_record",
            coll.replace_one(filter.clone(), replacement.clone(), None),
            s => coll.replace_one_with_session(filter, replacement, None, s)
        )?;

        if result.matched_count == 0 {
            warn!(table = descriptor.table_name, "update_by_record matched zero documents");
        }
        Ok(result.modified_count)
    }

    pub async fn update_by_condition<T: Model>(&mut self, cnd: &Cnd) -> CoreResult<u64> {
        let descriptor = T::descriptor();
        let coll = self.collection(descriptor.table_name);
        let filter = render_filter(cnd)?;
        let update = render_set_doc(cnd, descriptor.primary_key.name);

        let result = run_driver!(
            self,
            "update_by_condition",
            coll.update_many(filter.clone(), update.clone(), None),
            s => coll.update_many_with_session(filter, update, None, s)
        )?;

        if result.modified_count == 0 {
            warn!(table = descriptor.table_name, "update_by_condition matched zero documents");
        }
        Ok(result.modified_count)
    }

    pub async fn delete_by_record<T: Model>(&mut self, record: &T) -> CoreResult<u64> {
        let descriptor = T::descriptor();
        let coll = self.collection(descriptor.table_name);
        let filter = doc! { "_id": value_to_bson(&descriptor.primary_key.read(record)) };

        let result = run_driver!(
            self,
            "delete_by_record",
            coll.delete_one(filter.clone(), None),
            s => coll.delete_one_with_session(filter, None, s)
        )?;
        Ok(result.deleted_count)
    }

    pub async fn delete_by_id<T: Model>(&mut self, id: impl Into<Value>) -> CoreResult<u64> {
        let descriptor = T::descriptor();
        let coll = self.collection(descriptor.table_name);
        let filter = doc! { "_id": value_to_bson(&id.into()) };

        let result = run_driver!(
            self,
            "delete_by_id",
            coll.delete_one(filter.clone(), None),
            s => coll.delete_one_with_session(filter, None, s)
        )?;
        Ok(result.deleted_count)
    }

    pub async fn delete_by_ids<T: Model>(&mut self, ids: &[Value]) -> CoreResult<u64> {
        let cnd = Cnd::model::<T>().in_list("id", ids.to_vec());
        self.delete_by_condition::<T>(&cnd).await
    }

    pub async fn delete_by_condition<T: Model>(&mut self, cnd: &Cnd) -> CoreResult<u64> {
        let descriptor = T::descriptor();
        let coll = self.collection(descriptor.table_name);
        let filter = render_filter(cnd)?;

        let result = run_driver!(
            self,
            "delete_by_condition",
            coll.delete_many(filter.clone(), None),
            s => coll.delete_many_with_session(filter, None, s)
        )?;
        Ok(result.deleted_count)
    }

    /// Opens a replica-set transaction, attaches it to `self` for the
    /// duration of `f`, and commits on success / aborts on any error `f`
    /// returns — including an error surfaced by a CRUD primitive `f` calls
    /// against `self` (spec §4.7). Every CRUD method already threads the
    /// session-scoped context through whichever driver call it issues once
    /// `self.tx` is set, so `f` needs no separate transactional handle.
    pub async fn use_transaction<F, Fut, R>(&mut self, f: F) -> CoreResult<R>
    where
        F: FnOnce(&mut DocSession) -> Fut,
        Fut: Future<Output = CoreResult<R>>,
    {
        let client = self.database.client().clone();
        let mut session = client
            .start_session(None)
            .await
            .map_err(|e| CoreError::TransactionError(ErrorContext::new("start_session").cause(e)))?;
        session
            .start_transaction(None)
            .await
            .map_err(|e| CoreError::TransactionError(ErrorContext::new("start_transaction").cause(e)))?;

        self.tx = Some(session);
        let result = f(self).await;
        let mut session = self.tx.take().expect("use_transaction always sets self.tx before calling f");

        match result {
            Ok(value) => {
                session
                    .commit_transaction()
                    .await
                    .map_err(|e| CoreError::TransactionError(ErrorContext::new("commit_transaction").cause(e)))?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    warn!(error = %abort_err, "abort_transaction failed after use_transaction body errored");
                }
                Err(e)
            }
        }
    }

    /// Mongo sessions have no pinned connection or pending commit to
    /// release outside of an explicit [`Self::use_transaction`] call, so
    /// `close` surfaces whatever was recorded along the way rather than
    /// performing any driver work of its own.
    pub async fn close(self) -> CoreResult<()> {
        if let Some(first) = self.errors.into_iter().next() {
            return Err(first);
        }
        Ok(())
    }
}
