use std::sync::Arc;
use std::time::{Duration, Instant as StdInstant};

use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Pool, Row, Statement, TxOpts};
use tracing::warn;

use twinstore_cache::StatementCache;
use twinstore_common::err::error::ErrorContext;
use twinstore_common::err::{CoreError, CoreResult};
use twinstore_common::id::IdGenerator;
use twinstore_common::time_util::to_duration_pretty;
use twinstore_condition::{Cnd, ReplicationOp, ReplicationSink};
use twinstore_model::{Model, PrimaryKeyKind, RecordDescriptor, Value};
use twinstore_sql::{
    render_count, render_delete_by_ids, render_delete_by_record, render_exists, render_find_list,
    render_find_one, render_insert, render_update_by_condition, render_update_by_record,
};

use crate::options::SessionOptions;
use crate::value_conv::{column_to_raw, values_to_params};

const MAX_DECODE_BATCH_LOG: usize = 3;

enum SessionConn {
    Pooled(Conn),
    Tx(mysql_async::Transaction<'static>),
}

impl SessionConn {
    /// Acquires a cached `Statement` for `sql` (pooled sessions only) and
    /// runs it, releasing the cache reference once the call completes. A
    /// transactional session prepares directly against its pinned
    /// connection every time instead: the transaction's connection is
    /// already fixed for the session's lifetime, so there is nothing to
    /// amortize by sharing it through the cross-session cache, and a tx's
    /// prepared statement must never outlive the tx itself.
    async fn exec_rows(
        &mut self,
        stmt_cache: Option<&StatementCacheHandle>,
        sql: &str,
        params: mysql_async::Params,
    ) -> CoreResult<Vec<Row>> {
        match self {
            SessionConn::Pooled(c) => match stmt_cache {
                Some(sc) => {
                    let stmt = sc.acquire(c, sql).await?;
                    let result = c
                        .exec(&stmt.handle, params)
                        .await
                        .map_err(|e| CoreError::DriverError(ErrorContext::new("exec").statement(sql).cause(e)));
                    sc.cache.release(stmt.key);
                    result
                }
                None => c
                    .exec(sql, params)
                    .await
                    .map_err(|e| CoreError::DriverError(ErrorContext::new("exec").statement(sql).cause(e))),
            },
            SessionConn::Tx(t) => t
                .exec(sql, params)
                .await
                .map_err(|e| CoreError::DriverError(ErrorContext::new("exec").statement(sql).cause(e))),
        }
    }

    async fn exec_write(
        &mut self,
        stmt_cache: Option<&StatementCacheHandle>,
        sql: &str,
        params: mysql_async::Params,
    ) -> CoreResult<(u64, Option<u64>)> {
        match self {
            SessionConn::Pooled(c) => {
                let outcome = match stmt_cache {
                    Some(sc) => {
                        let stmt = sc.acquire(c, sql).await?;
                        let result = c.exec_drop(&stmt.handle, params).await;
                        sc.cache.release(stmt.key);
                        result
                    }
                    None => c.exec_drop(sql, params).await,
                };
                outcome.map_err(|e| CoreError::DriverError(ErrorContext::new("exec_drop").statement(sql).cause(e)))?;
                Ok((c.affected_rows(), c.last_insert_id()))
            }
            SessionConn::Tx(t) => {
                t.exec_drop(sql, params)
                    .await
                    .map_err(|e| CoreError::DriverError(ErrorContext::new("exec_drop").statement(sql).cause(e)))?;
                Ok((t.affected_rows(), t.last_insert_id()))
            }
        }
    }
}

/// The C6 prepared-statement cache bound to one data source, plus the
/// coordinates (`ds_name`, `database`) needed to key lookups and the pool
/// needed so the cache's `close` callback can reach a live connection to
/// deallocate a statement on.
struct StatementCacheHandle {
    cache: Arc<StatementCache<Statement>>,
    pool: Pool,
    ds_name: String,
    database: String,
}

impl StatementCacheHandle {
    async fn acquire(&self, conn: &mut Conn, sql: &str) -> CoreResult<twinstore_cache::Handle<Statement>> {
        let pool = self.pool.clone();
        self.cache
            .get_or_prepare(
                &self.ds_name,
                &self.database,
                sql,
                || async {
                    conn.prep(sql)
                        .await
                        .map_err(|e| CoreError::DriverError(ErrorContext::new("prep").statement(sql).cause(e)))
                },
                move |stmt| {
                    let pool = pool.clone();
                    tokio::spawn(async move {
                        if let Ok(conn) = pool.get_conn().await {
                            if let Err(e) = conn.close(stmt).await {
                                tracing::debug!(error = %e, "best-effort statement close failed");
                            }
                        }
                    });
                },
            )
            .await
    }
}

/// An open MySQL session: one pooled connection (or one transaction),
/// carrying the option table it was opened with and the accumulated error
/// list that decides `close()`'s commit-vs-rollback outcome.
pub struct RdbSession {
    conn: SessionConn,
    stmt_cache: Option<StatementCacheHandle>,
    options: SessionOptions,
    id_gen: Arc<dyn IdGenerator>,
    errors: Vec<CoreError>,
    replicator: Option<Arc<dyn ReplicationSink>>,
    deferred: Vec<ReplicationOp>,
}

impl RdbSession {
    /// `database` is the schema the cache keys against — either the
    /// session option's override or the data source's default, resolved by
    /// the caller before this is invoked.
    pub async fn open(
        pool: &Pool,
        stmt_cache: Arc<StatementCache<Statement>>,
        database: String,
        options: SessionOptions,
        id_gen: Arc<dyn IdGenerator>,
        replicator: Option<Arc<dyn ReplicationSink>>,
    ) -> CoreResult<Self> {
        let conn = pool
            .get_conn()
            .await
            .map_err(|e| CoreError::DriverError(ErrorContext::new("get_conn").cause(e)))?;

        let ds_name = options.ds_name.clone();
        let (conn, stmt_cache) = if options.open_tx {
            let tx = conn
                .start_transaction(TxOpts::default())
                .await
                .map_err(|e| CoreError::TransactionError(ErrorContext::new("start_transaction").cause(e)))?;
            // A tx session never shares the cross-session cache: see
            // `SessionConn::exec_rows`.
            (SessionConn::Tx(tx), None)
        } else {
            let handle = StatementCacheHandle {
                cache: stmt_cache,
                pool: pool.clone(),
                ds_name,
                database,
            };
            (SessionConn::Pooled(conn), Some(handle))
        };

        Ok(RdbSession {
            conn,
            stmt_cache,
            options,
            id_gen,
            errors: Vec::new(),
            replicator,
            deferred: Vec::new(),
        })
    }

    /// Appends a deferred replication entry when both the session asked for
    /// mirroring and the type itself opts into it — neither flag alone is
    /// enough (spec §4.8).
    fn defer_replication<T: Model>(&mut self, descriptor: &RecordDescriptor<T>, op: impl FnOnce() -> ReplicationOp) {
        if self.options.mongo_sync && descriptor.primary_key.mirror_to_doc_store {
            self.deferred.push(op());
        }
    }

    fn doc_fields<T: Model>(descriptor: &RecordDescriptor<T>, record: &T) -> Vec<(String, Value)> {
        let mut fields = vec![("_id".to_string(), descriptor.primary_key.read(record))];
        fields.extend(
            descriptor
                .insertable_fields()
                .map(|f| (f.wire_name_doc.to_string(), f.read(record))),
        );
        fields
    }

    fn record_error(&mut self, op: &str, err: &impl std::fmt::Display) {
        self.errors.push(CoreError::DriverError(ErrorContext::new(op).cause(err.to_string())));
    }

    async fn timed_query(&mut self, op: &'static str, sql: &str, params: mysql_async::Params) -> CoreResult<Vec<Row>> {
        let timeout_ms = self.options.timeout_ms;
        let start = StdInstant::now();
        let outcome = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.conn.exec_rows(self.stmt_cache.as_ref(), sql, params),
        )
        .await;

        if start.elapsed().as_millis() as u64 > timeout_ms / 2 {
            warn!(op, elapsed = %to_duration_pretty(&start.elapsed()), sql, "slow rdb query");
        }

        match outcome {
            Ok(Ok(rows)) => Ok(rows),
            Ok(Err(e)) => {
                self.record_error(op, &e);
                Err(e)
            }
            Err(_) => {
                let err = CoreError::Timeout(ErrorContext::new(op).statement(sql));
                self.record_error(op, &err);
                Err(err)
            }
        }
    }

    async fn timed_write(&mut self, op: &'static str, sql: &str, params: mysql_async::Params) -> CoreResult<(u64, Option<u64>)> {
        let timeout_ms = self.options.timeout_ms;
        let start = StdInstant::now();
        let outcome = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.conn.exec_write(self.stmt_cache.as_ref(), sql, params),
        )
        .await;

        if start.elapsed().as_millis() as u64 > timeout_ms / 2 {
            warn!(op, elapsed = %to_duration_pretty(&start.elapsed()), sql, "slow rdb write");
        }

        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                self.record_error(op, &e);
                Err(e)
            }
            Err(_) => {
                let err = CoreError::Timeout(ErrorContext::new(op).statement(sql));
                self.record_error(op, &err);
                Err(err)
            }
        }
    }

    /// Whether this insert should omit the primary key from the rendered
    /// column list and rely on the driver's own default (spec §4.2): the
    /// type's own declaration, or a session-wide override via the
    /// `auto_id` session option (spec §4.6's option table: "treat primary
    /// keys as database-generated").
    fn omits_pk<T: Model>(&self, descriptor: &RecordDescriptor<T>) -> bool {
        descriptor.primary_key.auto_id || self.options.auto_id
    }

    /// When the key is not database-generated and the in-memory value is
    /// still zero, draws a fresh id from the external generator and writes
    /// it back (spec §8's auto-id testable property).
    fn assign_auto_id<T: Model>(&self, descriptor: &RecordDescriptor<T>, record: &mut T) {
        if self.omits_pk(descriptor) {
            return;
        }
        if !descriptor.primary_key.is_zero(record) {
            return;
        }
        match descriptor.primary_key.kind {
            PrimaryKeyKind::Int64 => descriptor.primary_key.write_i64(record, self.id_gen.next_i64()),
            PrimaryKeyKind::String => descriptor.primary_key.write_string(record, self.id_gen.next_string()),
            PrimaryKeyKind::DocumentId => {}
        }
    }

    fn decode_rows<T: Model>(descriptor: &RecordDescriptor<T>, rows: Vec<Row>) -> CoreResult<Vec<T>> {
        let mut out = Vec::with_capacity(rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            let mut record = descriptor.new_one();
            for (col_idx, column) in row.columns_ref().iter().enumerate() {
                let name = column.name_str();
                let Some(field) = descriptor.field_by_wire_sql(name.as_ref()) else {
                    continue;
                };
                let raw_value = row.as_ref(col_idx).cloned().unwrap_or(mysql_async::Value::NULL);
                let raw = column_to_raw(&raw_value);
                if let Err(e) = field.write(&mut record, &raw) {
                    if i < MAX_DECODE_BATCH_LOG {
                        warn!(field = field.name, error = %e, "field decode failed");
                    }
                    return Err(e);
                }
            }
            descriptor.append_one(&mut out, record);
        }
        Ok(out)
    }

    fn scalar_u64(rows: &[Row]) -> u64 {
        rows.first()
            .and_then(|r| r.as_ref(0))
            .map(column_to_raw)
            .and_then(|raw| std::str::from_utf8(&raw).ok().and_then(|s| s.parse().ok()))
            .unwrap_or(0)
    }

    /// A missing record is not an error: the destination is simply absent
    /// from the returned `Option`.
    pub async fn find_by_id<T: Model>(&mut self, id: impl Into<Value>) -> CoreResult<Option<T>> {
        let cnd = Cnd::model::<T>().eq("id", id);
        self.find_one(&cnd).await
    }

    pub async fn find_one<T: Model>(&mut self, cnd: &Cnd) -> CoreResult<Option<T>> {
        let descriptor = T::descriptor();
        let rendered = render_find_one(&descriptor, cnd)?;
        let params = values_to_params(&rendered.args);
        let rows = self.timed_query("find_one", &rendered.sql, params).await?;
        Ok(Self::decode_rows(&descriptor, rows)?.into_iter().next())
    }

    /// Identical to [`Self::find_one`]: a `Cnd` already carries its own
    /// `from`/`join`/`any_fields`, so "complex" is a property of the tree
    /// the caller built, not a separate code path.
    pub async fn find_one_complex<T: Model>(&mut self, cnd: &Cnd) -> CoreResult<Option<T>> {
        self.find_one(cnd).await
    }

    pub async fn find_list<T: Model>(&mut self, cnd: &mut Cnd) -> CoreResult<Vec<T>> {
        let descriptor = T::descriptor();

        if cnd.pagination.is_page && !cnd.pagination.is_offset {
            let count_rendered = render_count(&descriptor, cnd, twinstore_sql::Dialect::MySql)?;
            let count_params = values_to_params(&count_rendered.args);
            let count_rows = self.timed_query("count", &count_rendered.sql, count_params).await?;
            cnd.pagination.page_total = Self::scalar_u64(&count_rows);
            cnd.pagination.recompute_page_count();
        }

        let rendered = render_find_list(&descriptor, cnd, twinstore_sql::Dialect::MySql)?;
        let params = values_to_params(&rendered.args);
        let rows = self.timed_query("find_list", &rendered.sql, params).await?;
        Self::decode_rows(&descriptor, rows)
    }

    /// Identical to [`Self::find_list`]; see [`Self::find_one_complex`].
    pub async fn find_list_complex<T: Model>(&mut self, cnd: &mut Cnd) -> CoreResult<Vec<T>> {
        self.find_list(cnd).await
    }

    pub async fn count<T: Model>(&mut self, cnd: &Cnd) -> CoreResult<u64> {
        let descriptor = T::descriptor();
        let rendered = render_count(&descriptor, cnd, twinstore_sql::Dialect::MySql)?;
        let params = values_to_params(&rendered.args);
        let rows = self.timed_query("count", &rendered.sql, params).await?;
        Ok(Self::scalar_u64(&rows))
    }

    pub async fn exists<T: Model>(&mut self, cnd: &Cnd) -> CoreResult<bool> {
        let descriptor = T::descriptor();
        let rendered = render_exists(&descriptor, cnd)?;
        let params = values_to_params(&rendered.args);
        let rows = self.timed_query("exists", &rendered.sql, params).await?;
        Ok(Self::scalar_u64(&rows) != 0)
    }

    /// Inserts one record, assigning and writing back a generated primary
    /// key first when the type's key is auto-generated and currently zero.
    pub async fn save<T: Model>(&mut self, record: &mut T) -> CoreResult<()> {
        let descriptor = T::descriptor();
        let omit_pk = self.omits_pk(&descriptor);
        self.assign_auto_id(&descriptor, record);

        let rendered = render_insert(&descriptor, std::slice::from_ref(&*record), true, omit_pk)?;
        let params = values_to_params(&rendered.args);
        let (affected, last_insert_id) = self.timed_write("save", &rendered.sql, params).await?;

        if affected == 0 {
            return Err(CoreError::AffectedNone(
                ErrorContext::new("save").table(descriptor.table_name),
            ));
        }
        if omit_pk {
            if let Some(id) = last_insert_id {
                descriptor.primary_key.write_i64(record, id as i64);
            }
        }
        self.defer_replication(&descriptor, || ReplicationOp::Save {
            collection: descriptor.table_name,
            fields: Self::doc_fields(&descriptor, record),
        });
        Ok(())
    }

    /// Inserts up to `twinstore_sql::MAX_BATCH_SIZE` records in one statement.
    pub async fn save_batch<T: Model>(&mut self, records: &mut [T]) -> CoreResult<()> {
        let descriptor = T::descriptor();
        let omit_pk = self.omits_pk(&descriptor);
        for record in records.iter_mut() {
            self.assign_auto_id(&descriptor, record);
        }
        let rendered = render_insert(&descriptor, records, true, omit_pk)?;
        let params = values_to_params(&rendered.args);
        let (affected, _) = self.timed_write("save_batch", &rendered.sql, params).await?;
        if affected == 0 {
            return Err(CoreError::AffectedNone(
                ErrorContext::new("save_batch").table(descriptor.table_name),
            ));
        }
        for record in records.iter() {
            self.defer_replication(&descriptor, || ReplicationOp::Save {
                collection: descriptor.table_name,
                fields: Self::doc_fields(&descriptor, record),
            });
        }
        Ok(())
    }

    pub async fn update_by_record<T: Model>(&mut self, record: &T) -> CoreResult<u64> {
        let descriptor = T::descriptor();
        let rendered = render_update_by_record(&descriptor, record, true)?;
        let params = values_to_params(&rendered.args);
        let (affected, _) = self.timed_write("update_by_record", &rendered.sql, params).await?;
        if affected == 0 {
            warn!(table = descriptor.table_name, "update_by_record affected zero rows");
        } else {
            self.defer_replication(&descriptor, || ReplicationOp::UpdateByRecord {
                collection: descriptor.table_name,
                fields: Self::doc_fields(&descriptor, record),
            });
        }
        Ok(affected)
    }

    pub async fn update_by_condition<T: Model>(&mut self, cnd: &Cnd) -> CoreResult<u64> {
        let descriptor = T::descriptor();
        let rendered = render_update_by_condition(&descriptor, cnd)?;
        let params = values_to_params(&rendered.args);
        let (affected, _) = self.timed_write("update_by_condition", &rendered.sql, params).await?;
        if affected == 0 {
            warn!(table = descriptor.table_name, "update_by_condition affected zero rows");
        } else {
            self.defer_replication(&descriptor, || ReplicationOp::UpdateByCondition {
                collection: descriptor.table_name,
                cnd: cnd.clone(),
            });
        }
        Ok(affected)
    }

    pub async fn delete_by_record<T: Model>(&mut self, record: &T) -> CoreResult<u64> {
        let descriptor = T::descriptor();
        let rendered = render_delete_by_record(&descriptor, record, true)?;
        let params = values_to_params(&rendered.args);
        let (affected, _) = self.timed_write("delete_by_record", &rendered.sql, params).await?;
        if affected > 0 {
            self.defer_replication(&descriptor, || ReplicationOp::Delete {
                collection: descriptor.table_name,
                cnd: Cnd::model::<T>().eq("id", descriptor.primary_key.read(record)),
            });
        }
        Ok(affected)
    }

    pub async fn delete_by_ids<T: Model>(&mut self, ids: &[Value]) -> CoreResult<u64> {
        let descriptor = T::descriptor();
        let rendered = render_delete_by_ids(&descriptor, ids, true)?;
        let params = values_to_params(&rendered.args);
        let (affected, _) = self.timed_write("delete_by_ids", &rendered.sql, params).await?;
        if affected > 0 && !ids.is_empty() {
            self.defer_replication(&descriptor, || ReplicationOp::Delete {
                collection: descriptor.table_name,
                cnd: Cnd::model::<T>().in_list("id", ids.to_vec()),
            });
        }
        Ok(affected)
    }

    /// Best-effort replay of every deferred replication entry against the
    /// injected sink. A failure is logged and otherwise swallowed — it must
    /// never turn a successful, already-committed RDB mutation into an
    /// error the caller sees (spec §4.8).
    async fn replay_deferred(&mut self) {
        let Some(sink) = self.replicator.clone() else {
            self.deferred.clear();
            return;
        };
        for op in self.deferred.drain(..) {
            if let Err(e) = sink.replay(op).await {
                warn!(error = %e, "cross-store replication failed, RDB mutation already committed");
            }
        }
    }

    /// Commits iff no recorded errors, otherwise rolls back. Either way,
    /// the accumulated error list is surfaced to the caller rather than
    /// swallowed — a caller that ignores the returned `Result` still had
    /// every individual operation fail loudly when it happened.
    pub async fn close(mut self) -> CoreResult<()> {
        let had_errors = !self.errors.is_empty();
        if !had_errors {
            self.replay_deferred().await;
        } else {
            self.deferred.clear();
        }
        if let SessionConn::Tx(tx) = self.conn {
            if had_errors {
                tx.rollback()
                    .await
                    .map_err(|e| CoreError::TransactionError(ErrorContext::new("rollback").cause(e)))?;
            } else {
                tx.commit()
                    .await
                    .map_err(|e| CoreError::TransactionError(ErrorContext::new("commit").cause(e)))?;
            }
        }
        if had_errors {
            return Err(CoreError::TransactionError(
                ErrorContext::new("close").cause(format!("{} recorded error(s)", self.errors.len())),
            ));
        }
        Ok(())
    }
}
