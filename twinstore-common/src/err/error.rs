use std::fmt;
use std::fmt::Display;

/// Structured context attached to the error kinds that originate from a CRUD
/// primitive: which operation was running, against which table, and the SQL
/// text or Mongo filter involved.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub operation: Option<String>,
    pub table: Option<String>,
    /// Rendered SQL text or Mongo filter/update document (debug-formatted).
    pub statement: Option<String>,
    pub cause: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        ErrorContext {
            operation: Some(operation.into()),
            table: None,
            statement: None,
            cause: None,
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }

    pub fn cause(mut self, cause: impl Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

impl Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(op) = &self.operation {
            write!(f, "op={op}")?;
        }
        if let Some(t) = &self.table {
            write!(f, " table={t}")?;
        }
        if let Some(s) = &self.statement {
            write!(f, " stmt={s}")?;
        }
        if let Some(c) = &self.cause {
            write!(f, " cause={c}")?;
        }
        Ok(())
    }
}

/// The error surface of every twinstore crate.
///
/// Mirrors the error-kind taxonomy the runtime is specified against:
/// missing configuration, unregistered models, invalid arguments, prepare
/// failures, driver failures, decode failures, zero-affected-rows, stubbed
/// dialects, cancellation/timeouts, transaction failures and best-effort
/// replication failures.
#[derive(Debug)]
pub enum CoreError {
    /// Missing or invalid configuration at init.
    ConfigError(String),
    /// Unknown `ds_name`.
    DataSourceNotFound(String),
    /// Operation on a table with no registered descriptor.
    ModelNotRegistered(String),
    /// Nil destination, empty batch, batch > 2000, missing primary key on
    /// update/delete by record, empty update set on update-by-condition,
    /// unsupported primary-key kind.
    InvalidArgument(ErrorContext),
    /// `prepare` failed, or a poison marker was observed.
    InvalidSql(ErrorContext),
    /// execute/query/scan failure from the backing driver.
    DriverError(ErrorContext),
    /// The value codec could not materialize a field.
    DecodeError(ErrorContext),
    /// A mutation reported zero affected rows. Downgraded to a warning
    /// everywhere except `save`, where it is fatal.
    AffectedNone(ErrorContext),
    /// Pagination dialects other than MySQL are declared but unimplemented.
    UnsupportedDialect(String),
    /// Per-call deadline fired.
    Timeout(ErrorContext),
    /// Caller cancelled the operation.
    Cancelled(ErrorContext),
    /// begin/commit/rollback failed.
    TransactionError(ErrorContext),
    /// Best-effort Mongo replication failed. Logged, never returned to the
    /// caller of the already-committed RDB mutation.
    ReplicationError(ErrorContext),
}

impl CoreError {
    pub fn invalid_argument(detail: impl Into<String>) -> Self {
        CoreError::InvalidArgument(ErrorContext::new("invalid_argument").cause(detail.into()))
    }

    pub fn model_not_registered(table: impl Into<String>) -> Self {
        CoreError::ModelNotRegistered(table.into())
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::ConfigError(s) => write!(f, "config error: {s}"),
            CoreError::DataSourceNotFound(s) => write!(f, "data source not found: {s}"),
            CoreError::ModelNotRegistered(s) => write!(f, "model not registered: {s}"),
            CoreError::InvalidArgument(ctx) => write!(f, "invalid argument ({ctx})"),
            CoreError::InvalidSql(ctx) => write!(f, "invalid sql ({ctx})"),
            CoreError::DriverError(ctx) => write!(f, "driver error ({ctx})"),
            CoreError::DecodeError(ctx) => write!(f, "decode error ({ctx})"),
            CoreError::AffectedNone(ctx) => write!(f, "affected none ({ctx})"),
            CoreError::UnsupportedDialect(s) => write!(f, "unsupported dialect: {s}"),
            CoreError::Timeout(ctx) => write!(f, "timeout ({ctx})"),
            CoreError::Cancelled(ctx) => write!(f, "cancelled ({ctx})"),
            CoreError::TransactionError(ctx) => write!(f, "transaction error ({ctx})"),
            CoreError::ReplicationError(ctx) => write!(f, "replication error ({ctx})"),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<std::num::ParseIntError> for CoreError {
    fn from(e: std::num::ParseIntError) -> Self {
        CoreError::DecodeError(ErrorContext::new("parse").cause(e))
    }
}

impl From<std::str::Utf8Error> for CoreError {
    fn from(e: std::str::Utf8Error) -> Self {
        CoreError::DecodeError(ErrorContext::new("utf8").cause(e))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::DecodeError(ErrorContext::new("json").cause(e))
    }
}
