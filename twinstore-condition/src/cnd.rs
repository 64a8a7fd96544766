use twinstore_model::{Model, Value};

use crate::pagination::{Direction, Pagination};
use crate::predicate::{Logic, Predicate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Right,
    Inner,
}

#[derive(Debug, Clone)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: String,
    pub alias: Option<String>,
    pub on: String,
}

#[derive(Debug, Clone)]
pub struct FromClause {
    pub table: String,
    pub alias: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone)]
pub struct Aggregate {
    pub func: AggFunc,
    pub column: String,
    pub alias: Option<String>,
}

/// The composable predicate/pagination/projection/join/aggregate tree both
/// builders (C4 SQL, C5 Mongo) consume.
///
/// A `Cnd` built via [`Cnd::model`] carries the target type's table name, so
/// the builder can rewrite the logical key `id` to the type's physical
/// primary-key column. A `Cnd` built via [`Cnd::new`] is in "raw condition
/// mode": `id` is emitted verbatim, with no model context to rewrite it.
#[derive(Debug, Clone, Default)]
pub struct Cnd {
    pub model_table: Option<&'static str>,
    pub conditions: Vec<Predicate>,
    pub upsets: Vec<(String, Value)>,
    pub orderbys: Vec<(String, Direction)>,
    pub groupbys: Vec<String>,
    pub any_fields: Vec<String>,
    pub any_not_fields: Vec<String>,
    pub from: Option<FromClause>,
    pub joins: Vec<JoinClause>,
    pub aggregates: Vec<Aggregate>,
    pub pagination: Pagination,
    pub sample_size: Option<u64>,
    pub limit_size: Option<u64>,
    pub escape: bool,
    pub collation_config: Option<String>,
}

impl Cnd {
    /// Raw condition mode: no record type context, `id` is never rewritten.
    pub fn new() -> Self {
        Cnd {
            escape: true,
            ..Default::default()
        }
    }

    /// Model-bound mode: `id` is rewritten to `T`'s physical primary-key
    /// column by the builders.
    pub fn model<T: Model>() -> Self {
        Cnd {
            model_table: Some(T::descriptor().table_name),
            escape: true,
            ..Default::default()
        }
    }

    pub fn eq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Predicate::eq(key, value));
        self
    }

    pub fn neq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Predicate::cmp(key, Logic::Neq, value));
        self
    }

    pub fn lt(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Predicate::cmp(key, Logic::Lt, value));
        self
    }

    pub fn lte(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Predicate::cmp(key, Logic::Lte, value));
        self
    }

    pub fn gt(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Predicate::cmp(key, Logic::Gt, value));
        self
    }

    pub fn gte(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Predicate::cmp(key, Logic::Gte, value));
        self
    }

    pub fn is_null(mut self, key: impl Into<String>) -> Self {
        self.conditions.push(Predicate::null(key, true));
        self
    }

    pub fn is_not_null(mut self, key: impl Into<String>) -> Self {
        self.conditions.push(Predicate::null(key, false));
        self
    }

    pub fn between(mut self, key: impl Into<String>, lo: impl Into<Value>, hi: impl Into<Value>) -> Self {
        self.conditions.push(Predicate::between(key, lo, hi, false));
        self
    }

    pub fn not_between(mut self, key: impl Into<String>, lo: impl Into<Value>, hi: impl Into<Value>) -> Self {
        self.conditions.push(Predicate::between(key, lo, hi, true));
        self
    }

    /// A no-op when `values` is empty, so the tree never carries an IN node
    /// that violates the "at least one value" invariant.
    pub fn in_list(mut self, key: impl Into<String>, values: Vec<Value>) -> Self {
        if !values.is_empty() {
            self.conditions.push(Predicate::in_list(key, values, false));
        }
        self
    }

    pub fn not_in(mut self, key: impl Into<String>, values: Vec<Value>) -> Self {
        if !values.is_empty() {
            self.conditions.push(Predicate::in_list(key, values, true));
        }
        self
    }

    pub fn like(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Predicate::like(key, value, false));
        self
    }

    pub fn not_like(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Predicate::like(key, value, true));
        self
    }

    pub fn or(mut self, branches: Vec<Cnd>) -> Self {
        self.conditions.push(Predicate::Or(branches));
        self
    }

    pub fn upset(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.upsets.push((key.into(), value.into()));
        self
    }

    pub fn orderby(mut self, key: impl Into<String>, dir: Direction) -> Self {
        self.orderbys.push((key.into(), dir));
        self
    }

    pub fn groupby(mut self, key: impl Into<String>) -> Self {
        self.groupbys.push(key.into());
        self
    }

    pub fn any_field(mut self, key: impl Into<String>) -> Self {
        self.any_fields.push(key.into());
        self
    }

    pub fn any_not_field(mut self, key: impl Into<String>) -> Self {
        self.any_not_fields.push(key.into());
        self
    }

    pub fn from_as(mut self, table: impl Into<String>, alias: impl Into<String>) -> Self {
        self.from = Some(FromClause {
            table: table.into(),
            alias: alias.into(),
        });
        self
    }

    pub fn join(mut self, kind: JoinKind, table: impl Into<String>, alias: Option<String>, on: impl Into<String>) -> Self {
        self.joins.push(JoinClause {
            kind,
            table: table.into(),
            alias,
            on: on.into(),
        });
        self
    }

    pub fn aggregate(mut self, func: AggFunc, column: impl Into<String>, alias: Option<String>) -> Self {
        self.aggregates.push(Aggregate {
            func,
            column: column.into(),
            alias,
        });
        self
    }

    pub fn offset(mut self, page_no: u64, page_size: u64) -> Self {
        self.pagination = Pagination::offset_page(page_no, page_size);
        self
    }

    pub fn raw_offset(mut self, offset: u64, page_size: u64) -> Self {
        self.pagination = Pagination::raw_offset(offset, page_size);
        self
    }

    pub fn fast_page(mut self, key: impl Into<String>, sort: Direction, page_size: u64, prev_id: i64, last_id: i64) -> Self {
        self.pagination = Pagination::fast_page(key, sort, page_size, prev_id, last_id);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit_size = Some(n);
        self
    }

    pub fn sample(mut self, n: u64) -> Self {
        self.sample_size = Some(n);
        self
    }

    pub fn escape(mut self, escape: bool) -> Self {
        self.escape = escape;
        self
    }

    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation_config = Some(collation.into());
        self
    }
}
