use twinstore_model::Value;

use crate::cnd::Cnd;

/// The closed predicate enumeration. New operators are added here and in
/// both the SQL and Mongo builders — adding a tree node requires touching
/// exactly these three places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    IsNull,
    IsNotNull,
    Between,
    NotBetween,
    In,
    NotIn,
    Like,
    NotLike,
}

/// One node in a condition tree. `Or` nests the same tree recursively;
/// depth is bounded only by what callers construct.
#[derive(Debug, Clone)]
pub enum Predicate {
    Cmp {
        key: String,
        logic: Logic,
        value: Option<Value>,
        values: Vec<Value>,
    },
    Or(Vec<Cnd>),
}

impl Predicate {
    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Cmp {
            key: key.into(),
            logic: Logic::Eq,
            value: Some(value.into()),
            values: Vec::new(),
        }
    }

    pub fn cmp(key: impl Into<String>, logic: Logic, value: impl Into<Value>) -> Self {
        Predicate::Cmp {
            key: key.into(),
            logic,
            value: Some(value.into()),
            values: Vec::new(),
        }
    }

    pub fn null(key: impl Into<String>, is_null: bool) -> Self {
        Predicate::Cmp {
            key: key.into(),
            logic: if is_null { Logic::IsNull } else { Logic::IsNotNull },
            value: None,
            values: Vec::new(),
        }
    }

    /// `between`/`not_between` always carry exactly two values by
    /// construction, so no runtime check is needed to enforce it.
    pub fn between(key: impl Into<String>, lo: impl Into<Value>, hi: impl Into<Value>, negate: bool) -> Self {
        Predicate::Cmp {
            key: key.into(),
            logic: if negate { Logic::NotBetween } else { Logic::Between },
            value: None,
            values: vec![lo.into(), hi.into()],
        }
    }

    /// `in`/`not_in` require at least one value; an empty `values` is
    /// rejected by the caller (`Cnd::in_list`) rather than represented here,
    /// so every constructed node already satisfies the invariant.
    pub fn in_list(key: impl Into<String>, values: Vec<Value>, negate: bool) -> Self {
        debug_assert!(!values.is_empty(), "IN/NOT_IN must carry at least one value");
        Predicate::Cmp {
            key: key.into(),
            logic: if negate { Logic::NotIn } else { Logic::In },
            value: None,
            values,
        }
    }

    pub fn like(key: impl Into<String>, value: impl Into<Value>, negate: bool) -> Self {
        Predicate::Cmp {
            key: key.into(),
            logic: if negate { Logic::NotLike } else { Logic::Like },
            value: Some(value.into()),
            values: Vec::new(),
        }
    }
}
