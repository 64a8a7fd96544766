//! SQL builder (C4) and pagination dialect (C7): renders a [`twinstore_condition::Cnd`]
//! plus a record descriptor into MySQL text and bind arguments. Nothing here
//! talks to a driver — the session layer owns prepare/execute and error
//! classification.

mod dialect;
mod mutate;
mod select;
mod where_clause;

use twinstore_model::Value;

pub use dialect::Dialect;
pub use mutate::{
    render_delete_by_ids, render_delete_by_record, render_insert, render_update_by_condition,
    render_update_by_record, MAX_BATCH_SIZE,
};
pub use select::{render_count, render_exists, render_find_list, render_find_one};
pub use where_clause::{pk_column_for, render_conditions, render_group_by, render_order_by, render_where};

/// A rendered statement: MySQL text with `?` placeholders, plus the bind
/// arguments in positional order.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub sql: String,
    pub args: Vec<Value>,
}
