//! Mongo builder (C5): renders a [`twinstore_condition::Cnd`] plus a record
//! descriptor into BSON filter/sort/projection/update documents. Nothing
//! here talks to a driver — [`twinstore_doc`]'s session owns the `mongodb`
//! client and error classification, the same split `twinstore_sql` keeps
//! from `twinstore_rdb`.

mod filter;
mod mutate;
mod page;
mod projection;

pub use filter::{id_field_for, render_filter, render_sort};
pub use mutate::{render_insert_doc, render_replace_doc, render_set_doc};
pub use page::{plan_page, PagePlan};
pub use projection::render_projection;
