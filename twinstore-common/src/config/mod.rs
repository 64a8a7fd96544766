pub mod doc_config;
pub mod sql_config;

pub use doc_config::DocSourceConfig;
pub use sql_config::SqlSourceConfig;
