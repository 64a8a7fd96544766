use twinstore_common::err::{CoreError, CoreResult};
use twinstore_condition::Pagination;

/// Pagination dialects the system is aware of. Only [`Dialect::MySql`] is
/// implemented; the rest are declared so the interface shape is documented
/// for a future multi-dialect SQL generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Oracle,
    Db2,
    Hsql,
    SqlServer2000,
    SqlServer2005,
    Sybase,
    Postgres,
    Derby,
}

impl Dialect {
    fn name(self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Oracle => "oracle",
            Dialect::Db2 => "db2",
            Dialect::Hsql => "hsql",
            Dialect::SqlServer2000 => "sqlserver2000",
            Dialect::SqlServer2005 => "sqlserver2005",
            Dialect::Sybase => "sybase",
            Dialect::Postgres => "postgres",
            Dialect::Derby => "derby",
        }
    }

    /// Appends the dialect's `LIMIT`/`OFFSET`-equivalent fragment to `sql`.
    pub fn render_limit(self, sql: &mut String, pagination: &Pagination) -> CoreResult<()> {
        match self {
            Dialect::MySql => {
                let offset = if pagination.is_offset {
                    pagination.page_no
                } else {
                    (pagination.page_no.saturating_sub(1)) * pagination.page_size
                };
                sql.push_str(&format!(" LIMIT {offset},{}", pagination.page_size));
                Ok(())
            }
            other => Err(CoreError::UnsupportedDialect(other.name().to_string())),
        }
    }

    /// Wraps a page-free query as a `SELECT COUNT(1)` subquery.
    pub fn render_count_wrapper(self, inner_sql: &str) -> CoreResult<String> {
        match self {
            Dialect::MySql => Ok(format!("SELECT COUNT(1) FROM ({inner_sql}) AS twinstore_count_t")),
            other => Err(CoreError::UnsupportedDialect(other.name().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_page_math() {
        let p = Pagination::offset_page(3, 10);
        let mut sql = String::from("SELECT 1 FROM t");
        Dialect::MySql.render_limit(&mut sql, &p).unwrap();
        assert_eq!(sql, "SELECT 1 FROM t LIMIT 20,10");
    }

    #[test]
    fn raw_offset_is_used_verbatim() {
        let p = Pagination::raw_offset(42, 10);
        let mut sql = String::from("SELECT 1 FROM t");
        Dialect::MySql.render_limit(&mut sql, &p).unwrap();
        assert_eq!(sql, "SELECT 1 FROM t LIMIT 42,10");
    }

    #[test]
    fn non_mysql_dialect_is_unsupported() {
        let p = Pagination::offset_page(1, 10);
        let mut sql = String::new();
        let err = Dialect::Postgres.render_limit(&mut sql, &p).unwrap_err();
        matches!(err, CoreError::UnsupportedDialect(_));
    }
}
