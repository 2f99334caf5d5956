use crate::serializer::{build, OrderBy, ToSql, Where};

use formwork_core::{FilterStructure, Statement};

use super::column_list;

/// `select <columns> from <table> [where <filter>] [order by <order>]`
pub fn select(
    table: &str,
    columns: &[String],
    filter: Option<&FilterStructure>,
    order: Option<&str>,
) -> Statement {
    build(|f| fmt!(f, "select " column_list(columns) " from " table Where(filter) OrderBy(order)))
}

/// Append a filter and order to an already built query.
///
/// The query's own binds are kept ahead of the filter's. The query must
/// not already end in a `where` or `order by` clause; wrap it as
/// `select * from (<query>) q` first if it does.
pub fn finish(query: &Statement, filter: Option<&FilterStructure>, order: Option<&str>) -> Statement {
    let mut stmt = build(|f| fmt!(f, &query.text Where(filter) OrderBy(order)));

    let appended = std::mem::take(&mut stmt.binds);
    stmt.binds = query.binds.iter().cloned().chain(appended).collect();
    stmt.returning.clone_from(&query.returning);
    stmt
}

/// Zero-row select used to describe a table or query: its columns and
/// their types without fetching data.
pub fn describe(table: &str, columns: &[String]) -> Statement {
    build(|f| fmt!(f, "select " column_list(columns) " from " table " where 1 = 2"))
}
