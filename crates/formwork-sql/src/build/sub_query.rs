use crate::serializer::{build, Comma, ToSql, Where};

use formwork_core::{FilterStructure, Statement};

/// `(<columns>) in (select <source_columns> from <source> [where <filter>])`
///
/// Used as the clause of a [`SubQuery`](formwork_core::filter::SubQuery)
/// filter to restrict a detail block by rows of another table.
pub fn subquery(
    columns: &[String],
    source: &str,
    source_columns: &[String],
    filter: Option<&FilterStructure>,
) -> Statement {
    build(|f| {
        fmt!(
            f,
            "(" Comma(columns) ") in (select " Comma(source_columns) " from " source
            Where(filter) ")"
        )
    })
}
