use crate::serializer::{build, Key, ToSql};
use crate::Table;

use formwork_core::{Record, Statement};

use super::key_columns;

/// Lock `record`'s row, selecting its current backend values.
///
/// The row is located by the record's synchronized values, so a key the
/// user has edited since the last fetch still finds the row.
pub fn lock(table: &Table, record: &Record) -> Statement {
    let mut stmt = refresh(table, record);
    stmt.text.push_str(" for update");
    stmt
}

/// Re-read `record`'s row.
pub fn refresh(table: &Table, record: &Record) -> Statement {
    let columns = key_columns(table, record);

    build(|f| {
        fmt!(
            f,
            "select " record.columns().join(", ") " from " table.name.as_str()
            " where " Key { columns: &columns, record }
        )
    })
}
