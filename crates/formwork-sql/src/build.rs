pub(crate) mod call;
pub(crate) mod delete;
pub(crate) mod insert;
pub(crate) mod lock;
pub(crate) mod select;
pub(crate) mod sub_query;
pub(crate) mod update;

use crate::Table;
use formwork_core::Record;

/// Columns that locate `record`'s row in `table`.
pub(crate) fn key_columns(table: &Table, record: &Record) -> Vec<String> {
    if table.primary_key.is_empty() {
        record.columns().to_vec()
    } else {
        table.primary_key.clone()
    }
}

/// `*` for an empty column list.
pub(crate) fn column_list(columns: &[String]) -> String {
    if columns.is_empty() {
        "*".to_string()
    } else {
        columns.join(", ")
    }
}
