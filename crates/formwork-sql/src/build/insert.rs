use crate::serializer::{build, Comma, Output, Param, ToSql};
use crate::Table;

use formwork_core::{BindValue, Record, Statement};

/// Insert `record`, binding only its non-null data-source columns.
///
/// Each `returning` column gets an output bind `:{column}_out`.
pub fn insert(table: &Table, record: &Record, returning: &[String]) -> Statement {
    let values: Vec<(&String, BindValue)> = record
        .columns()
        .iter()
        .filter_map(|column| {
            let value = record.value(column);
            (!value.is_null())
                .then(|| (column, BindValue::new(column, value.clone()).with_column(column)))
        })
        .collect();

    let mut stmt = build(|f| {
        if values.is_empty() {
            fmt!(f, "insert into " table.name.as_str() " default values");
        } else {
            let columns = values.iter().map(|(column, _)| *column);
            let params = values.iter().map(|(_, bind)| Param(bind.clone()));

            fmt!(
                f,
                "insert into " table.name.as_str() " (" Comma(columns) ") values (" Comma(params) ")"
            );
        }

        if !returning.is_empty() {
            fmt!(
                f,
                " returning " Comma(returning) " into " Comma(returning.iter().map(|c| Output(c)))
            );
        }
    });

    stmt.returning = returning.to_vec();
    stmt
}
