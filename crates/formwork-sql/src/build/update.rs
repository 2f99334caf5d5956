use crate::serializer::{build, Comma, Formatter, Key, Output, Param, ToSql};
use crate::Table;

use formwork_core::{Assertion, BindValue, Record, Statement};

use super::key_columns;

struct Set<'a> {
    column: &'a str,
    bind: BindValue,
}

impl ToSql for Set<'_> {
    fn to_sql(self, f: &mut Formatter<'_>) {
        fmt!(f, self.column " = " Param(self.bind));
    }
}

/// Update `record`'s dirty columns. Returns `None` when nothing is dirty.
///
/// With `assert`, the statement carries an [`Assertion`] holding every
/// synchronized value; the gateway reports columns changed underneath as
/// violations instead of applying the update.
pub fn update(
    table: &Table,
    record: &Record,
    returning: &[String],
    assert: bool,
) -> Option<Statement> {
    if !record.is_dirty() {
        return None;
    }

    let key = key_columns(table, record);

    let sets: Vec<Set<'_>> = record
        .dirty_columns()
        .map(|column| Set {
            column,
            bind: BindValue::new(column, record.value(column).clone()).with_column(column),
        })
        .collect();

    let mut stmt = build(|f| {
        fmt!(
            f,
            "update " table.name.as_str() " set " Comma(sets)
            " where " Key { columns: &key, record }
        );

        if !returning.is_empty() {
            fmt!(
                f,
                " returning " Comma(returning) " into " Comma(returning.iter().map(|c| Output(c)))
            );
        }
    });

    if assert {
        stmt.assertion = Some(Assertion {
            binds: record
                .columns()
                .iter()
                .map(|column| {
                    let value = record.initial_value(column).cloned().unwrap_or_default();
                    BindValue::new(column, value).with_column(column)
                })
                .collect(),
        });
    }

    stmt.returning = returning.to_vec();
    Some(stmt)
}
