use crate::serializer::{build, Key, ToSql};
use crate::Table;

use formwork_core::{Record, Statement};

use super::key_columns;

pub fn delete(table: &Table, record: &Record) -> Statement {
    let columns = key_columns(table, record);

    build(|f| fmt!(f, "delete from " table.name.as_str() " where " Key { columns: &columns, record }))
}
