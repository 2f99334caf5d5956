#[macro_use]
mod fmt;
pub(crate) use fmt::ToSql;

mod delim;
pub(crate) use delim::{Comma, Delimited};

mod fragment;
pub(crate) use fragment::{Key, OrderBy, Output, Param, Where};

use formwork_core::{BindValue, Statement};

pub(crate) struct Formatter<'a> {
    /// Where to write the statement text
    dst: &'a mut String,

    /// Binds, in the order their placeholders are written
    binds: &'a mut Vec<BindValue>,
}

/// Run `f` against a fresh statement and return it.
pub(crate) fn build(f: impl FnOnce(&mut Formatter<'_>)) -> Statement {
    let mut stmt = Statement::default();

    let mut fmt = Formatter {
        dst: &mut stmt.text,
        binds: &mut stmt.binds,
    };

    f(&mut fmt);

    stmt
}
