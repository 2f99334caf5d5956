use super::{Delimited, Formatter, ToSql};

use formwork_core::{BindValue, FilterStructure, Record};

/// `:name`, recording the bind.
pub(crate) struct Param(pub(crate) BindValue);

/// `:{column}_out`, recording an output bind for `column`.
pub(crate) struct Output<'a>(pub(crate) &'a str);

/// ` where <filter>`, or nothing for an absent or empty filter.
pub(crate) struct Where<'a>(pub(crate) Option<&'a FilterStructure>);

/// ` order by <order>`, or nothing.
pub(crate) struct OrderBy<'a>(pub(crate) Option<&'a str>);

/// Predicate locating a record's row, built from its synchronized values.
pub(crate) struct Key<'a> {
    pub(crate) columns: &'a [String],
    pub(crate) record: &'a Record,
}

struct KeyColumn<'a> {
    column: &'a str,
    record: &'a Record,
}

impl ToSql for Param {
    fn to_sql(self, f: &mut Formatter<'_>) {
        f.dst.push(':');
        f.dst.push_str(&self.0.name);
        f.binds.push(self.0);
    }
}

impl ToSql for Output<'_> {
    fn to_sql(self, f: &mut Formatter<'_>) {
        fmt!(f, Param(BindValue::output(format!("{}_out", self.0), self.0)));
    }
}

impl ToSql for Where<'_> {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let Some(filter) = self.0.filter(|filter| !filter.is_empty()) else {
            return;
        };

        fmt!(f, " where " filter.as_sql());
        f.binds.extend(filter.bind_values());
    }
}

impl ToSql for OrderBy<'_> {
    fn to_sql(self, f: &mut Formatter<'_>) {
        if let Some(order) = self.0.map(str::trim).filter(|order| !order.is_empty()) {
            fmt!(f, " order by " order);
        }
    }
}

impl ToSql for Key<'_> {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let columns = self.columns.iter().map(|column| KeyColumn {
            column,
            record: self.record,
        });

        fmt!(f, Delimited(columns, " and "));
    }
}

impl ToSql for KeyColumn<'_> {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let value = self
            .record
            .initial_value(self.column)
            .cloned()
            .unwrap_or_default();

        if value.is_null() {
            fmt!(f, self.column " is null");
        } else {
            let bind = BindValue::new(format!("pk_{}", self.column), value).with_column(self.column);
            fmt!(f, self.column " = " Param(bind));
        }
    }
}
