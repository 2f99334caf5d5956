use super::{Target, NEVER};
use crate::{BindValue, Record, Value};

use std::cmp::Ordering;

/// A range test on one column.
///
/// Either bound may be left unset, in which case only the other side is
/// emitted. The bounds bind as `:{name}_from` and `:{name}_to`.
#[derive(Debug, Clone)]
pub struct Between {
    pub(crate) target: Target,
    low: Value,
    high: Value,
    inclusive: bool,
}

impl Between {
    pub fn new(column: impl Into<String>) -> Between {
        Between {
            target: Target::new(column),
            low: Value::Null,
            high: Value::Null,
            inclusive: true,
        }
    }

    /// Exclude both bounds from the range.
    pub fn exclusive(mut self) -> Between {
        self.inclusive = false;
        self
    }

    pub fn column(&self) -> &str {
        self.target.column()
    }

    pub fn is_inclusive(&self) -> bool {
        self.inclusive
    }

    pub fn low(&self) -> &Value {
        &self.low
    }

    pub fn high(&self) -> &Value {
        &self.high
    }

    pub fn set_low(&mut self, value: impl Into<Value>) {
        self.low = value.into();
    }

    pub fn set_high(&mut self, value: impl Into<Value>) {
        self.high = value.into();
    }

    pub fn set_range(&mut self, low: impl Into<Value>, high: impl Into<Value>) {
        self.low = low.into();
        self.high = high.into();
    }

    pub fn evaluate(&self, record: &Record) -> bool {
        if self.low.is_null() && self.high.is_null() {
            return false;
        }

        let Some(value) = self.target.value(record) else {
            return false;
        };

        let above = self.low.is_null() || self.admits(value.compare(&self.low), Ordering::Greater);
        let below = self.high.is_null() || self.admits(value.compare(&self.high), Ordering::Less);

        above && below
    }

    fn admits(&self, ord: Option<Ordering>, side: Ordering) -> bool {
        match ord {
            Some(Ordering::Equal) => self.inclusive,
            Some(ord) => ord == side,
            None => false,
        }
    }

    pub fn as_sql(&self) -> String {
        let column = self.target.column();
        let name = self.target.name();
        let (ge, le) = if self.inclusive { (">=", "<=") } else { (">", "<") };

        match (self.low.is_null(), self.high.is_null()) {
            (true, true) => NEVER.to_string(),
            (false, true) => format!("{column} {ge} :{name}_from"),
            (true, false) => format!("{column} {le} :{name}_to"),
            (false, false) => {
                format!("{column} {ge} :{name}_from and {column} {le} :{name}_to")
            }
        }
    }

    pub fn bind_values(&self) -> Vec<BindValue> {
        let name = self.target.name();
        let mut binds = vec![];

        if !self.low.is_null() {
            binds.push(self.target.bind(format!("{name}_from"), self.low.clone()));
        }

        if !self.high.is_null() {
            binds.push(self.target.bind(format!("{name}_to"), self.high.clone()));
        }

        binds
    }
}
