use super::Target;
use crate::Record;

/// `column is null`, or `is not null` when negated. Carries no binds.
#[derive(Debug, Clone)]
pub struct IsNull {
    pub(crate) target: Target,
    negated: bool,
}

impl IsNull {
    pub fn new(column: impl Into<String>) -> IsNull {
        IsNull {
            target: Target::new(column),
            negated: false,
        }
    }

    pub fn negated(column: impl Into<String>) -> IsNull {
        IsNull {
            negated: true,
            ..IsNull::new(column)
        }
    }

    pub fn column(&self) -> &str {
        self.target.column()
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn evaluate(&self, record: &Record) -> bool {
        match record.get_value(self.target.column()) {
            Some(value) => value.is_null() != self.negated,
            None => false,
        }
    }

    pub fn as_sql(&self) -> String {
        if self.negated {
            format!("{} is not null", self.target.column())
        } else {
            format!("{} is null", self.target.column())
        }
    }
}
