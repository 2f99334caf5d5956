use super::{Target, NEVER};
use crate::{BindValue, Record, Value};

/// `column = :name`
#[derive(Debug, Clone)]
pub struct Equals {
    pub(crate) target: Target,
    constraint: Value,
}

impl Equals {
    pub fn new(column: impl Into<String>) -> Equals {
        Equals {
            target: Target::new(column),
            constraint: Value::Null,
        }
    }

    pub fn column(&self) -> &str {
        self.target.column()
    }

    pub fn constraint(&self) -> &Value {
        &self.constraint
    }

    pub fn set_constraint(&mut self, value: impl Into<Value>) {
        self.constraint = value.into();
    }

    pub fn evaluate(&self, record: &Record) -> bool {
        if self.constraint.is_null() {
            return false;
        }

        self.target
            .value(record)
            .is_some_and(|value| value.same_as(&self.constraint))
    }

    pub fn as_sql(&self) -> String {
        if self.constraint.is_null() {
            return NEVER.to_string();
        }

        format!("{} = :{}", self.target.column(), self.target.name())
    }

    pub fn bind_values(&self) -> Vec<BindValue> {
        if self.constraint.is_null() {
            return vec![];
        }

        vec![self
            .target
            .bind(self.target.name().to_string(), self.constraint.clone())]
    }
}
