use super::{Target, MAX_BOUND_MEMBERS, NEVER};
use crate::{BindValue, Record, Value};

/// Set membership, `column in (...)`, or `not in` when negated.
///
/// Up to [`MAX_BOUND_MEMBERS`] members bind as `:{name}_0`, `:{name}_1`, ...;
/// larger sets are inlined as literals.
#[derive(Debug, Clone)]
pub struct AnyOf {
    pub(crate) target: Target,
    values: Vec<Value>,
    negated: bool,
}

impl AnyOf {
    pub fn new(column: impl Into<String>) -> AnyOf {
        AnyOf {
            target: Target::new(column),
            values: vec![],
            negated: false,
        }
    }

    pub fn negated(column: impl Into<String>) -> AnyOf {
        AnyOf {
            negated: true,
            ..AnyOf::new(column)
        }
    }

    pub fn column(&self) -> &str {
        self.target.column()
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Null members are dropped.
    pub fn set_values<I>(&mut self, values: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.values = values
            .into_iter()
            .map(Into::into)
            .filter(|value| !value.is_null())
            .collect();
    }

    fn is_inlined(&self) -> bool {
        self.values.len() > MAX_BOUND_MEMBERS
    }

    pub fn evaluate(&self, record: &Record) -> bool {
        if self.values.is_empty() {
            return false;
        }

        let Some(value) = self.target.value(record) else {
            return false;
        };

        self.values.iter().any(|member| member.same_as(value)) != self.negated
    }

    pub fn as_sql(&self) -> String {
        if self.values.is_empty() {
            return NEVER.to_string();
        }

        let members = if self.is_inlined() {
            self.values
                .iter()
                .map(Value::to_sql_literal)
                .collect::<Vec<_>>()
        } else {
            (0..self.values.len())
                .map(|i| format!(":{}_{i}", self.target.name()))
                .collect()
        };

        let op = if self.negated { "not in" } else { "in" };

        format!("{} {op} ({})", self.target.column(), members.join(", "))
    }

    pub fn bind_values(&self) -> Vec<BindValue> {
        if self.is_inlined() {
            return vec![];
        }

        self.values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                self.target
                    .bind(format!("{}_{i}", self.target.name()), value.clone())
            })
            .collect()
    }
}
