use super::NEVER;
use crate::{BindValue, Record, Type, Value};

/// Free-text search over several columns.
///
/// The constraint is split on whitespace; every term must appear,
/// case-insensitively, in at least one of the columns.
#[derive(Debug, Clone)]
pub struct Contains {
    columns: Vec<String>,
    name: String,
    text: Option<String>,
}

impl Contains {
    pub fn new<I>(columns: I) -> Contains
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let columns: Vec<String> = columns
            .into_iter()
            .map(|column| column.into().to_lowercase())
            .collect();

        Contains {
            name: columns.join("_"),
            columns,
            text: None,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn rename(&mut self, name: String) {
        self.name = name;
    }

    pub fn set_constraint(&mut self, value: impl Into<Value>) {
        let value = value.into();
        self.text = (!value.is_null()).then(|| value.to_string());
    }

    pub fn terms(&self) -> Vec<String> {
        self.text
            .iter()
            .flat_map(|text| text.split_whitespace())
            .map(str::to_lowercase)
            .collect()
    }

    pub fn evaluate(&self, record: &Record) -> bool {
        let terms = self.terms();

        if terms.is_empty() || self.columns.is_empty() {
            return false;
        }

        let haystacks: Vec<String> = self
            .columns
            .iter()
            .filter_map(|column| record.get_value(column))
            .filter(|value| !value.is_null())
            .map(|value| value.to_string().to_lowercase())
            .collect();

        terms
            .iter()
            .all(|term| haystacks.iter().any(|text| text.contains(term.as_str())))
    }

    pub fn as_sql(&self) -> String {
        let terms = self.terms();

        if terms.is_empty() || self.columns.is_empty() {
            return NEVER.to_string();
        }

        terms
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let any = self
                    .columns
                    .iter()
                    .map(|column| format!("lower({column}) like :{}_{i}", self.name))
                    .collect::<Vec<_>>()
                    .join(" or ");
                format!("({any})")
            })
            .collect::<Vec<_>>()
            .join(" and ")
    }

    pub fn bind_values(&self) -> Vec<BindValue> {
        if self.columns.is_empty() {
            return vec![];
        }

        self.terms()
            .into_iter()
            .enumerate()
            .map(|(i, term)| {
                BindValue::new(format!("{}_{i}", self.name), format!("%{term}%"))
                    .with_forced_type(Type::String)
            })
            .collect()
    }
}
