use super::NEVER;
use crate::{BindValue, Record, Statement, Type, Value};

use indexmap::IndexMap;

/// Tuple membership of one or more columns in the rows of another query.
///
/// The backend form is a complete clause, typically
/// `(c1, c2) in (select ...)`, built by the statement builder and attached
/// with [`SubQuery::set_statement`]. In-memory evaluation only consults the
/// tuple table.
#[derive(Debug, Clone)]
pub struct SubQuery {
    columns: Vec<String>,
    name: String,
    statement: Option<Statement>,
    tuples: Vec<Vec<Value>>,
}

impl SubQuery {
    pub fn new<I>(columns: I) -> SubQuery
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let columns: Vec<String> = columns
            .into_iter()
            .map(|column| column.into().to_lowercase())
            .collect();

        SubQuery {
            name: columns.join("_"),
            columns,
            statement: None,
            tuples: vec![],
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

    pub fn statement(&self) -> Option<&Statement> {
        self.statement.as_ref()
    }

    pub fn set_statement(&mut self, statement: Statement) {
        self.statement = Some(statement);
    }

    pub fn tuples(&self) -> &[Vec<Value>] {
        &self.tuples
    }

    pub fn set_tuples(&mut self, tuples: Vec<Vec<Value>>) {
        self.tuples = tuples;
    }

    pub fn push_tuple(&mut self, tuple: Vec<Value>) {
        self.tuples.push(tuple);
    }

    pub(crate) fn infer_types(&mut self, types: &IndexMap<String, Type>) {
        if let Some(statement) = &mut self.statement {
            statement.infer_types(types);
        }
    }

    pub fn evaluate(&self, record: &Record) -> bool {
        if self.columns.is_empty() {
            return false;
        }

        let Some(key) = self
            .columns
            .iter()
            .map(|column| record.get_value(column))
            .collect::<Option<Vec<_>>>()
        else {
            return false;
        };

        self.tuples.iter().any(|tuple| {
            tuple.len() == key.len() && tuple.iter().zip(&key).all(|(a, b)| a.same_as(b))
        })
    }

    pub fn as_sql(&self) -> String {
        match &self.statement {
            Some(statement) => statement.text.clone(),
            None => NEVER.to_string(),
        }
    }

    pub fn bind_values(&self) -> Vec<BindValue> {
        self.statement
            .as_ref()
            .map(|statement| statement.binds.clone())
            .unwrap_or_default()
    }
}
