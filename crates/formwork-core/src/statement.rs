use crate::{BindValue, Type};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A backend-agnostic statement: SQL-like text plus everything the gateway
/// needs to execute it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub text: String,

    /// Binds in the order their placeholders were emitted
    pub binds: Vec<BindValue>,

    /// Columns the backend sends back after the statement runs
    pub returning: Vec<String>,

    /// Optimistic-lock check run by the gateway before a DML statement
    pub assertion: Option<Assertion>,
}

/// The column values a row must still hold for a DML statement to apply.
///
/// The gateway reports each column whose current value differs in
/// `Response::violations`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    pub binds: Vec<BindValue>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Statement {
        Statement {
            text: text.into(),
            ..Statement::default()
        }
    }

    /// Fill bind types from described column types.
    ///
    /// Binds whose type was forced keep it; this covers the output binds
    /// added for a `returning` clause as well.
    pub fn infer_types(&mut self, types: &IndexMap<String, Type>) {
        let assertion = self.assertion.iter_mut().flat_map(|a| a.binds.iter_mut());

        for bind in self.binds.iter_mut().chain(assertion) {
            let ty = bind
                .column
                .as_deref()
                .and_then(|column| types.get(column))
                .copied();

            if let Some(ty) = ty {
                bind.infer_type(ty);
            }
        }
    }

    /// Output binds, in placeholder order.
    pub fn outputs(&self) -> impl Iterator<Item = &BindValue> {
        self.binds.iter().filter(|bind| bind.output)
    }
}
