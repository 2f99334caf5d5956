use super::CursorId;
use crate::{Error, Result, Type, Value};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The backend's answer to an [`Operation`](super::Operation).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Response {
    pub success: bool,

    pub message: Option<String>,

    pub columns: Vec<String>,

    /// Backend type names, parallel to `columns`
    pub types: Vec<String>,

    pub rows: Vec<Vec<Value>>,

    pub cursor: Option<CursorId>,

    /// Columns whose current backend value broke an optimistic-lock
    /// assertion
    pub violations: Option<Vec<String>>,

    /// Rows returned by the lock re-check preceding a DML statement. Empty
    /// when the row no longer exists.
    pub lock: Option<Vec<Vec<Value>>>,

    /// Per-statement results of a batch
    pub results: Vec<Response>,
}

impl Response {
    pub fn ok() -> Response {
        Response {
            success: true,
            ..Response::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Response {
        Response {
            success: false,
            message: Some(message.into()),
            ..Response::default()
        }
    }

    /// A successful result set.
    pub fn rows<C, T>(columns: C, types: T, rows: Vec<Vec<Value>>) -> Response
    where
        C: IntoIterator,
        C::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Response {
            success: true,
            columns: columns.into_iter().map(Into::into).collect(),
            types: types.into_iter().map(Into::into).collect(),
            rows,
            ..Response::default()
        }
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Response {
        self.cursor = Some(CursorId(cursor.into()));
        self
    }

    pub fn with_results(mut self, results: Vec<Response>) -> Response {
        self.results = results;
        self
    }

    /// Lower-case column and type names, recursively.
    pub fn normalize(mut self) -> Response {
        for name in self.columns.iter_mut().chain(self.types.iter_mut()) {
            name.make_ascii_lowercase();
        }
        if let Some(violations) = &mut self.violations {
            for name in violations {
                name.make_ascii_lowercase();
            }
        }
        self.results = self.results.into_iter().map(Response::normalize).collect();
        self
    }

    /// Turn a rejected response into an error.
    pub fn into_result(self) -> Result<Response> {
        if self.success {
            Ok(self)
        } else {
            Err(Error::gateway(
                self.message.as_deref().unwrap_or("request failed"),
            ))
        }
    }

    /// Column name to semantic type.
    pub fn type_map(&self) -> IndexMap<String, Type> {
        self.columns
            .iter()
            .zip(&self.types)
            .map(|(column, ty)| (column.to_ascii_lowercase(), Type::from_backend(ty)))
            .collect()
    }

    /// True for a failed row whose lock re-check found the row gone.
    pub fn is_row_missing(&self) -> bool {
        self.lock.as_ref().is_some_and(|rows| rows.is_empty())
    }

    /// True for a failed row whose optimistic-lock assertion did not hold.
    pub fn has_violations(&self) -> bool {
        self.violations.as_ref().is_some_and(|v| !v.is_empty())
    }
}
