use crate::Statement;

use serde::{Deserialize, Serialize};

/// Identifies an open cursor on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CursorId(pub String);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub statement: Statement,

    pub cursor: Option<CursorId>,

    /// Rows per batch for cursor operations
    pub array_fetch_size: Option<usize>,

    /// Return column metadata only
    pub describe_only: bool,

    /// The statement carries a `returning` clause
    pub returning: bool,
}

impl Request {
    pub fn new(statement: Statement) -> Request {
        Request {
            returning: !statement.returning.is_empty(),
            statement,
            ..Request::default()
        }
    }

    pub fn with_array_fetch_size(mut self, size: usize) -> Request {
        self.array_fetch_size = Some(size);
        self
    }

    pub fn describe_only(mut self) -> Request {
        self.describe_only = true;
        self
    }
}

impl core::fmt::Display for CursorId {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
