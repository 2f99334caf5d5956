use super::{CursorId, Request};

use serde::{Deserialize, Serialize};

/// A single round trip to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Zero-row query returning column names and types only
    Describe(Request),

    /// Open a cursor and return its first batch
    Select(Request),

    /// Continue an open cursor
    Fetch(Fetch),

    /// Run several DML statements of one kind
    Batch(Batch),

    /// Call a stored procedure
    Call(Request),

    /// Select a row `for update`
    Lock(Request),

    /// Re-read a single row
    Refresh(Request),

    /// Tear down a cursor that was not read to the end
    Close { cursor: CursorId },

    Commit,

    Rollback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fetch {
    pub cursor: CursorId,
    pub array_fetch_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub kind: DmlKind,
    pub requests: Vec<Request>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DmlKind {
    Insert,
    Update,
    Delete,
}

impl Operation {
    /// The statement text carried by the operation, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Operation::Describe(req)
            | Operation::Select(req)
            | Operation::Call(req)
            | Operation::Lock(req)
            | Operation::Refresh(req) => Some(&req.statement.text),
            _ => None,
        }
    }

    pub fn is_describe(&self) -> bool {
        matches!(self, Operation::Describe(_))
    }

    pub fn is_select(&self) -> bool {
        matches!(self, Operation::Select(_))
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, Operation::Fetch(_))
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Operation::Batch(_))
    }

    pub fn is_lock(&self) -> bool {
        matches!(self, Operation::Lock(_))
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Operation::Close { .. })
    }
}
