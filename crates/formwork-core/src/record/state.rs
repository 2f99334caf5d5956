use serde::{Deserialize, Serialize};

/// Where a record stands relative to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordState {
    /// Created locally, not yet queued for insert
    New,

    /// Queued for insert
    Insert,

    /// Inserted, awaiting commit
    Inserted,

    /// Matches the backend
    Consistent,

    /// Queued for update
    Update,

    /// Updated, awaiting commit
    Updated,

    /// Queued for delete
    Delete,

    /// Deleted, awaiting commit
    Deleted,

    /// Search template used by query-by-example; never flushed
    QueryFilter,
}

impl RecordState {
    /// States reached after a successful flush on a transactional source.
    pub fn is_confirmed(self) -> bool {
        matches!(
            self,
            RecordState::Inserted | RecordState::Updated | RecordState::Deleted
        )
    }

    /// States whose changes are queued but not yet flushed.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            RecordState::Insert | RecordState::Update | RecordState::Delete
        )
    }

    /// True for records the backend has not seen yet.
    pub fn is_new(self) -> bool {
        matches!(self, RecordState::New | RecordState::Insert)
    }
}
