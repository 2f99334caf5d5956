//! Backends a block reads records from and writes them back to.

mod cursor;
use cursor::Cursor;

mod database_table;
pub use database_table::DatabaseTable;

mod memory_table;
pub use memory_table::MemoryTable;

mod query_table;
pub use query_table::QueryTable;

mod queue;
use queue::DmlQueue;

use crate::LockMode;

use formwork_core::{
    async_trait, FilterStructure, Record, RecordArena, RecordId, Result, Type, Value,
};

use indexmap::IndexMap;
use std::{fmt, sync::Arc};

/// Outcome of locking a record's row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    /// The row is locked and matches the record's synchronized values
    Locked,

    /// The row is locked but was changed underneath; the record has been
    /// reloaded with the backend values
    Changed,

    /// The row no longer exists
    Deleted,
}

/// The contract every data source implements.
///
/// DML is queued by `insert`, `update` and `delete` and only reaches the
/// backend on `flush`. Queued records are referenced by their id in the
/// caller's [`RecordArena`].
#[async_trait]
pub trait DataSource: fmt::Debug + Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Lower-cased column names, in order. Empty until described.
    fn columns(&self) -> &Arc<[String]>;

    /// Described type of each column
    fn types(&self) -> &IndexMap<String, Type>;

    fn is_described(&self) -> bool;

    /// Confirmed record states collapse to `Consistent` when false
    fn is_transactional(&self) -> bool;

    /// The strongest lock mode the source supports
    fn lock_mode(&self) -> LockMode;

    /// True once the open query has no more rows
    fn is_eof(&self) -> bool;

    fn array_fetch_size(&self) -> usize;

    fn set_array_fetch_size(&mut self, size: usize);

    /// An empty record shaped like this source's rows.
    fn new_record(&self) -> Record {
        Record::new(self.columns().clone(), self.is_transactional())
    }

    /// Learn the column names and types. Only the first call does work.
    async fn describe(&mut self) -> Result<()>;

    /// Open a new query, abandoning any previous one. Rows are buffered
    /// and returned by the following `fetch` calls.
    async fn query(&mut self, filter: Option<&FilterStructure>) -> Result<()>;

    /// The next batch of rows. An empty batch means end of data.
    async fn fetch(&mut self) -> Result<Vec<Record>>;

    fn insert(&mut self, id: RecordId) -> Result<()>;

    fn update(&mut self, id: RecordId) -> Result<()>;

    fn delete(&mut self, id: RecordId) -> Result<()>;

    /// Number of queued records.
    fn pending(&self) -> usize;

    /// Send queued DML, one batch per operation kind, pushing the records
    /// that were applied onto `applied`. Rejected records are marked
    /// failed.
    ///
    /// On error, `applied` still holds what earlier batches wrote and
    /// kinds not yet sent stay queued.
    async fn flush(&mut self, records: &mut RecordArena, applied: &mut Vec<RecordId>) -> Result<()>;

    /// True while `id` waits in the queue for the next flush.
    fn is_queued(&self, id: RecordId) -> bool;

    async fn lock(&mut self, record: &mut Record) -> Result<LockStatus>;

    /// Reload a record from the backend. Returns `false` if the row is
    /// gone.
    async fn refresh(&mut self, record: &mut Record) -> Result<bool>;

    /// Forget queued DML, reverting queued records to their synchronized
    /// values. Queued inserts are removed from `records` and returned.
    fn undo(&mut self, records: &mut RecordArena) -> Vec<RecordId>;
}

/// Restore temporal values in a fetched row using the described types.
pub(crate) fn materialize(
    columns: &[String],
    types: &IndexMap<String, Type>,
    row: Vec<Value>,
) -> Vec<Value> {
    row.into_iter()
        .enumerate()
        .map(|(i, value)| {
            let ty = columns.get(i).and_then(|column| types.get(column)).copied();
            value.materialize(ty)
        })
        .collect()
}
