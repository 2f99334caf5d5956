mod arena;
pub use arena::{RecordArena, RecordId};

mod state;
pub use state::RecordState;

use crate::{gateway::Response, Error, Result, Value};

use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;

/// One row of data with its synchronization state.
///
/// Values are keyed by lower-cased column name. The data source's columns
/// come first, followed by columns the wrapper adds for its own use; only
/// the former are ever tracked as dirty and flushed.
#[derive(Debug, Clone)]
pub struct Record {
    /// Columns owned by the data source
    columns: Arc<[String]>,

    values: IndexMap<String, Value>,

    /// Values as last synchronized with the backend
    initial: IndexMap<String, Value>,

    dirty: IndexSet<String>,

    state: RecordState,

    /// Confirmed states collapse to `Consistent` when false
    transactional: bool,

    locked: bool,

    failed: bool,

    /// Set once the wrapper has pulled the record into its cache
    prepared: bool,

    /// Backing row in an in-memory table
    row_token: Option<u64>,

    response: Option<Arc<Response>>,
}

impl Record {
    /// Create an empty record with every column null.
    pub fn new(columns: Arc<[String]>, transactional: bool) -> Record {
        let values: IndexMap<_, _> = columns
            .iter()
            .map(|column| (column.clone(), Value::Null))
            .collect();

        Record {
            columns,
            initial: values.clone(),
            values,
            dirty: IndexSet::new(),
            state: RecordState::New,
            transactional,
            locked: false,
            failed: false,
            prepared: false,
            row_token: None,
            response: None,
        }
    }

    /// Create a record from a fetched row. The row is taken as the
    /// synchronized snapshot.
    pub fn from_row(columns: Arc<[String]>, transactional: bool, row: Vec<Value>) -> Record {
        let mut record = Record::new(columns, transactional);
        record.load(row);
        record.state = RecordState::Consistent;
        record
    }

    /// Add wrapper-only columns. They hold values but are never flushed.
    pub fn add_columns<I>(&mut self, columns: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for column in columns {
            let column = column.as_ref().to_ascii_lowercase();
            self.values.entry(column.clone()).or_default();
            self.initial.entry(column).or_default();
        }
    }

    /// Data-source columns, in order.
    pub fn columns(&self) -> &Arc<[String]> {
        &self.columns
    }

    /// Replace current and synchronized values of the data-source columns
    /// with `row`, positionally.
    pub fn load(&mut self, row: Vec<Value>) {
        for (column, value) in self.columns.iter().zip(row) {
            self.values.insert(column.clone(), value.clone());
            self.initial.insert(column.clone(), value);
        }
        self.dirty.clear();
    }

    pub fn get_value(&self, column: &str) -> Option<&Value> {
        lookup(&self.values, column)
    }

    /// The value of `column`, or null when the column is unknown.
    pub fn value(&self, column: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.get_value(column).unwrap_or(&NULL)
    }

    /// The value of `column` as last synchronized with the backend.
    pub fn initial_value(&self, column: &str) -> Option<&Value> {
        lookup(&self.initial, column)
    }

    /// Current values of the data-source columns, in column order.
    pub fn row(&self) -> Vec<Value> {
        self.columns
            .iter()
            .map(|column| self.values.get(column).cloned().unwrap_or_default())
            .collect()
    }

    /// Iterate all columns and values, wrapper columns included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Set a column's value and update its dirty flag.
    ///
    /// Returns `false` when the new value equals the current one, in which
    /// case nothing changes.
    pub fn set_value(&mut self, column: &str, value: impl Into<Value>) -> Result<bool> {
        let value = value.into();
        let key = self.key(column)?;

        if self.values[&key].same_as(&value) {
            return Ok(false);
        }

        if self.columns.contains(&key) {
            let unchanged = self
                .initial
                .get(&key)
                .is_some_and(|initial| initial.same_as(&value));

            if unchanged {
                self.dirty.shift_remove(&key);
            } else {
                self.dirty.insert(key.clone());
            }
        }

        self.values.insert(key, value);
        Ok(true)
    }

    /// Mark a data-source column dirty regardless of its value.
    pub fn set_dirty(&mut self, column: &str) -> Result<()> {
        let key = self.key(column)?;
        if self.columns.contains(&key) {
            self.dirty.insert(key);
        }
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn is_column_dirty(&self, column: &str) -> bool {
        self.dirty.contains(column) || self.dirty.contains(&column.to_ascii_lowercase())
    }

    /// Dirty columns, in the order they were first modified.
    pub fn dirty_columns(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Wipe every value, current and synchronized, to null.
    pub fn clear(&mut self) {
        for value in self.values.values_mut().chain(self.initial.values_mut()) {
            *value = Value::Null;
        }
        self.dirty.clear();
    }

    /// Discard edits by reloading the synchronized snapshot.
    pub fn refresh(&mut self) {
        self.values.clone_from(&self.initial);
        self.dirty.clear();
    }

    /// Accept the current values as the new synchronized snapshot.
    pub fn clean(&mut self, release_lock: bool) {
        self.initial.clone_from(&self.values);
        self.dirty.clear();
        self.failed = false;
        if release_lock {
            self.locked = false;
        }
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    /// Move to `state`. Confirmed states collapse to `Consistent` on a
    /// non-transactional source.
    pub fn set_state(&mut self, state: RecordState) {
        self.state = if !self.transactional && state.is_confirmed() {
            RecordState::Consistent
        } else {
            state
        };
    }

    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn set_failed(&mut self, failed: bool) {
        self.failed = failed;
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub fn set_prepared(&mut self, prepared: bool) {
        self.prepared = prepared;
    }

    pub fn row_token(&self) -> Option<u64> {
        self.row_token
    }

    pub fn set_row_token(&mut self, token: Option<u64>) {
        self.row_token = token;
    }

    /// The last backend response concerning this record.
    pub fn response(&self) -> Option<&Arc<Response>> {
        self.response.as_ref()
    }

    pub fn set_response(&mut self, response: Option<Arc<Response>>) {
        self.response = response;
    }

    fn key(&self, column: &str) -> Result<String> {
        if self.values.contains_key(column) {
            return Ok(column.to_string());
        }

        let lower = column.to_ascii_lowercase();
        if self.values.contains_key(&lower) {
            Ok(lower)
        } else {
            Err(Error::unknown_column(column))
        }
    }
}

fn lookup<'a>(values: &'a IndexMap<String, Value>, column: &str) -> Option<&'a Value> {
    values
        .get(column)
        .or_else(|| values.get(&column.to_ascii_lowercase()))
}
