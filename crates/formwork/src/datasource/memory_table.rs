use super::{DataSource, DmlQueue, LockStatus};
use crate::LockMode;

use formwork_core::{
    async_trait, gateway::DmlKind, FilterStructure, Record, RecordArena, RecordId, Result, Type,
    Value,
};

use indexmap::IndexMap;
use std::{cmp::Ordering, sync::Arc};

/// Rows held in memory.
///
/// Filters are evaluated locally and results sorted by the configured
/// order. The table is not transactional: flushed records are `Consistent`
/// immediately, and locking always succeeds.
#[derive(Debug)]
pub struct MemoryTable {
    name: String,

    columns: Arc<[String]>,

    types: IndexMap<String, Type>,

    /// Keyed by row token
    rows: IndexMap<u64, Vec<Value>>,

    next_token: u64,

    /// Sort keys, `true` for descending
    order: Vec<(String, bool)>,

    /// Row tokens matching the open query, in order
    result: Vec<u64>,

    position: usize,

    eof: bool,

    array_fetch_size: usize,

    queue: DmlQueue,
}

impl MemoryTable {
    pub fn new<I>(name: impl Into<String>, columns: I) -> MemoryTable
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        MemoryTable {
            name: name.into(),
            columns: columns
                .into_iter()
                .map(|column| column.into().to_lowercase())
                .collect(),
            types: IndexMap::new(),
            rows: IndexMap::new(),
            next_token: 0,
            order: vec![],
            result: vec![],
            position: 0,
            eof: true,
            array_fetch_size: 32,
            queue: DmlQueue::default(),
        }
    }

    pub fn with_types<I>(mut self, types: I) -> MemoryTable
    where
        I: IntoIterator<Item = (String, Type)>,
    {
        self.types = types
            .into_iter()
            .map(|(column, ty)| (column.to_lowercase(), ty))
            .collect();
        self
    }

    pub fn with_rows(mut self, rows: Vec<Vec<Value>>) -> MemoryTable {
        for row in rows {
            self.push_row(row);
        }
        self
    }

    /// Sort by a comma separated list of columns, each optionally
    /// followed by `asc` or `desc`.
    pub fn with_order(mut self, order: &str) -> MemoryTable {
        self.set_order(order);
        self
    }

    pub fn set_order(&mut self, order: &str) {
        self.order = order
            .split(',')
            .filter_map(|key| {
                let mut parts = key.split_whitespace();
                let column = parts.next()?.to_lowercase();
                let descending = parts
                    .next()
                    .is_some_and(|dir| dir.eq_ignore_ascii_case("desc"));
                Some((column, descending))
            })
            .collect();
    }

    /// Add a row, returning its token.
    pub fn push_row(&mut self, mut row: Vec<Value>) -> u64 {
        row.resize(self.columns.len(), Value::Null);

        let token = self.next_token;
        self.next_token += 1;
        self.rows.insert(token, row);
        token
    }

    pub fn rows(&self) -> impl Iterator<Item = &Vec<Value>> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn record(&self, token: u64, row: &[Value]) -> Record {
        let mut record = Record::from_row(self.columns.clone(), false, row.to_vec());
        record.set_row_token(Some(token));
        record
    }

    fn compare(&self, a: &[Value], b: &[Value]) -> Ordering {
        for (column, descending) in &self.order {
            let Some(i) = self.columns.iter().position(|c| c == column) else {
                continue;
            };

            // Nulls sort last in either direction
            let ord = match (a[i].is_null(), b[i].is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => return Ordering::Greater,
                (false, true) => return Ordering::Less,
                (false, false) => a[i].compare(&b[i]).unwrap_or(Ordering::Equal),
            };

            let ord = if *descending { ord.reverse() } else { ord };

            if ord != Ordering::Equal {
                return ord;
            }
        }

        Ordering::Equal
    }
}

#[async_trait]
impl DataSource for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &Arc<[String]> {
        &self.columns
    }

    fn types(&self) -> &IndexMap<String, Type> {
        &self.types
    }

    fn is_described(&self) -> bool {
        true
    }

    fn is_transactional(&self) -> bool {
        false
    }

    fn lock_mode(&self) -> LockMode {
        LockMode::None
    }

    fn is_eof(&self) -> bool {
        self.eof
    }

    fn array_fetch_size(&self) -> usize {
        self.array_fetch_size
    }

    fn set_array_fetch_size(&mut self, size: usize) {
        self.array_fetch_size = size.max(1);
    }

    async fn describe(&mut self) -> Result<()> {
        Ok(())
    }

    async fn query(&mut self, filter: Option<&FilterStructure>) -> Result<()> {
        let mut result: Vec<(u64, &Vec<Value>)> = self
            .rows
            .iter()
            .filter(|(token, row)| match filter {
                Some(filter) => filter.evaluate(&self.record(**token, row)),
                None => true,
            })
            .map(|(token, row)| (*token, row))
            .collect();

        result.sort_by(|(_, a), (_, b)| self.compare(a, b));

        self.result = result.into_iter().map(|(token, _)| token).collect();
        self.position = 0;
        self.eof = false;
        Ok(())
    }

    async fn fetch(&mut self) -> Result<Vec<Record>> {
        if self.eof {
            return Ok(vec![]);
        }

        let end = (self.position + self.array_fetch_size).min(self.result.len());

        let batch: Vec<Record> = self.result[self.position..end]
            .iter()
            .filter_map(|token| Some(self.record(*token, self.rows.get(token)?)))
            .collect();

        if end - self.position < self.array_fetch_size {
            self.eof = true;
        }

        self.position = end;
        Ok(batch)
    }

    fn insert(&mut self, id: RecordId) -> Result<()> {
        self.queue.push(DmlKind::Insert, id);
        Ok(())
    }

    fn update(&mut self, id: RecordId) -> Result<()> {
        self.queue.push(DmlKind::Update, id);
        Ok(())
    }

    fn delete(&mut self, id: RecordId) -> Result<()> {
        self.queue.push(DmlKind::Delete, id);
        Ok(())
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }

    async fn flush(&mut self, records: &mut RecordArena, applied: &mut Vec<RecordId>) -> Result<()> {

        for id in self.queue.take(DmlKind::Insert) {
            let Some(record) = records.get_mut(id) else {
                continue;
            };

            let token = self.push_row(record.row());
            record.set_row_token(Some(token));
            record.clean(false);
            applied.push(id);
        }

        for kind in [DmlKind::Update, DmlKind::Delete] {
            for id in self.queue.take(kind) {
                let Some(record) = records.get_mut(id) else {
                    continue;
                };

                let Some(token) = record.row_token().filter(|t| self.rows.contains_key(t)) else {
                    record.set_failed(true);
                    continue;
                };

                if kind == DmlKind::Update {
                    self.rows.insert(token, record.row());
                    record.clean(false);
                } else {
                    self.rows.shift_remove(&token);
                }

                applied.push(id);
            }
        }

        Ok(())
    }

    fn is_queued(&self, id: RecordId) -> bool {
        self.queue.contains(id)
    }

    async fn lock(&mut self, _record: &mut Record) -> Result<LockStatus> {
        Ok(LockStatus::Locked)
    }

    async fn refresh(&mut self, record: &mut Record) -> Result<bool> {
        let row = record.row_token().and_then(|token| self.rows.get(&token));

        match row {
            Some(row) => {
                record.load(row.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn undo(&mut self, records: &mut RecordArena) -> Vec<RecordId> {
        self.queue.undo(records)
    }
}
