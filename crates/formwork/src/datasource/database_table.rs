use super::{materialize, Cursor, DataSource, DmlQueue, LockStatus};
use crate::{LockMode, Session};

use formwork_core::{
    async_trait,
    gateway::{Batch, DmlKind, Operation, Request, Response},
    Error, FilterStructure, Record, RecordArena, RecordId, Result, Type,
};
use formwork_sql::Table;

use indexmap::IndexMap;
use std::sync::Arc;

/// A backend table, read through a cursor and written with batched DML.
#[derive(Debug)]
pub struct DatabaseTable {
    session: Session,

    table: Table,

    columns: Arc<[String]>,

    types: IndexMap<String, Type>,

    described: bool,

    /// `order by` clause for queries
    order: Option<String>,

    /// Columns the backend generates and returns after insert or update
    returning: Vec<String>,

    array_fetch_size: usize,

    transactional: bool,

    cursor: Cursor,

    queue: DmlQueue,
}

impl DatabaseTable {
    pub fn new(session: &Session, table: Table) -> DatabaseTable {
        DatabaseTable {
            session: session.clone(),
            table,
            columns: Arc::from(Vec::new()),
            types: IndexMap::new(),
            described: false,
            order: None,
            returning: vec![],
            array_fetch_size: session.config().array_fetch_size,
            transactional: session.config().transactional,
            cursor: Cursor::new(),
            queue: DmlQueue::default(),
        }
    }

    pub fn with_order(mut self, order: impl Into<String>) -> DatabaseTable {
        self.order = Some(order.into());
        self
    }

    pub fn with_returning<I>(mut self, columns: I) -> DatabaseTable
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.returning = columns
            .into_iter()
            .map(|column| column.into().to_lowercase())
            .collect();
        self
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    fn record(&self, row: Vec<formwork_core::Value>) -> Record {
        let row = materialize(&self.columns, &self.types, row);
        Record::from_row(self.columns.clone(), self.transactional, row)
    }

    /// `id=7, name='Ann'` for the record's key, as last synchronized.
    fn row_label(&self, record: &Record) -> String {
        let key: Vec<&String> = if self.table.primary_key.is_empty() {
            record.columns().iter().collect()
        } else {
            self.table.primary_key.iter().collect()
        };

        key.into_iter()
            .map(|column| {
                let value = record.initial_value(column).cloned().unwrap_or_default();
                format!("{column}={}", value.to_sql_literal())
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Map one batch result onto its record. Returns whether it applied.
    /// Send one batch and check it answered every statement.
    async fn exec_batch(
        &self,
        kind: DmlKind,
        requests: Vec<Request>,
        expected: usize,
    ) -> Result<Response> {
        let response = self
            .session
            .exec(Operation::Batch(Batch { kind, requests }))
            .await?;

        if response.results.len() != expected {
            return Err(Error::gateway(format!(
                "{kind:?} batch returned {} results for {expected} statements",
                response.results.len(),
            )));
        }

        Ok(response)
    }

    async fn apply(&mut self, kind: DmlKind, record: &mut Record, result: Response) -> Result<bool> {
        let result = Arc::new(result);
        record.set_response(Some(result.clone()));

        if result.success {
            if kind != DmlKind::Delete {
                if let Some(row) = result.rows.first() {
                    for (column, value) in result.columns.iter().zip(row) {
                        if record.get_value(column).is_some() {
                            let ty = self.types.get(column).copied();
                            record.set_value(column, value.clone().materialize(ty))?;
                        }
                    }
                }
                record.clean(false);
            }

            record.set_failed(false);
            return Ok(true);
        }

        record.set_failed(true);

        let diagnostics = self.session.diagnostics();

        if let Some(violations) = result.violations.as_deref().filter(|v| !v.is_empty()) {
            // The row still exists and our lock on it holds
            record.set_locked(true);
            diagnostics.warning(format!(
                "row {} of `{}` was changed by another user ({}); record refreshed",
                self.row_label(record),
                self.table.name,
                violations.join(", "),
            ));
            self.refresh(record).await?;
        } else if result.is_row_missing() {
            record.set_locked(false);
            diagnostics.warning(format!(
                "row {} of `{}` was deleted by another user",
                self.row_label(record),
                self.table.name,
            ));
        } else {
            diagnostics.severe(format!(
                "{kind:?} on `{}` failed: {}",
                self.table.name,
                result.message.as_deref().unwrap_or("no message"),
            ));
        }

        Ok(false)
    }
}

#[async_trait]
impl DataSource for DatabaseTable {
    fn name(&self) -> &str {
        &self.table.name
    }

    fn columns(&self) -> &Arc<[String]> {
        &self.columns
    }

    fn types(&self) -> &IndexMap<String, Type> {
        &self.types
    }

    fn is_described(&self) -> bool {
        self.described
    }

    fn is_transactional(&self) -> bool {
        self.transactional
    }

    fn lock_mode(&self) -> LockMode {
        LockMode::Pessimistic
    }

    fn is_eof(&self) -> bool {
        self.cursor.is_eof()
    }

    fn array_fetch_size(&self) -> usize {
        self.array_fetch_size
    }

    fn set_array_fetch_size(&mut self, size: usize) {
        self.array_fetch_size = size.max(1);
    }

    async fn describe(&mut self) -> Result<()> {
        if self.described {
            return Ok(());
        }

        let statement = formwork_sql::describe(&self.table.name, &[]);
        let response = self
            .session
            .describe(statement)
            .await
            .map_err(|err| err.context(Error::describe_failed(&self.table.name)))?;

        self.columns = response.columns.iter().cloned().collect();
        self.types = response.type_map();
        self.described = true;
        Ok(())
    }

    async fn query(&mut self, filter: Option<&FilterStructure>) -> Result<()> {
        self.describe().await?;

        let mut stmt = formwork_sql::select(
            &self.table.name,
            &self.columns,
            filter,
            self.order.as_deref(),
        );
        stmt.infer_types(&self.types);

        self.cursor
            .open(&self.session, stmt, self.array_fetch_size)
            .await
    }

    async fn fetch(&mut self) -> Result<Vec<Record>> {
        let rows = self
            .cursor
            .next(&self.session, self.array_fetch_size)
            .await?;

        Ok(rows.into_iter().map(|row| self.record(row)).collect())
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
        for kind in [DmlKind::Insert, DmlKind::Update, DmlKind::Delete] {
            let mut ids = vec![];
            let mut requests = vec![];

            for id in self.queue.take(kind) {
                let Some(record) = records.get(id) else {
                    continue;
                };

                let stmt = match kind {
                    DmlKind::Insert => Some(formwork_sql::insert(&self.table, record, &self.returning)),
                    DmlKind::Update => formwork_sql::update(
                        &self.table,
                        record,
                        &self.returning,
                        !record.is_locked(),
                    ),
                    DmlKind::Delete => Some(formwork_sql::delete(&self.table, record)),
                };

                // An update with nothing dirty has nothing to send
                let Some(mut stmt) = stmt else {
                    applied.push(id);
                    continue;
                };

                stmt.infer_types(&self.types);
                ids.push(id);
                requests.push(Request::new(stmt));
            }

            if requests.is_empty() {
                continue;
            }

            let response = match self.exec_batch(kind, requests, ids.len()).await {
                Ok(response) => response,
                Err(err) => {
                    // The whole batch is rejected; later kinds stay queued
                    for id in &ids {
                        if let Some(record) = records.get_mut(*id) {
                            record.set_failed(true);
                        }
                    }
                    return Err(err);
                }
            };

            for (id, result) in ids.into_iter().zip(response.results) {
                let Some(record) = records.get_mut(id) else {
                    continue;
                };

                if self.apply(kind, record, result).await? {
                    applied.push(id);
                }
            }
        }

        Ok(())
    }

    fn is_queued(&self, id: RecordId) -> bool {
        self.queue.contains(id)
    }

    async fn lock(&mut self, record: &mut Record) -> Result<LockStatus> {
        let mut stmt = formwork_sql::lock(&self.table, record);
        stmt.infer_types(&self.types);

        let response = self.session.exec(Operation::Lock(Request::new(stmt))).await?;

        let Some(row) = response.rows.into_iter().next() else {
            record.set_locked(false);
            self.session.diagnostics().warning(format!(
                "row {} of `{}` was deleted by another user",
                self.row_label(record),
                self.table.name,
            ));
            return Ok(LockStatus::Deleted);
        };

        let row = materialize(&self.columns, &self.types, row);
        record.set_locked(true);

        let changed: Vec<&str> = self
            .columns
            .iter()
            .zip(&row)
            .filter(|(column, value)| {
                !record
                    .initial_value(column)
                    .is_some_and(|initial| initial.same_as(value))
            })
            .map(|(column, _)| column.as_str())
            .collect();

        if changed.is_empty() {
            return Ok(LockStatus::Locked);
        }

        self.session.diagnostics().warning(format!(
            "row {} of `{}` was changed by another user ({}); record refreshed",
            self.row_label(record),
            self.table.name,
            changed.join(", "),
        ));

        record.load(row);
        Ok(LockStatus::Changed)
    }

    async fn refresh(&mut self, record: &mut Record) -> Result<bool> {
        let mut stmt = formwork_sql::refresh(&self.table, record);
        stmt.infer_types(&self.types);

        let response = self
            .session
            .exec(Operation::Refresh(Request::new(stmt)))
            .await?;

        match response.rows.into_iter().next() {
            Some(row) => {
                record.load(materialize(&self.columns, &self.types, row));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn undo(&mut self, records: &mut RecordArena) -> Vec<RecordId> {
        self.queue.undo(records)
    }
}
