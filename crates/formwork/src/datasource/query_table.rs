use super::{materialize, Cursor, DataSource, LockStatus};
use crate::{LockMode, Session};

use formwork_core::{
    async_trait, Error, FilterStructure, Record, RecordArena, RecordId, Result, Statement, Type,
};

use indexmap::IndexMap;
use std::sync::Arc;

/// A read-only source over an ad-hoc query.
///
/// The query is wrapped as `select * from (<query>) q` so that filters and
/// ordering apply to its result. Any attempt to write or lock raises a
/// severe diagnostic and fails with a read-only error.
#[derive(Debug)]
pub struct QueryTable {
    session: Session,

    name: String,

    query: Statement,

    columns: Arc<[String]>,

    types: IndexMap<String, Type>,

    described: bool,

    order: Option<String>,

    array_fetch_size: usize,

    cursor: Cursor,
}

impl QueryTable {
    pub fn new(session: &Session, name: impl Into<String>, query: Statement) -> QueryTable {
        QueryTable {
            session: session.clone(),
            name: name.into(),
            query,
            columns: Arc::from(Vec::new()),
            types: IndexMap::new(),
            described: false,
            order: None,
            array_fetch_size: session.config().array_fetch_size,
            cursor: Cursor::new(),
        }
    }

    pub fn with_order(mut self, order: impl Into<String>) -> QueryTable {
        self.order = Some(order.into());
        self
    }

    pub fn query(&self) -> &Statement {
        &self.query
    }

    fn source(&self) -> String {
        format!("({}) q", self.query.text)
    }

    fn reject(&self, operation: &'static str) -> Error {
        let err = Error::read_only(&self.name, operation);
        self.session.diagnostics().severe(err.to_string());
        err
    }
}

#[async_trait]
impl DataSource for QueryTable {
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
        self.described
    }

    fn is_transactional(&self) -> bool {
        false
    }

    fn lock_mode(&self) -> LockMode {
        LockMode::None
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

        let mut statement = formwork_sql::describe(&self.source(), &[]);
        statement.binds = self.query.binds.clone();

        let response = self
            .session
            .describe(statement)
            .await
            .map_err(|err| err.context(Error::describe_failed(&self.name)))?;

        self.columns = response.columns.iter().cloned().collect();
        self.types = response.type_map();
        self.described = true;
        Ok(())
    }

    async fn query(&mut self, filter: Option<&FilterStructure>) -> Result<()> {
        self.describe().await?;

        let wrapped = Statement {
            text: format!("select * from {}", self.source()),
            binds: self.query.binds.clone(),
            ..Statement::default()
        };

        let mut stmt = formwork_sql::finish(&wrapped, filter, self.order.as_deref());
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

        Ok(rows
            .into_iter()
            .map(|row| {
                let row = materialize(&self.columns, &self.types, row);
                Record::from_row(self.columns.clone(), false, row)
            })
            .collect())
    }

    fn insert(&mut self, _id: RecordId) -> Result<()> {
        Err(self.reject("insert"))
    }

    fn update(&mut self, _id: RecordId) -> Result<()> {
        Err(self.reject("update"))
    }

    fn delete(&mut self, _id: RecordId) -> Result<()> {
        Err(self.reject("delete"))
    }

    fn pending(&self) -> usize {
        0
    }

    async fn flush(&mut self, _records: &mut RecordArena, _applied: &mut Vec<RecordId>) -> Result<()> {
        Ok(())
    }

    fn is_queued(&self, _id: RecordId) -> bool {
        false
    }

    async fn lock(&mut self, _record: &mut Record) -> Result<LockStatus> {
        Err(self.reject("lock"))
    }

    async fn refresh(&mut self, _record: &mut Record) -> Result<bool> {
        Ok(false)
    }

    fn undo(&mut self, _records: &mut RecordArena) -> Vec<RecordId> {
        vec![]
    }
}
