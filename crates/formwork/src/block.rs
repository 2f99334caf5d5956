mod definition;
pub use definition::BlockDefinition;

mod events;
pub use events::{Events, NoEvents};

mod state;
pub(crate) use state::BlockState;

mod view;
pub use view::{NoView, View};

use crate::{Diagnostics, Form, QueryByExample, QueryToken};

use formwork_core::{
    Error, Filter, FilterNode, FilterStructure, Record, RecordId, Result, Value,
};

use async_recursion::async_recursion;
use std::{fmt, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One screen region bound to a data source.
///
/// A `Block` is a cheap handle; clones address the same block. Operations
/// on one block are serialized, while different blocks may query
/// concurrently.
///
/// Failures that concern the user, such as a lost connection or a rejected
/// lock, are reported through the session's [`Diagnostics`] and turn into a
/// `false` result. Only misuse, like naming an unknown column, is returned
/// as an error.
#[derive(Clone)]
pub struct Block {
    form: Form,
    name: String,
    state: Arc<Mutex<BlockState>>,
}

enum QueryOutcome {
    Applied,

    /// Superseded by a newer query; results were dropped
    Stale,

    /// Vetoed by a hook or missing master record
    Aborted,
}

impl Block {
    pub(crate) fn new(form: Form, name: String, state: Arc<Mutex<BlockState>>) -> Block {
        Block { form, name, state }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    fn diagnostics(&self) -> &Diagnostics {
        self.form.session().diagnostics()
    }

    /// Lock the block's state, warning the user if a previous operation
    /// keeps it busy for too long.
    async fn acquire(&self) -> OwnedMutexGuard<BlockState> {
        let config = self.form.session().config();
        let interval = config.query_poll_interval();

        let lock = self.state.clone().lock_owned();
        tokio::pin!(lock);

        let mut polls = 0;
        loop {
            match tokio::time::timeout(interval, &mut lock).await {
                Ok(guard) => return guard,
                Err(_) => {
                    polls += 1;
                    if polls == config.query_poll_limit {
                        self.diagnostics().warning(format!(
                            "block `{}` is waiting on previous query",
                            self.name
                        ));
                    }
                }
            }
        }
    }

    /// Report a failure to the user instead of the caller.
    fn outcome(&self, result: Result<bool>) -> Result<bool> {
        match result {
            Ok(done) => Ok(done),
            Err(err) if err.is_unknown_column() || err.is_unknown_block() => Err(err),
            // The data source already told the user
            Err(err) if err.is_read_only() => Ok(false),
            Err(err) => {
                self.diagnostics()
                    .severe(format!("block `{}`: {err}", self.name));
                Ok(false)
            }
        }
    }

    fn details(&self) -> Result<Vec<Block>> {
        self.form
            .coordinator()
            .details(&self.name)
            .map(|relation| self.form.block(&relation.detail))
            .collect()
    }

    pub async fn is_query_mode(&self) -> bool {
        self.acquire().await.query_mode
    }

    /// Number of cached records.
    pub async fn len(&self) -> usize {
        self.acquire().await.wrapper.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.acquire().await.wrapper.is_empty()
    }

    /// True once every record of the last query has been fetched.
    pub async fn is_eof(&self) -> bool {
        self.acquire().await.wrapper.is_eof()
    }

    // ---- Query ----

    /// Query the block's data source and cascade to its details.
    ///
    /// A query superseded by a newer one on the same block returns `true`
    /// without touching the block.
    pub async fn query(&self) -> Result<bool> {
        let token = self.form.queries().begin(&self.name, None);
        self.run_query(token).await
    }

    #[async_recursion]
    async fn run_query(&self, token: QueryToken) -> Result<bool> {
        let result = self.execute_query(&token).await;
        self.form.queries().finish(&self.name, &token);

        match result {
            Ok(QueryOutcome::Applied) => {}
            Ok(QueryOutcome::Stale) => return Ok(true),
            Ok(QueryOutcome::Aborted) => return Ok(false),
            Err(err) => return self.outcome(Err(err)),
        }

        self.query_details(Some(&token)).await?;
        Ok(true)
    }

    async fn query_details(&self, parent: Option<&QueryToken>) -> Result<()> {
        for detail in self.details()? {
            let token = self.form.queries().begin(&detail.name, parent);
            detail.run_query(token).await?;
        }
        Ok(())
    }

    async fn execute_query(&self, token: &QueryToken) -> Result<QueryOutcome> {
        let Some(master_filter) = self.master_filter().await? else {
            let mut state = self.acquire().await;
            state.wrapper.clear();
            state.current = None;
            state.view.clear();
            return Ok(QueryOutcome::Aborted);
        };

        let mut state = self.acquire().await;

        if token.is_cancelled() {
            return Ok(QueryOutcome::Stale);
        }

        if state.has_changes() {
            self.diagnostics().warning(format!(
                "block `{}` has unsaved changes; flush or undo before querying",
                self.name
            ));
            return Ok(QueryOutcome::Aborted);
        }

        let BlockState {
            wrapper,
            events,
            view,
            current,
            query_mode,
            qbe,
            filter: user_filter,
            master_filter: last_master_filter,
        } = &mut *state;

        let mut filter = FilterStructure::new();
        filter.and(master_filter.clone(), "master");
        filter.and(user_filter.clone(), "user");
        if *query_mode {
            if let Some(qbe) = qbe {
                filter.and(qbe.filters(), "qbe");
            }
        }
        *last_master_filter = master_filter;

        if !events.pre_query(&self.name, &mut filter).await {
            return Ok(QueryOutcome::Aborted);
        }

        if !wrapper.query(Some(&filter), token).await? {
            return Ok(QueryOutcome::Stale);
        }

        if *query_mode {
            if let Some(qbe) = qbe {
                qbe.clear();
            }
            *query_mode = false;
        }

        view.clear();
        *current = None;

        if wrapper.prefetch(0, 1).await? > 0 {
            *current = wrapper.get(0);
        }

        for id in wrapper.ids() {
            if let Some(record) = wrapper.record(*id) {
                view.display(*id, record);
            }
        }

        if !events.post_query(&self.name, wrapper.len()).await {
            return Ok(QueryOutcome::Aborted);
        }

        Ok(QueryOutcome::Applied)
    }

    /// Restrict this block to the current records of its masters.
    ///
    /// Returns `false`, leaving the previous restriction in place, when a
    /// master has no current record to correlate with.
    pub async fn set_master_dependencies(&self) -> Result<bool> {
        match self.master_filter().await? {
            Some(filter) => {
                self.acquire().await.master_filter = filter;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The restriction applied by the last query.
    pub async fn master_filter_snapshot(&self) -> FilterStructure {
        self.acquire().await.master_filter.clone()
    }

    /// One `Equals` per linked detail column, valued from the masters'
    /// current records. `None` when a master has nothing to offer.
    async fn master_filter(&self) -> Result<Option<FilterStructure>> {
        let mut structure = FilterStructure::new();

        for relation in self.form.coordinator().masters(&self.name) {
            let master = self.form.block(&relation.master)?;
            let state = master.acquire().await;

            let Some(record) = state.current_record() else {
                if state.query_mode && relation.orphan_queries {
                    continue;
                }

                self.diagnostics().warning(format!(
                    "block `{}` cannot be queried: master block `{}` has no current record",
                    self.name, relation.master
                ));
                return Ok(None);
            };

            for (master_column, detail_column) in relation.columns() {
                let value = record
                    .get_value(master_column)
                    .ok_or_else(|| Error::unknown_column(master_column))?;

                if value.is_null() {
                    self.diagnostics().warning(format!(
                        "block `{}` cannot be queried: `{}.{master_column}` is empty",
                        self.name, relation.master
                    ));
                    return Ok(None);
                }

                structure.and(
                    Filter::equals(detail_column).with_constraint(value.clone()),
                    detail_column,
                );
            }
        }

        Ok(Some(structure))
    }

    /// `(detail column, master value)` for every link to a master's
    /// current record.
    async fn link_values(&self) -> Result<Vec<(String, Value)>> {
        let mut links = vec![];

        for relation in self.form.coordinator().masters(&self.name) {
            let master = self.form.block(&relation.master)?;
            let state = master.acquire().await;

            let Some(record) = state.current_record() else {
                continue;
            };

            for (master_column, detail_column) in relation.columns() {
                let value = record.value(master_column);
                if !value.is_null() {
                    links.push((detail_column.to_string(), value.clone()));
                }
            }
        }

        Ok(links)
    }

    // ---- Query mode ----

    /// Switch to entering search criteria. Refused while a master has
    /// nothing to correlate with or the block has unsaved changes.
    pub async fn enter_query_mode(&self) -> Result<bool> {
        let mut statuses = vec![];
        for relation in self.form.coordinator().masters(&self.name) {
            let master = self.form.block(&relation.master)?;
            let status = master.acquire().await.status();
            statuses.push((relation.master.clone(), status));
        }

        let allowed = self.form.coordinator().allow_query_mode(&self.name, |master| {
            statuses
                .iter()
                .find(|(name, _)| name == master)
                .map(|(_, status)| *status)
                .unwrap_or_default()
        });

        if !allowed {
            self.diagnostics().warning(format!(
                "block `{}` cannot enter query mode: a master block has no current record",
                self.name
            ));
            return Ok(false);
        }

        let mut state = self.acquire().await;

        if state.query_mode {
            return Ok(true);
        }

        if state.has_changes() {
            self.diagnostics().warning(format!(
                "block `{}` has unsaved changes; flush or undo before querying",
                self.name
            ));
            return Ok(false);
        }

        if let Err(err) = state.wrapper.describe().await {
            return self.outcome(Err(err));
        }

        if state.qbe.is_none() {
            let source = state.wrapper.source();
            state.qbe = Some(QueryByExample::new(
                &self.name,
                source.columns().iter(),
                source.types(),
            ));
        }

        state.query_mode = true;
        state.view.clear();
        Ok(true)
    }

    /// Leave query mode without querying. The criteria are remembered for
    /// [`show_last_query`](Self::show_last_query).
    pub async fn exit_query_mode(&self) -> bool {
        let mut state = self.acquire().await;

        if !state.query_mode {
            return false;
        }

        if let Some(qbe) = &mut state.qbe {
            qbe.clear();
        }
        state.query_mode = false;
        state.redisplay();
        true
    }

    /// Restore the criteria of the previous query. Only in query mode.
    pub async fn show_last_query(&self) -> Result<bool> {
        let mut guard = self.acquire().await;
        let state = &mut *guard;

        match &mut state.qbe {
            Some(qbe) if state.query_mode => qbe.show_last_query(),
            _ => Ok(false),
        }
    }

    /// Use an explicit filter for a query-by-example column, or go back to
    /// the inferred one with `None`.
    pub async fn set_qbe_filter(&self, column: &str, filter: Option<Filter>) -> Result<bool> {
        let mut guard = self.acquire().await;
        let state = &mut *guard;

        match &mut state.qbe {
            Some(qbe) if state.query_mode => {
                qbe.set_filter(column, filter)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Add or replace a named filter applied to every query.
    pub async fn add_filter(&self, node: impl Into<FilterNode>, name: &str) {
        let node = node.into();
        self.acquire().await.filter.and(node, name);
    }

    pub async fn remove_filter(&self, name: &str) -> bool {
        self.acquire().await.filter.delete(name).is_some()
    }

    pub async fn filter(&self) -> FilterStructure {
        self.acquire().await.filter.clone()
    }

    // ---- Records ----

    pub async fn get_record(&self, pos: usize) -> Option<Record> {
        let state = self.acquire().await;
        let id = state.wrapper.get(pos)?;
        state.wrapper.record(id).cloned()
    }

    pub async fn current_record(&self) -> Option<Record> {
        self.acquire().await.current_record().cloned()
    }

    pub async fn current_id(&self) -> Option<RecordId> {
        self.acquire().await.current
    }

    pub async fn current_position(&self) -> Option<usize> {
        self.acquire().await.position()
    }

    /// Value of `column` in the current record, or in the search template
    /// while in query mode. Null when there is no current record.
    pub async fn get_value(&self, column: &str) -> Result<Value> {
        let state = self.acquire().await;

        let record = match (&state.qbe, state.query_mode) {
            (Some(qbe), true) => Some(qbe.record()),
            _ => state.current_record(),
        };

        match record {
            Some(record) => record
                .get_value(column)
                .cloned()
                .ok_or_else(|| Error::unknown_column(column)),
            None => Ok(Value::Null),
        }
    }

    /// Set a value in the current record, or a criterion in query mode.
    ///
    /// Under pessimistic locking the row is locked first. A veto from the
    /// `validate_field` hook restores the previous value. Changing a master
    /// link column clears the dependent detail blocks.
    pub async fn set_value(&self, column: &str, value: impl Into<Value>) -> Result<bool> {
        let value = value.into();

        let changed = {
            let mut state = self.acquire().await;

            if state.query_mode {
                return match &mut state.qbe {
                    Some(qbe) => qbe.set_value(column, value),
                    None => Ok(false),
                };
            }

            let Some(id) = state.current else {
                return Ok(false);
            };

            let result = self.write_value(&mut state, id, column, value).await;
            self.outcome(result)?
        };

        if changed {
            for relation in self.form.coordinator().details_for_field(&self.name, column) {
                let detail = self.form.block(&relation.detail)?;
                let mut state = detail.acquire().await;
                if !state.has_changes() {
                    state.reset();
                }
            }
        }

        Ok(changed)
    }

    async fn write_value(
        &self,
        state: &mut BlockState,
        id: RecordId,
        column: &str,
        value: Value,
    ) -> Result<bool> {
        let BlockState {
            wrapper,
            events,
            view,
            ..
        } = state;

        let old = match wrapper.record(id) {
            Some(record) => record
                .get_value(column)
                .cloned()
                .ok_or_else(|| Error::unknown_column(column))?,
            None => return Ok(false),
        };

        if old.same_as(&value) {
            return Ok(false);
        }

        if !wrapper.lock(id, false).await? {
            if let Some(record) = wrapper.record(id) {
                view.refresh(id, record);
            }
            return Ok(false);
        }

        let Some(record) = wrapper.record_mut(id) else {
            return Ok(false);
        };

        record.set_value(column, value)?;

        if !events.validate_field(&self.name, column, record).await {
            record.set_value(column, old)?;
            return Ok(false);
        }

        view.refresh(id, record);
        Ok(true)
    }

    // ---- DML ----

    /// Add an empty record next to the current one and make it current.
    pub async fn insert(&self, before: bool) -> Result<bool> {
        let mut state = self.acquire().await;

        if state.query_mode || !self.leave_current(&state).await {
            return Ok(false);
        }

        // New records take their shape from the described source
        if let Err(err) = state.wrapper.describe().await {
            return self.outcome(Err(err));
        }

        let pos = state.position().unwrap_or(0);
        let id = state.wrapper.create(pos, before);
        state.current = Some(id);

        if let Some(record) = state.wrapper.record(id) {
            state.view.display(id, record);
        }
        Ok(true)
    }

    /// Queue the current record's changes for update.
    pub async fn update(&self) -> Result<bool> {
        let mut state = self.acquire().await;

        let Some(id) = state.current else {
            return Ok(false);
        };

        let Some(record) = state.wrapper.record(id) else {
            return Ok(false);
        };

        if !record.is_dirty() {
            return Ok(true);
        }

        if !state.events.validate_record(&self.name, record).await {
            return Ok(false);
        }

        let result = state.wrapper.update(id).await;
        if let Some(record) = state.wrapper.record(id) {
            state.view.set_attributes(id, record);
        }
        self.outcome(result)
    }

    /// Delete the current record and move to its neighbour.
    pub async fn delete(&self) -> Result<bool> {
        let moved = {
            let mut state = self.acquire().await;

            if state.query_mode {
                return Ok(false);
            }

            let Some(id) = state.current else {
                return Ok(false);
            };
            let pos = state.position();

            let result = self.delete_record(&mut state, id).await;
            if !self.outcome(result)? {
                return Ok(false);
            }

            // Still cached when queued rather than dropped
            if let Some(record) = state.wrapper.record(id) {
                state.view.set_attributes(id, record);
                false
            } else {
                state.settle(pos);
                state.redisplay();
                true
            }
        };

        if moved {
            self.query_details(None).await?;
        }
        Ok(true)
    }

    async fn delete_record(&self, state: &mut BlockState, id: RecordId) -> Result<bool> {
        if !state.wrapper.lock(id, false).await? {
            return Ok(false);
        }
        state.wrapper.delete(id).await
    }

    /// Lock the current record's row, whatever the lock mode.
    pub async fn lock(&self) -> Result<bool> {
        let mut state = self.acquire().await;

        let Some(id) = state.current else {
            return Ok(false);
        };

        let result = state.wrapper.lock(id, true).await;
        if let Some(record) = state.wrapper.record(id) {
            state.view.set_attributes(id, record);
            state.view.refresh(id, record);
        }
        self.outcome(result)
    }

    /// Discard every change not yet flushed.
    pub async fn undo(&self) -> Result<bool> {
        let mut state = self.acquire().await;
        let pos = state.position();

        state.wrapper.undo();
        state.settle(pos);
        state.redisplay();
        Ok(true)
    }

    /// Send pending changes to the backend. New records first take the key
    /// values of their masters' current records.
    ///
    /// Returns `false` if a record was vetoed or rejected.
    pub async fn flush(&self) -> Result<bool> {
        let links = self.link_values().await?;
        let mut state = self.acquire().await;

        for id in state.wrapper.ids() {
            let Some(record) = state.wrapper.record(*id) else {
                continue;
            };

            if record.is_dirty() && !state.events.validate_record(&self.name, record).await {
                return Ok(false);
            }
        }

        state.wrapper.set_links(links);

        let pos = state.position();
        let result = state.wrapper.flush().await;
        state.settle(pos);

        for id in state.wrapper.ids() {
            if let Some(record) = state.wrapper.record(*id) {
                state.view.set_attributes(*id, record);
            }
        }

        if !self.outcome(result.map(|_| true))? {
            return Ok(false);
        }

        let failed = state
            .wrapper
            .ids()
            .iter()
            .filter_map(|id| state.wrapper.record(*id))
            .any(|record| record.is_failed() || record.state().is_pending());

        Ok(!failed)
    }

    /// Called with the block locked before the current record is left.
    async fn leave_current(&self, state: &BlockState) -> bool {
        match state.current_record() {
            Some(record) if record.is_dirty() => {
                state.events.validate_record(&self.name, record).await
            }
            _ => true,
        }
    }

    // ---- Navigation ----

    pub async fn next(&self) -> Result<bool> {
        let pos = self.current_position().await;
        self.go(pos.map_or(0, |pos| pos + 1)).await
    }

    pub async fn prev(&self) -> Result<bool> {
        match self.current_position().await {
            Some(pos) if pos > 0 => self.go(pos - 1).await,
            _ => Ok(false),
        }
    }

    pub async fn first(&self) -> Result<bool> {
        self.go(0).await
    }

    /// Fetch every remaining record and move to the last one.
    pub async fn last(&self) -> Result<bool> {
        let len = {
            let mut state = self.acquire().await;
            let result = state.wrapper.fetch_all().await;
            match result {
                Ok(len) => len,
                Err(err) => return self.outcome(Err(err)),
            }
        };

        match len {
            0 => Ok(false),
            len => self.go(len - 1).await,
        }
    }

    /// Make the record at `pos` current, fetching up to it if needed, and
    /// requery the details.
    pub async fn go(&self, pos: usize) -> Result<bool> {
        {
            let mut state = self.acquire().await;

            if state.query_mode {
                return Ok(false);
            }

            if let Err(err) = state.wrapper.prefetch(pos, 1).await {
                return self.outcome(Err(err));
            }

            let Some(id) = state.wrapper.get(pos) else {
                return Ok(false);
            };

            if state.current == Some(id) {
                return Ok(true);
            }

            if !self.leave_current(&state).await {
                return Ok(false);
            }

            state.current = Some(id);

            if !state.view.displayed(id) {
                if let Some(record) = state.wrapper.record(id) {
                    state.view.display(id, record);
                }
            }
        }

        self.query_details(None).await?;
        Ok(true)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block").field("name", &self.name).finish()
    }
}
