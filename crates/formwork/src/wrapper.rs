use crate::{DataSource, Events, LockMode, LockStatus, QueryToken};

use formwork_core::{
    FilterStructure, Record, RecordArena, RecordId, RecordState, Result, Value,
};

use std::{collections::VecDeque, fmt, sync::Arc};

/// A block's window onto its data source.
///
/// Records are pulled from the source lazily, one at a time, and kept in
/// cache order. The wrapper decides which cached records need DML on
/// flush and runs the block's DML hooks around it.
pub struct Wrapper {
    /// Owning block, passed to hooks
    block: String,

    source: Box<dyn DataSource>,

    records: RecordArena,

    /// Cached records in display order
    cache: Vec<RecordId>,

    /// Fetched by the source, not yet pulled into the cache
    buffered: VecDeque<Record>,

    /// Records placed in the cache since the last query, fetched or created
    high_water_mark: usize,

    eof: bool,

    events: Arc<dyn Events>,

    lock_mode: LockMode,

    /// Columns the block keeps on each record beyond the source's own
    columns: Vec<String>,

    /// Master key values copied onto new records at flush
    links: Vec<(String, Value)>,
}

impl Wrapper {
    pub fn new(
        block: impl Into<String>,
        source: Box<dyn DataSource>,
        events: Arc<dyn Events>,
        lock_mode: LockMode,
    ) -> Wrapper {
        let lock_mode = lock_mode.min(source.lock_mode());

        Wrapper {
            block: block.into(),
            source,
            records: RecordArena::new(),
            cache: vec![],
            buffered: VecDeque::new(),
            high_water_mark: 0,
            eof: true,
            events,
            lock_mode,
            columns: vec![],
            links: vec![],
        }
    }

    /// Keep `columns` on every record in addition to the source's columns.
    pub fn with_columns<I>(mut self, columns: I) -> Wrapper
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.columns = columns
            .into_iter()
            .map(|column| column.into().to_lowercase())
            .collect();
        self
    }

    pub fn source(&self) -> &dyn DataSource {
        &*self.source
    }

    pub fn source_mut(&mut self) -> &mut dyn DataSource {
        &mut *self.source
    }

    pub fn lock_mode(&self) -> LockMode {
        self.lock_mode
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// True once every row of the current query is cached.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    pub fn get(&self, pos: usize) -> Option<RecordId> {
        self.cache.get(pos).copied()
    }

    pub fn position(&self, id: RecordId) -> Option<usize> {
        self.cache.iter().position(|cached| *cached == id)
    }

    pub fn ids(&self) -> &[RecordId] {
        &self.cache
    }

    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn record_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        self.records.get_mut(id)
    }

    /// Master key values to copy onto unsynchronized records at flush.
    pub fn set_links(&mut self, links: Vec<(String, Value)>) {
        self.links = links;
    }

    pub async fn describe(&mut self) -> Result<()> {
        self.source.describe().await
    }

    /// Run a new query and replace the cache with its first rows.
    ///
    /// Returns `false` without touching the cache when `token` was
    /// cancelled while the backend was working.
    pub async fn query(
        &mut self,
        filter: Option<&FilterStructure>,
        token: &QueryToken,
    ) -> Result<bool> {
        self.source.describe().await?;

        if token.is_cancelled() {
            return Ok(false);
        }

        self.source.query(filter).await?;
        let batch = self.source.fetch().await?;

        if token.is_cancelled() {
            tracing::warn!(
                block = %self.block,
                generation = token.generation(),
                "discarding stale query result"
            );
            return Ok(false);
        }

        self.clear();
        self.buffered = batch.into();
        self.eof = false;
        Ok(true)
    }

    /// Pull one more record into the cache.
    ///
    /// Records the `on_fetch` hook rejects are skipped. Returns `None` at
    /// end of data.
    pub async fn fetch(&mut self) -> Result<Option<RecordId>> {
        loop {
            if self.eof {
                return Ok(None);
            }

            let Some(mut record) = self.buffered.pop_front() else {
                let batch = self.source.fetch().await?;
                if batch.is_empty() {
                    self.eof = true;
                }
                self.buffered.extend(batch);
                continue;
            };

            record.add_columns(&self.columns);
            record.set_prepared(true);

            if !self.events.on_fetch(&self.block, &mut record).await {
                continue;
            }

            let id = self.records.insert(record);
            self.cache.push(id);
            self.high_water_mark += 1;
            return Ok(Some(id));
        }
    }

    /// Make up to `count` records after `from` available, fetching as
    /// needed. A negative `count` looks backward from `from` through what
    /// is already cached and never fetches.
    ///
    /// Returns how many of the requested records are available.
    pub async fn prefetch(&mut self, from: usize, count: isize) -> Result<usize> {
        if count < 0 {
            return Ok(from.min(self.cache.len()).min(count.unsigned_abs()));
        }

        let count = count as usize;
        let wanted = from.saturating_add(count);

        while self.cache.len() < wanted {
            if self.fetch().await?.is_none() {
                break;
            }
        }

        Ok(self.cache.len().saturating_sub(from).min(count))
    }

    /// Fetch until end of data.
    pub async fn fetch_all(&mut self) -> Result<usize> {
        while self.fetch().await?.is_some() {}
        Ok(self.cache.len())
    }

    /// Splice a new, empty record into the cache next to `pos`.
    pub fn create(&mut self, pos: usize, before: bool) -> RecordId {
        let mut record = self.source.new_record();
        record.add_columns(&self.columns);
        record.set_prepared(true);

        let at = if self.cache.is_empty() {
            0
        } else if before {
            pos.min(self.cache.len())
        } else {
            (pos + 1).min(self.cache.len())
        };

        let id = self.records.insert(record);
        self.cache.insert(at, id);
        self.high_water_mark += 1;
        id
    }

    /// Queue a new record for insert.
    pub async fn insert(&mut self, id: RecordId) -> Result<bool> {
        let Some(record) = self.records.get_mut(id) else {
            return Ok(false);
        };

        if !self.events.pre_insert(&self.block, record).await {
            return Ok(false);
        }

        self.source.insert(id)?;
        record.set_state(RecordState::Insert);
        Ok(true)
    }

    /// Queue a changed record for update.
    pub async fn update(&mut self, id: RecordId) -> Result<bool> {
        let Some(record) = self.records.get_mut(id) else {
            return Ok(false);
        };

        if record.state().is_new() {
            return Ok(true);
        }

        if !self.events.pre_update(&self.block, record).await {
            return Ok(false);
        }

        self.source.update(id)?;
        record.set_state(RecordState::Update);
        Ok(true)
    }

    /// Queue a record for delete. A record the backend has never seen is
    /// simply dropped.
    pub async fn delete(&mut self, id: RecordId) -> Result<bool> {
        let Some(record) = self.records.get_mut(id) else {
            return Ok(false);
        };

        if !self.events.pre_delete(&self.block, record).await {
            return Ok(false);
        }

        match record.state() {
            RecordState::New => {}
            RecordState::Insert => self.source.delete(id)?,
            _ => {
                self.source.delete(id)?;
                record.set_state(RecordState::Delete);
                return Ok(true);
            }
        }

        self.evict(id);
        Ok(true)
    }

    /// Lock a record's row according to the lock mode. `force` asks for
    /// the lock even in optimistic mode.
    ///
    /// Returns `false` if the row changed or disappeared underneath; the
    /// record then holds the backend values.
    pub async fn lock(&mut self, id: RecordId, force: bool) -> Result<bool> {
        let Some(record) = self.records.get_mut(id) else {
            return Ok(false);
        };

        let skip = !self.source.is_transactional()
            || record.is_locked()
            || matches!(
                record.state(),
                RecordState::New | RecordState::Insert | RecordState::Inserted
            )
            || match self.lock_mode {
                LockMode::None => true,
                LockMode::Optimistic => !force,
                LockMode::Pessimistic => false,
            };

        if skip {
            return Ok(true);
        }

        match self.source.lock(record).await? {
            LockStatus::Locked => Ok(true),
            LockStatus::Changed => Ok(false),
            LockStatus::Deleted => {
                record.set_failed(true);
                Ok(false)
            }
        }
    }

    /// Send every pending change to the data source.
    ///
    /// Unsynchronized records get the master link values and are queued for
    /// insert; changed records are queued for update. Records whose DML was
    /// applied advance state once their post hook accepts. Returns the
    /// number of records applied.
    pub async fn flush(&mut self) -> Result<usize> {
        for id in self.cache.clone() {
            let Some(record) = self.records.get_mut(id) else {
                continue;
            };

            match record.state() {
                RecordState::New if record.is_dirty() => {
                    for (column, value) in &self.links {
                        if record.get_value(column).is_some() {
                            record.set_value(column, value.clone())?;
                        }
                    }
                    self.insert(id).await?;
                }
                RecordState::Consistent | RecordState::Inserted | RecordState::Updated
                    if record.is_dirty() =>
                {
                    self.update(id).await?;
                }
                _ => {}
            }
        }

        if self.source.pending() == 0 {
            return Ok(0);
        }

        let mut applied = vec![];
        let result = self.source.flush(&mut self.records, &mut applied).await;
        let mut deleted = vec![];

        for id in &applied {
            let Some(record) = self.records.get_mut(*id) else {
                continue;
            };

            let (accepted, next) = match record.state() {
                RecordState::Insert => (
                    self.events.post_insert(&self.block, record).await,
                    RecordState::Inserted,
                ),
                RecordState::Update => (
                    self.events.post_update(&self.block, record).await,
                    RecordState::Updated,
                ),
                RecordState::Delete => (
                    self.events.post_delete(&self.block, record).await,
                    RecordState::Deleted,
                ),
                _ => continue,
            };

            if !accepted {
                tracing::debug!(block = %self.block, state = ?record.state(), "post hook vetoed state change");
                continue;
            }

            if next == RecordState::Deleted {
                deleted.push(*id);
            }
            record.set_state(next);
        }

        // Rejected records return to their state before queueing so the
        // next flush picks them up again. Records the source never sent
        // stay queued as they are.
        for id in &self.cache {
            let Some(record) = self.records.get_mut(*id) else {
                continue;
            };

            if applied.contains(id) || self.source.is_queued(*id) {
                continue;
            }

            match record.state() {
                RecordState::Insert => record.set_state(RecordState::New),
                RecordState::Update | RecordState::Delete => {
                    record.set_state(RecordState::Consistent)
                }
                _ => {}
            }
        }

        for id in deleted {
            self.evict(id);
        }

        result?;
        Ok(applied.len())
    }

    /// Revert pending changes. Returns the records that left the cache.
    pub fn undo(&mut self) -> Vec<RecordId> {
        let mut removed = self.source.undo(&mut self.records);

        for id in self.cache.clone() {
            let Some(record) = self.records.get_mut(id) else {
                if !removed.contains(&id) {
                    removed.push(id);
                }
                continue;
            };

            if record.state() == RecordState::New {
                self.records.remove(id);
                removed.push(id);
            } else if record.is_dirty() {
                record.refresh();
                record.set_failed(false);
            }
        }

        self.cache.retain(|id| !removed.contains(id));
        removed
    }

    /// Accept committed changes: confirmed records become `Consistent` and
    /// every row lock is released.
    pub fn confirm(&mut self) {
        for id in &self.cache {
            if let Some(record) = self.records.get_mut(*id) {
                if record.state().is_confirmed() {
                    record.set_state(RecordState::Consistent);
                }
                record.set_locked(false);
            }
        }
    }

    /// Drop a record from the cache.
    pub fn evict(&mut self, id: RecordId) -> Option<Record> {
        self.cache.retain(|cached| *cached != id);
        self.records.remove(id)
    }

    /// Forget every record.
    pub fn clear(&mut self) {
        self.records.clear();
        self.cache.clear();
        self.buffered.clear();
        self.high_water_mark = 0;
        self.eof = true;
    }
}

impl fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapper")
            .field("block", &self.block)
            .field("source", &self.source)
            .field("cached", &self.cache.len())
            .field("high_water_mark", &self.high_water_mark)
            .field("eof", &self.eof)
            .field("lock_mode", &self.lock_mode)
            .finish()
    }
}
