use crate::{coordinator::BlockStatus, Events, QueryByExample, View, Wrapper};

use formwork_core::{FilterStructure, Record, RecordId};

use std::sync::Arc;

/// A block's mutable state, guarded by the block's async mutex.
pub(crate) struct BlockState {
    pub(crate) wrapper: Wrapper,

    pub(crate) events: Arc<dyn Events>,

    pub(crate) view: Arc<dyn View>,

    pub(crate) current: Option<RecordId>,

    pub(crate) query_mode: bool,

    /// Created the first time the block enters query mode
    pub(crate) qbe: Option<QueryByExample>,

    /// Filters added by the application
    pub(crate) filter: FilterStructure,

    /// Filters derived from the masters' current records by the last query
    pub(crate) master_filter: FilterStructure,
}

impl BlockState {
    pub(crate) fn status(&self) -> BlockStatus {
        BlockStatus {
            query_mode: self.query_mode,
            empty: self.current.is_none(),
        }
    }

    pub(crate) fn current_record(&self) -> Option<&Record> {
        self.current.and_then(|id| self.wrapper.record(id))
    }

    pub(crate) fn position(&self) -> Option<usize> {
        self.current.and_then(|id| self.wrapper.position(id))
    }

    /// Any change not yet sent to the backend.
    pub(crate) fn has_changes(&self) -> bool {
        self.wrapper.source().pending() > 0
            || self.wrapper.ids().iter().any(|id| {
                self.wrapper.record(*id).is_some_and(|record| {
                    record.is_dirty() || record.state().is_pending()
                })
            })
    }

    /// Point `current` at a cached record after the old one left the cache.
    pub(crate) fn settle(&mut self, previous: Option<usize>) {
        if self.current.is_some_and(|id| self.wrapper.position(id).is_some()) {
            return;
        }

        let len = self.wrapper.len();
        self.current = match previous {
            Some(pos) if len > 0 => self.wrapper.get(pos.min(len - 1)),
            _ => self.wrapper.get(0),
        };
    }

    /// Clear the view and show every cached record again.
    pub(crate) fn redisplay(&self) {
        self.view.clear();
        for id in self.wrapper.ids() {
            if let Some(record) = self.wrapper.record(*id) {
                self.view.display(*id, record);
            }
        }
    }

    /// Forget every record, as after a rollback.
    pub(crate) fn reset(&mut self) {
        self.wrapper.clear();
        self.current = None;
        self.query_mode = false;
        self.master_filter.clear();
        self.view.clear();
    }
}
