use formwork_core::{gateway::DmlKind, RecordArena, RecordId, RecordState};

/// DML waiting for the next flush.
#[derive(Debug, Default)]
pub(crate) struct DmlQueue {
    inserts: Vec<RecordId>,
    updates: Vec<RecordId>,
    deletes: Vec<RecordId>,
}

impl DmlQueue {
    /// Queue `id` for `kind`, dropping any earlier queued operation on it.
    ///
    /// Deleting a record whose insert is still queued cancels the insert
    /// and queues nothing.
    pub(crate) fn push(&mut self, kind: DmlKind, id: RecordId) {
        let was_insert = self.inserts.contains(&id);
        self.remove(id);

        match kind {
            DmlKind::Insert => self.inserts.push(id),
            DmlKind::Update if was_insert => self.inserts.push(id),
            DmlKind::Update => self.updates.push(id),
            DmlKind::Delete if was_insert => {}
            DmlKind::Delete => self.deletes.push(id),
        }
    }

    pub(crate) fn remove(&mut self, id: RecordId) {
        self.inserts.retain(|queued| *queued != id);
        self.updates.retain(|queued| *queued != id);
        self.deletes.retain(|queued| *queued != id);
    }

    pub(crate) fn contains(&self, id: RecordId) -> bool {
        self.inserts.contains(&id) || self.updates.contains(&id) || self.deletes.contains(&id)
    }

    pub(crate) fn take(&mut self, kind: DmlKind) -> Vec<RecordId> {
        std::mem::take(match kind {
            DmlKind::Insert => &mut self.inserts,
            DmlKind::Update => &mut self.updates,
            DmlKind::Delete => &mut self.deletes,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }

    /// Revert everything queued. Returns the inserted records, which have
    /// been removed from `records`.
    pub(crate) fn undo(&mut self, records: &mut RecordArena) -> Vec<RecordId> {
        for id in self.take(DmlKind::Update).into_iter().chain(self.take(DmlKind::Delete)) {
            if let Some(record) = records.get_mut(id) {
                record.refresh();
                record.set_failed(false);
                record.set_state(RecordState::Consistent);
            }
        }

        let inserts = self.take(DmlKind::Insert);
        for id in &inserts {
            records.remove(*id);
        }
        inserts
    }
}
