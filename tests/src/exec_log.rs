use crate::mock_gateway::GatewayOp;
use formwork_core::gateway::{DmlKind, Operation, Response};
use std::sync::{Arc, Mutex};

/// Every round trip the mock gateway answered, oldest first.
///
/// Shares its storage with the gateway, so a log taken before a block
/// operation sees the operations that follow.
pub struct ExecLog {
    ops: Arc<Mutex<Vec<GatewayOp>>>,
}

impl ExecLog {
    pub(crate) fn new(ops: Arc<Mutex<Vec<GatewayOp>>>) -> Self {
        Self { ops }
    }

    /// Run `f` over the recorded round trips.
    pub fn with_ops<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[GatewayOp]) -> R,
    {
        f(&self.ops.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.with_ops(|ops| ops.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn any(&self, matches: impl Fn(&Operation) -> bool) -> bool {
        self.with_ops(|ops| ops.iter().any(|op| matches(&op.operation)))
    }

    pub fn count(&self, matches: impl Fn(&Operation) -> bool) -> usize {
        self.with_ops(|ops| ops.iter().filter(|op| matches(&op.operation)).count())
    }

    pub fn describes(&self) -> usize {
        self.count(Operation::is_describe)
    }

    pub fn selects(&self) -> usize {
        self.count(Operation::is_select)
    }

    pub fn fetches(&self) -> usize {
        self.count(Operation::is_fetch)
    }

    pub fn locks(&self) -> usize {
        self.count(Operation::is_lock)
    }

    pub fn has_batch(&self, kind: DmlKind) -> bool {
        self.any(|op| matches!(op, Operation::Batch(batch) if batch.kind == kind))
    }

    pub fn has_commit(&self) -> bool {
        self.any(|op| matches!(op, Operation::Commit))
    }

    pub fn has_rollback(&self) -> bool {
        self.any(|op| matches!(op, Operation::Rollback))
    }

    /// Statement text of each round trip that sends one
    pub fn texts(&self) -> Vec<String> {
        self.with_ops(|ops| {
            ops.iter()
                .filter_map(|op| op.operation.text().map(str::to_string))
                .collect()
        })
    }

    pub fn clear(&mut self) {
        self.ops.lock().unwrap().clear();
    }

    /// Take the oldest round trip off the log.
    pub fn pop(&mut self) -> Option<(Operation, Response)> {
        let mut ops = self.ops.lock().unwrap();
        (!ops.is_empty()).then(|| {
            let op = ops.remove(0);
            (op.operation, op.response)
        })
    }
}
