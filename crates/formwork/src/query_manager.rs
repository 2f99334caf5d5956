use indexmap::IndexMap;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};

/// Identifies one query attempt and reports whether it has been superseded.
///
/// Tokens form a tree: a detail query started by a master's query holds a
/// child of the master's token, so cancelling the master also cancels every
/// query it cascaded into.
#[derive(Debug, Clone)]
pub struct QueryToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug)]
struct TokenInner {
    generation: u64,
    cancelled: AtomicBool,
    parent: Option<QueryToken>,
}

impl QueryToken {
    pub fn new(generation: u64) -> QueryToken {
        QueryToken::with_parent(generation, None)
    }

    fn with_parent(generation: u64, parent: Option<QueryToken>) -> QueryToken {
        QueryToken {
            inner: Arc::new(TokenInner {
                generation,
                cancelled: AtomicBool::new(false),
                parent,
            }),
        }
    }

    /// A token that is cancelled whenever `self` is.
    pub fn child(&self, generation: u64) -> QueryToken {
        QueryToken::with_parent(generation, Some(self.clone()))
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        let mut token = Some(self);
        while let Some(t) = token {
            if t.inner.cancelled.load(Ordering::Acquire) {
                return true;
            }
            token = t.inner.parent.as_ref();
        }
        false
    }
}

/// Hands out query generations and tracks the one running per block.
///
/// Starting a query on a block cancels the token of the query already
/// running there. The older query keeps its backend round trip but drops
/// the result once it sees the cancellation.
#[derive(Debug, Default)]
pub struct QueryManager {
    generation: AtomicU64,
    running: Mutex<IndexMap<String, QueryToken>>,
}

impl QueryManager {
    pub fn new() -> QueryManager {
        QueryManager::default()
    }

    /// Allocate the next query generation.
    pub fn start_new_chain(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// The most recently allocated generation.
    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Register a new query on `block`, superseding any running one.
    pub fn begin(&self, block: &str, parent: Option<&QueryToken>) -> QueryToken {
        let generation = self.start_new_chain();
        let token = match parent {
            Some(parent) => parent.child(generation),
            None => QueryToken::new(generation),
        };

        let previous = self.running().insert(block.to_lowercase(), token.clone());

        if let Some(previous) = previous {
            tracing::debug!(
                block,
                superseded = previous.generation(),
                generation,
                "query superseded"
            );
            previous.cancel();
        }

        token
    }

    /// Generation of the query running on `block`, if any.
    pub fn running_generation(&self, block: &str) -> Option<u64> {
        self.running()
            .get(&block.to_lowercase())
            .map(QueryToken::generation)
    }

    /// Unregister `token`, unless a newer query has replaced it.
    pub fn finish(&self, block: &str, token: &QueryToken) {
        let mut running = self.running();
        let key = block.to_lowercase();

        if running
            .get(&key)
            .is_some_and(|t| t.generation() == token.generation())
        {
            running.shift_remove(&key);
        }
    }

    fn running(&self) -> std::sync::MutexGuard<'_, IndexMap<String, QueryToken>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
