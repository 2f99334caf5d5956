use formwork_core::{gateway::Response, Result};

use indexmap::IndexMap;
use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::sync::OnceCell;

/// When cached describe responses are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Keep every response for the life of the session
    #[default]
    Never,

    /// Keep at most this many responses, dropping the oldest first
    Capacity(usize),
}

/// Describe responses keyed by statement text.
///
/// The backend schema is assumed stable for the life of a session, so
/// entries are never invalidated; only the eviction policy removes them.
#[derive(Debug, Default)]
pub struct DescribeCache {
    entries: Mutex<IndexMap<String, Arc<OnceCell<Arc<Response>>>>>,
    policy: EvictionPolicy,
}

impl DescribeCache {
    pub fn new(policy: EvictionPolicy) -> DescribeCache {
        DescribeCache {
            entries: Mutex::default(),
            policy,
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub fn get(&self, key: &str) -> Option<Arc<Response>> {
        self.entries().get(key)?.get().cloned()
    }

    /// Number of statements with a cached response.
    pub fn len(&self) -> usize {
        self.entries()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached response for `key`, running `describe` to fill it
    /// on a miss. A failed `describe` caches nothing.
    pub async fn get_or_try_insert<F, Fut>(&self, key: &str, describe: F) -> Result<Arc<Response>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Response>>,
    {
        let cell = self.cell(key);

        if let Some(response) = cell.get() {
            tracing::debug!(statement = key, "describe cache hit");
            return Ok(response.clone());
        }

        let response = cell
            .get_or_try_init(|| async move { describe().await.map(Arc::new) })
            .await?;

        Ok(response.clone())
    }

    fn cell(&self, key: &str) -> Arc<OnceCell<Arc<Response>>> {
        let mut entries = self.entries();

        if let Some(cell) = entries.get(key) {
            return cell.clone();
        }

        if let EvictionPolicy::Capacity(capacity) = self.policy {
            while !entries.is_empty() && entries.len() >= capacity {
                entries.shift_remove_index(0);
            }
        }

        let cell = Arc::new(OnceCell::new());
        entries.insert(key.to_string(), cell.clone());
        cell
    }

    fn entries(&self) -> MutexGuard<'_, IndexMap<String, Arc<OnceCell<Arc<Response>>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
