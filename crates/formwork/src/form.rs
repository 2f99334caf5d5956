mod builder;
pub use builder::Builder;

use crate::{
    block::BlockState, Block, BlockCoordinator, Diagnostics, QueryManager, Session,
};

use formwork_core::{Error, Result};

use indexmap::IndexMap;
use std::{fmt, sync::Arc};
use tokio::sync::Mutex;

/// A set of blocks sharing one session, linked by master/detail relations.
///
/// Cloning is cheap; clones address the same form.
#[derive(Clone)]
pub struct Form {
    shared: Arc<Shared>,
}

struct Shared {
    session: Session,

    blocks: IndexMap<String, Arc<Mutex<BlockState>>>,

    coordinator: BlockCoordinator,

    queries: QueryManager,
}

impl Form {
    pub fn builder(session: &Session) -> Builder {
        Builder::new(session)
    }

    pub fn session(&self) -> &Session {
        &self.shared.session
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.shared.session.diagnostics()
    }

    pub fn coordinator(&self) -> &BlockCoordinator {
        &self.shared.coordinator
    }

    pub fn queries(&self) -> &QueryManager {
        &self.shared.queries
    }

    pub fn block(&self, name: &str) -> Result<Block> {
        let name = name.to_lowercase();

        match self.shared.blocks.get(&name) {
            Some(state) => Ok(Block::new(self.clone(), name, state.clone())),
            None => Err(Error::unknown_block(name)),
        }
    }

    pub fn blocks(&self) -> impl Iterator<Item = &str> {
        self.shared.blocks.keys().map(String::as_str)
    }

    /// Flush every block, masters first, and commit the transaction.
    ///
    /// Nothing is committed if any block fails to flush. After a commit,
    /// inserted and updated records become `Consistent` and row locks are
    /// released.
    pub async fn commit(&self) -> Result<bool> {
        for name in self.coordinator().flush_order() {
            if !self.block(&name)?.flush().await? {
                return Ok(false);
            }
        }

        if let Err(err) = self.session().commit().await {
            self.diagnostics().severe(format!("commit failed: {err}"));
            return Ok(false);
        }

        for state in self.shared.blocks.values() {
            let mut state = state.lock().await;
            state.wrapper.confirm();

            for id in state.wrapper.ids() {
                if let Some(record) = state.wrapper.record(*id) {
                    state.view.set_attributes(*id, record);
                }
            }
        }

        Ok(true)
    }

    /// Roll back the transaction and empty every block.
    ///
    /// Records can no longer be trusted to match the backend afterwards,
    /// so blocks must be queried again.
    pub async fn rollback(&self) -> Result<bool> {
        if let Err(err) = self.session().rollback().await {
            self.diagnostics().severe(format!("rollback failed: {err}"));
            return Ok(false);
        }

        for state in self.shared.blocks.values() {
            state.lock().await.reset();
        }

        Ok(true)
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("blocks", &self.shared.blocks.keys().collect::<Vec<_>>())
            .field("coordinator", &self.shared.coordinator)
            .finish()
    }
}
