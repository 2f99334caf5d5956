use crate::{DataSource, Events, LockMode, NoEvents, NoView, View};

use std::{fmt, sync::Arc};

/// Everything needed to add a block to a form.
pub struct BlockDefinition {
    pub(crate) name: String,

    pub(crate) source: Box<dyn DataSource>,

    pub(crate) events: Arc<dyn Events>,

    pub(crate) view: Arc<dyn View>,

    /// Overrides the session's lock mode
    pub(crate) lock_mode: Option<LockMode>,

    /// Non-source columns kept on every record
    pub(crate) columns: Vec<String>,
}

impl BlockDefinition {
    pub fn new(name: impl Into<String>, source: impl DataSource + 'static) -> BlockDefinition {
        BlockDefinition {
            name: name.into().to_lowercase(),
            source: Box::new(source),
            events: Arc::new(NoEvents),
            view: Arc::new(NoView),
            lock_mode: None,
            columns: vec![],
        }
    }

    pub fn events(mut self, events: Arc<dyn Events>) -> BlockDefinition {
        self.events = events;
        self
    }

    pub fn view(mut self, view: Arc<dyn View>) -> BlockDefinition {
        self.view = view;
        self
    }

    pub fn lock_mode(mut self, mode: LockMode) -> BlockDefinition {
        self.lock_mode = Some(mode);
        self
    }

    pub fn columns<I>(mut self, columns: I) -> BlockDefinition
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Debug for BlockDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockDefinition")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("lock_mode", &self.lock_mode)
            .field("columns", &self.columns)
            .finish()
    }
}
