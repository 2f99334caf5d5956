pub mod block;
pub use block::{Block, BlockDefinition, Events, NoEvents, NoView, View};

mod config;
pub use config::{Config, LockMode};

pub mod coordinator;
pub use coordinator::{BlockCoordinator, BlockStatus, Relation};

pub mod datasource;
pub use datasource::{DataSource, DatabaseTable, LockStatus, MemoryTable, QueryTable};

mod diagnostics;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};

pub mod form;
pub use form::Form;

mod qbe;
pub use qbe::QueryByExample;

mod query_manager;
pub use query_manager::{QueryManager, QueryToken};

pub mod session;
pub use session::Session;

mod wrapper;
pub use wrapper::Wrapper;

pub use formwork_core::{
    async_trait, filter, gateway, Error, Filter, FilterKind, FilterNode, FilterStructure,
    Junction, Record, RecordArena, RecordId, RecordState, Result, Statement, Type, Value,
};
pub use formwork_sql::Table;
