mod bind;
pub use bind::{BindValue, Parameter};

mod error;
pub use error::{Error, IntoError};

pub mod filter;
pub use filter::{Filter, FilterKind, FilterNode, FilterStructure, Junction};

pub mod gateway;
pub use gateway::Gateway;

pub mod record;
pub use record::{Record, RecordArena, RecordId, RecordState};

mod statement;
pub use statement::{Assertion, Statement};

mod ty;
pub use ty::Type;

mod value;
pub use value::Value;

/// A Result type alias that uses the engine's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

pub use async_trait::async_trait;
