mod operation;
pub use operation::{Batch, DmlKind, Fetch, Operation};

mod request;
pub use request::{CursorId, Request};

mod response;
pub use response::Response;

use crate::{async_trait, Result};

use std::fmt::Debug;

/// The transport to the backend database service.
///
/// A gateway accepts a statement with bind values and answers with
/// columns, types and rows. It never interprets the statement itself.
#[async_trait]
pub trait Gateway: Debug + Send + Sync + 'static {
    /// Execute one operation.
    ///
    /// Transport failures are returned as errors. A backend that rejected
    /// the request answers `Ok` with `success == false`.
    async fn exec(&self, operation: Operation) -> Result<Response>;
}
