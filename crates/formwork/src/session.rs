mod builder;
pub use builder::Builder;

mod describe_cache;
pub use describe_cache::{DescribeCache, EvictionPolicy};

use crate::{Config, Diagnostics};

use formwork_core::{
    gateway::{Operation, Request, Response},
    Error, Gateway, Parameter, Result, Statement,
};

use std::sync::Arc;

/// A connection to the backend gateway and the state shared by every
/// block using it.
///
/// Cloning is cheap; clones share the gateway, the describe cache and the
/// diagnostics.
#[derive(Debug, Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    /// `None` until a gateway is configured; every round trip then fails
    /// with `not_connected`
    gateway: Option<Arc<dyn Gateway>>,

    config: Config,

    describe_cache: DescribeCache,

    diagnostics: Diagnostics,
}

impl Session {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.shared.diagnostics
    }

    pub fn describe_cache(&self) -> &DescribeCache {
        &self.shared.describe_cache
    }

    pub fn is_connected(&self) -> bool {
        self.shared.gateway.is_some()
    }

    /// Send one operation to the gateway.
    ///
    /// Column and type names in the response are lower-cased. A response
    /// with `success == false` becomes an error; per-request outcomes
    /// inside a batch are left to the caller.
    pub async fn exec(&self, operation: Operation) -> Result<Response> {
        let Some(gateway) = &self.shared.gateway else {
            return Err(Error::not_connected());
        };

        tracing::debug!(statement = operation.text().unwrap_or_default(), ?operation, "exec");

        let response = gateway.exec(operation).await?.normalize();
        response.into_result()
    }

    /// Describe a statement, consulting the cache first.
    ///
    /// Only the first caller for a given statement text reaches the
    /// gateway; concurrent callers wait for its response.
    pub async fn describe(&self, statement: Statement) -> Result<Arc<Response>> {
        let key = statement.text.clone();

        self.shared
            .describe_cache
            .get_or_try_insert(&key, || async move {
                let request = Request::new(statement).describe_only();
                self.exec(Operation::Describe(request)).await
            })
            .await
    }

    /// Call a stored procedure. Output parameters come back filled from
    /// the response's first row, matched by column or by name.
    pub async fn call(&self, name: &str, params: &[Parameter]) -> Result<Vec<Parameter>> {
        let statement = formwork_sql::proc(name, params);
        let response = self.exec(Operation::Call(Request::new(statement))).await?;

        let mut params = params.to_vec();
        let Some(row) = response.rows.first() else {
            return Ok(params);
        };

        for param in params.iter_mut().filter(|param| param.output) {
            let column = param
                .column
                .as_deref()
                .unwrap_or(&param.name)
                .to_ascii_lowercase();

            if let Some(pos) = response.columns.iter().position(|c| *c == column) {
                param.value = row.get(pos).cloned().unwrap_or_default();
            }
        }

        Ok(params)
    }

    pub async fn commit(&self) -> Result<()> {
        self.exec(Operation::Commit).await?;
        Ok(())
    }

    pub async fn rollback(&self) -> Result<()> {
        self.exec(Operation::Rollback).await?;
        Ok(())
    }
}
