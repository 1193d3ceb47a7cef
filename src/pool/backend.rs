use std::sync::Arc;

use async_trait::async_trait;

use crate::config::TargetConfig;
use crate::error::DalError;
use crate::query::QueryDescriptor;
use crate::results::ResultSet;

/// A live connection pool for one target.
///
/// Implementations lease one connection per [`execute`](PoolBackend::execute)
/// call and return it to the pool on every exit path, including when the
/// returned future is dropped.
#[async_trait]
pub trait PoolBackend: Send + Sync {
    /// Run one statement on a leased connection.
    async fn execute(&self, descriptor: &QueryDescriptor) -> Result<ResultSet, DalError>;

    /// False once the backend has observed a connection-class failure.
    fn is_healthy(&self) -> bool;

    /// Release every pooled connection. Further calls to `execute` fail.
    async fn close(&self);
}

/// Builds a [`PoolBackend`] from a target's configuration.
#[async_trait]
pub trait PoolFactory: Send + Sync {
    /// Connect a new pool. Implementations do not retry.
    async fn connect(&self, config: &TargetConfig) -> Result<Arc<dyn PoolBackend>, DalError>;
}
