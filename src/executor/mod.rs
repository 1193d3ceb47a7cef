mod dispatch;

use std::time::Duration;

use crate::error::DalError;
use crate::pool::PoolHandle;
use crate::query::QueryDescriptor;
use crate::results::ResultSet;

/// Runs parameterized statements against a [`PoolHandle`].
///
/// The executor never retries and never changes the handle's state. When a
/// timeout is configured, a statement that runs past it is abandoned: the
/// in-flight future is dropped, which releases (and discards) its lease.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryExecutor {
    timeout: Option<Duration>,
}

impl QueryExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Execute `descriptor` on a connection leased from `handle`.
    ///
    /// # Errors
    /// Returns `DalError::ConnectionError` for transient failures (closed pool,
    /// lost connection, checkout or statement timeout) and
    /// `DalError::QueryError`/`DalError::ParameterError` for fatal ones.
    pub async fn execute(
        &self,
        handle: &PoolHandle,
        descriptor: &QueryDescriptor,
    ) -> Result<ResultSet, DalError> {
        let Some(limit) = self.timeout else {
            return dispatch::dispatch(handle, descriptor).await;
        };
        match tokio::time::timeout(limit, dispatch::dispatch(handle, descriptor)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    target_db = %handle.target(),
                    timeout_ms = limit.as_millis() as u64,
                    "statement timed out"
                );
                Err(DalError::ConnectionError(format!(
                    "query timed out after {}ms",
                    limit.as_millis()
                )))
            }
        }
    }
}

/// Execute `descriptor` on `handle` with no timeout.
///
/// # Errors
/// See [`QueryExecutor::execute`].
pub async fn execute(
    handle: &PoolHandle,
    descriptor: &QueryDescriptor,
) -> Result<ResultSet, DalError> {
    QueryExecutor::new().execute(handle, descriptor).await
}
