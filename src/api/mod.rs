//! HTTP surface built on the data-access layer.
//!
//! Handlers acquire a pool, run one descriptor through the executor, and hand
//! the outcome to [`Envelope`](crate::envelope::Envelope) or [`ApiError`].
//! Cross-origin handling is applied once, for the whole router.

pub mod branches;
pub mod error;
pub mod health;
pub mod hrms;

use std::sync::Arc;

use axum::http::{StatusCode, Uri};
use axum::{Router, middleware};

use crate::config::Target;
use crate::envelope::{Envelope, cors_envelope};
use crate::executor::QueryExecutor;
use crate::pool::PoolManager;
use crate::query::QueryDescriptor;
use crate::results::ResultSet;

pub use error::ApiError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pools: Arc<PoolManager>,
    pub executor: QueryExecutor,
}

impl AppState {
    #[must_use]
    pub fn new(pools: Arc<PoolManager>, executor: QueryExecutor) -> Self {
        Self { pools, executor }
    }

    /// Acquire `target`'s pool and run `descriptor` on it.
    ///
    /// # Errors
    /// Returns the classified failure of either step.
    pub async fn run(
        &self,
        target: Target,
        descriptor: QueryDescriptor,
    ) -> Result<ResultSet, ApiError> {
        let handle = self.pools.acquire(target).await?;
        Ok(self.executor.execute(&handle, &descriptor).await?)
    }
}

/// All routes, with the CORS middleware applied to every one of them and to
/// the 404 fallback.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(branches::router())
        .merge(hrms::router())
        .fallback(not_found)
        .layer(middleware::from_fn(cors_envelope))
        .with_state(state)
}

async fn not_found(uri: Uri) -> Envelope {
    Envelope::failure(format!("Route {} not found", uri.path()), StatusCode::NOT_FOUND)
}

/// Parse a numeric path id, rejecting anything else as a validation error.
pub(crate) fn parse_id(raw: &str, resource: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::validation(format!("Invalid {resource} id")))
}
