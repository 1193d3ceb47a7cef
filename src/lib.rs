//! Data-access layer for dashboard back ends.
//!
//! - [`pool::PoolManager`] builds one connection pool per configured
//!   [`config::Target`] on first use and rebuilds it after a disconnect.
//! - [`executor::QueryExecutor`] runs parameterized [`query::QueryDescriptor`]s
//!   and classifies failures as transient or fatal.
//! - [`envelope::Envelope`] and [`envelope::cors_envelope`] give every HTTP
//!   response the same body shape and CORS headers.
//!
//! ```rust,no_run
//! # #[cfg(feature = "mssql")]
//! # async fn demo() -> Result<(), dashboard_dal::DalError> {
//! use std::sync::Arc;
//! use dashboard_dal::prelude::*;
//! use dashboard_dal::mssql::MssqlFactory;
//!
//! let pools = Arc::new(PoolManager::from_env(Arc::new(MssqlFactory::new()))?);
//! let app = dashboard_dal::api::router(AppState::new(pools, QueryExecutor::new()));
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod pool;
pub mod prelude;
pub mod query;
pub mod results;
pub mod translation;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use error::{DalError, ErrorKind};
