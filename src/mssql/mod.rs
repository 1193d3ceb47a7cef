//! SQL Server backend built on `tiberius` and `bb8`.
//!
//! - `config`: translate a [`TargetConfig`](crate::config::TargetConfig) into a tiberius config
//! - `manager`: bb8 connection manager
//! - `backend`: the pool itself and its factory
//! - `params`: bind [`RowValues`](crate::types::RowValues) to a statement
//! - `query`: run a statement and collect a [`ResultSet`](crate::results::ResultSet)
//! - `classify`: the single mapping from driver errors to [`DalError`](crate::DalError)

pub mod backend;
pub mod classify;
pub mod config;
pub mod manager;
pub mod params;
pub mod query;

pub use backend::{MssqlBackend, MssqlFactory};
pub use classify::classify;
pub use config::build_tiberius_config;
pub use manager::{MssqlClient, MssqlConnection, MssqlConnectionManager};
