//! In-memory pool backend for exercising the pool manager, executor and HTTP
//! routes without a SQL Server.
//!
//! Enabled by the `test-utils` feature.

mod memory;

pub use memory::{ExecutedStatement, MemoryBackend, MemoryFactory, Responder};

use crate::results::ResultSet;
use crate::types::RowValues;

/// Build a result set from column names and row values.
#[must_use]
pub fn rows(columns: &[&str], rows: Vec<Vec<RowValues>>) -> ResultSet {
    let mut result_set = ResultSet::with_columns(columns.iter().copied());
    for row in rows {
        result_set.add_row_values(row);
    }
    result_set
}
