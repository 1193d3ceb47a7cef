use crate::error::DalError;
use crate::pool::{PoolHandle, PoolState};
use crate::query::QueryDescriptor;
use crate::results::ResultSet;

/// Send one statement to the handle's backend.
///
/// The backend leases a connection for the duration of the call. Errors come
/// back already classified; this only logs them.
pub(crate) async fn dispatch(
    handle: &PoolHandle,
    descriptor: &QueryDescriptor,
) -> Result<ResultSet, DalError> {
    if handle.state() == PoolState::Closed {
        return Err(DalError::ConnectionError(format!(
            "{} pool is closed",
            handle.target()
        )));
    }

    tracing::debug!(
        target_db = %handle.target(),
        generation = handle.generation(),
        sql = descriptor.sql(),
        params = descriptor.param_count(),
        "executing statement"
    );

    let result = handle.backend().execute(descriptor).await;
    match &result {
        Ok(rs) => tracing::debug!(
            target_db = %handle.target(),
            rows = rs.len(),
            rows_affected = rs.rows_affected,
            "statement finished"
        ),
        Err(err) if err.is_transient() => tracing::warn!(
            target_db = %handle.target(),
            error = %err,
            "statement failed with a connection error"
        ),
        Err(err) => tracing::debug!(
            target_db = %handle.target(),
            error = %err,
            "statement failed"
        ),
    }
    result
}
