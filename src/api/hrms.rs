use axum::Router;
use axum::extract::State;
use axum::routing::get;

use super::{ApiError, AppState};
use crate::config::Target;
use crate::envelope::Envelope;
use crate::query::QueryDescriptor;

const LIST_DEPARTMENTS: &str =
    "SELECT id, name, code FROM departments WHERE is_active = 1 ORDER BY name ASC";

pub fn router() -> Router<AppState> {
    Router::new().route("/api/hrms/departments", get(list_departments))
}

/// GET /api/hrms/departments
async fn list_departments(State(state): State<AppState>) -> Result<Envelope, ApiError> {
    let rows = state
        .run(Target::Hrms, QueryDescriptor::new(LIST_DEPARTMENTS))
        .await?;
    Ok(Envelope::success(rows))
}
