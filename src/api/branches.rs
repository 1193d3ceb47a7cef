//! Admin CRUD over the `branches` table on the primary target.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use super::{ApiError, AppState, parse_id};
use crate::config::Target;
use crate::envelope::Envelope;
use crate::error::DalError;
use crate::query::QueryDescriptor;
use crate::results::ResultSet;

const LIST_ACTIVE: &str = "SELECT id, name, code, address, is_active, created_at, updated_at \
     FROM branches WHERE is_active = 1 ORDER BY name ASC";

const GET_BY_ID: &str = "SELECT id, name, code, address, is_active, created_at, updated_at \
     FROM branches WHERE id = @id";

const INSERT: &str = "INSERT INTO branches \
     (name, code, address, is_active, created_at, updated_at) \
     OUTPUT INSERTED.id, INSERTED.name, INSERTED.code, INSERTED.address, \
     INSERTED.is_active, INSERTED.created_at, INSERTED.updated_at \
     VALUES (@name, @code, @address, 1, SYSUTCDATETIME(), SYSUTCDATETIME())";

const UPDATE: &str = "UPDATE branches SET name = @name, code = @code, address = @address, \
     is_active = COALESCE(@is_active, is_active), updated_at = SYSUTCDATETIME() \
     WHERE id = @id";

const SOFT_DELETE: &str = "UPDATE branches SET is_active = 0, updated_at = SYSUTCDATETIME() \
     WHERE id = @id AND is_active = 1";

const RESOURCE: &str = "Branch";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/branches", get(list).post(create))
        .route(
            "/api/admin/branches/{id}",
            get(fetch).put(update).delete(remove),
        )
}

/// Request body for create and update.
#[derive(Debug, Default, Deserialize)]
pub struct BranchInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl BranchInput {
    /// Trimmed name, rejecting blanks before any database work.
    fn required_name(&self) -> Result<&str, ApiError> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::validation("Name is required"))
    }
}

fn body(payload: Result<Json<BranchInput>, JsonRejection>) -> Result<BranchInput, ApiError> {
    payload
        .map(|Json(input)| input)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

fn first_or_not_found(rows: ResultSet) -> Result<Envelope, ApiError> {
    match rows.first() {
        Some(row) => Ok(Envelope::success(row)),
        None => Err(ApiError::not_found(RESOURCE)),
    }
}

/// GET /api/admin/branches
async fn list(State(state): State<AppState>) -> Result<Envelope, ApiError> {
    let rows = state
        .run(Target::Primary, QueryDescriptor::new(LIST_ACTIVE))
        .await?;
    Ok(Envelope::success(rows))
}

/// GET /api/admin/branches/{id}
async fn fetch(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Envelope, ApiError> {
    let id = parse_id(&raw, "branch")?;
    let rows = state
        .run(Target::Primary, QueryDescriptor::new(GET_BY_ID).bind("id", id))
        .await?;
    first_or_not_found(rows)
}

/// POST /api/admin/branches
async fn create(
    State(state): State<AppState>,
    payload: Result<Json<BranchInput>, JsonRejection>,
) -> Result<Envelope, ApiError> {
    let input = body(payload)?;
    let name = input.required_name()?;

    let descriptor = QueryDescriptor::new(INSERT)
        .bind("name", name)
        .bind("code", input.code.as_deref().map(str::trim))
        .bind("address", input.address.as_deref());
    let rows = state.run(Target::Primary, descriptor).await?;
    match rows.first() {
        Some(row) => {
            tracing::info!(branch_id = ?row.get("id"), "branch created");
            Ok(Envelope::success(row).with_status(StatusCode::CREATED))
        }
        None => Err(ApiError(DalError::QueryError(
            "insert returned no row".into(),
        ))),
    }
}

/// PUT /api/admin/branches/{id}
///
/// Input is validated before a pool is acquired. The updated row is read back
/// so a missing id surfaces as 404 rather than an empty success.
async fn update(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    payload: Result<Json<BranchInput>, JsonRejection>,
) -> Result<Envelope, ApiError> {
    let id = parse_id(&raw, "branch")?;
    let input = body(payload)?;
    let name = input.required_name()?;

    let descriptor = QueryDescriptor::dml(UPDATE)
        .bind("id", id)
        .bind("name", name)
        .bind("code", input.code.as_deref().map(str::trim))
        .bind("address", input.address.as_deref())
        .bind("is_active", input.is_active);
    let updated = state.run(Target::Primary, descriptor).await?;
    tracing::debug!(branch_id = id, rows = updated.rows_affected, "branch update applied");

    let rows = state
        .run(Target::Primary, QueryDescriptor::new(GET_BY_ID).bind("id", id))
        .await?;
    first_or_not_found(rows)
}

/// DELETE /api/admin/branches/{id}
async fn remove(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Envelope, ApiError> {
    let id = parse_id(&raw, "branch")?;
    let deleted = state
        .run(Target::Primary, QueryDescriptor::dml(SOFT_DELETE).bind("id", id))
        .await?;
    if deleted.rows_affected == 0 {
        return Err(ApiError::not_found(RESOURCE));
    }
    tracing::info!(branch_id = id, "branch deactivated");
    Ok(Envelope::success(serde_json::json!({ "id": id, "deleted": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected() {
        let input = BranchInput {
            name: Some("   ".into()),
            ..BranchInput::default()
        };
        let err = input.required_name().unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Name is required");

        assert!(BranchInput::default().required_name().is_err());
    }

    #[test]
    fn names_are_trimmed() {
        let input = BranchInput {
            name: Some("  North  ".into()),
            ..BranchInput::default()
        };
        assert_eq!(input.required_name().unwrap(), "North");
    }

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("12", "branch").unwrap(), 12);
        for raw in ["0", "-3", "abc", "1;DROP TABLE branches"] {
            let err = parse_id(raw, "branch").unwrap_err();
            assert_eq!(err.public_message(), "Invalid branch id");
        }
    }
}
