use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::{Connection, PgConnection};
use tracing::warn;

use crate::db::users::{Page, UserRepository};
use crate::error::HubError;
use crate::router::HubState;
use crate::validate::{sanitize_input, validate_email, validate_name};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Raw query parameters, kept as strings so a non-numeric value maps to
/// `InvalidPagination` instead of a framework rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    limit: Option<String>,
    offset: Option<String>,
}

impl ListParams {
    #[cfg(test)]
    fn raw(limit: Option<&str>, offset: Option<&str>) -> Self {
        Self {
            limit: limit.map(String::from),
            offset: offset.map(String::from),
        }
    }
}

/// Clamp client-supplied pagination before any I/O: limit defaults to 10 and
/// caps at 100, negative limits are rejected; offset defaults to 0 and
/// clamps up to 0.
pub fn parse_pagination(params: &ListParams) -> Result<Page, HubError> {
    let limit = match params.limit.as_deref() {
        None => DEFAULT_LIMIT,
        Some(raw) => {
            let parsed: i64 = raw.trim().parse().map_err(|_| HubError::InvalidPagination)?;
            if parsed < 0 {
                return Err(HubError::InvalidPagination);
            }
            parsed.min(MAX_LIMIT)
        }
    };

    let offset = match params.offset.as_deref() {
        None => 0,
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| HubError::InvalidPagination)?
            .max(0),
    };

    Ok(Page { limit, offset })
}

/// GET /api/users — newest-first page plus total count.
pub async fn list_users(
    State(state): State<HubState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, HubError> {
    let page = parse_pagination(&params)?;

    let bundle = state.secrets.fetch(&state.secret_name, &state.region).await?;
    let mut conn = state.connector.connect(&bundle).await?;
    let result = UserRepository::new(&mut conn).list(&page).await;
    close_quietly(conn).await;
    let (users, total) = result?;

    let count = users.len();
    Ok(Json(json!({
        "users": users,
        "count": count,
        "total": total,
        "limit": page.limit,
        "offset": page.offset,
    })))
}

/// GET /api/users/{id} — invalid ids are rejected before any secret fetch
/// or database call.
pub async fn get_user(
    State(state): State<HubState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, HubError> {
    let id: i64 = id.parse().map_err(|_| HubError::InvalidId)?;
    if id <= 0 {
        return Err(HubError::InvalidId);
    }

    let bundle = state.secrets.fetch(&state.secret_name, &state.region).await?;
    let mut conn = state.connector.connect(&bundle).await?;
    let result = UserRepository::new(&mut conn).get(id).await;
    close_quietly(conn).await;
    let user = result?;

    Ok(Json(json!({ "user": user })))
}

/// POST /api/users — both fields are sanitized and validated before the
/// secret fetch; duplicate emails surface as 409 via the schema constraint.
pub async fn create_user(
    State(state): State<HubState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, HubError> {
    let Json(data) = body.map_err(|_| HubError::InvalidBody)?;
    // An empty object carries no data, same as a non-object body.
    let fields = data
        .as_object()
        .filter(|o| !o.is_empty())
        .ok_or(HubError::EmptyBody)?;

    let name = sanitize_input(fields.get("name")).ok_or(HubError::InvalidName)?;
    if !validate_name(&name) {
        return Err(HubError::InvalidName);
    }

    let email = sanitize_input(fields.get("email")).ok_or(HubError::InvalidEmail)?;
    if !validate_email(&email) {
        return Err(HubError::InvalidEmail);
    }

    let bundle = state.secrets.fetch(&state.secret_name, &state.region).await?;
    let mut conn = state.connector.connect(&bundle).await?;
    let result = UserRepository::new(&mut conn).create(&name, &email).await;
    close_quietly(conn).await;
    let user = result?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "user": user,
        })),
    ))
}

/// Connections are request-scoped; a close failure is not the request's
/// failure, only worth a log line.
async fn close_quietly(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        warn!(error = %e, "failed to close database connection");
    }
}
