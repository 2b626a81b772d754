//! SCIM 2.0 User Resource Endpoints
//!
//! Implements RFC 7644 Section 3 operations for User resources:
//! - POST /Users: Create user
//! - GET /Users: List/search users
//! - GET /Users/{id}: Get user by ID
//! - PUT /Users/{id}: Replace user
//! - DELETE /Users/{id}: Delete user

use axum::{
    Extension,
    body::Bytes,
    extract::{Path, Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use http::{StatusCode, header};
use serde::Serialize;

use crate::{
    AppState,
    models::Actor,
    scim::{SCIM_CONTENT_TYPE, ScimErrorResponse, ScimListParams, ScimUserPayload},
};

// =============================================================================
// Custom Response Type for SCIM Content-Type
// =============================================================================

/// SCIM JSON response with correct Content-Type and status code.
pub struct ScimJsonWithStatus<T> {
    body: T,
    status: StatusCode,
}

impl<T: Serialize> ScimJsonWithStatus<T> {
    pub fn ok(body: T) -> Self {
        Self {
            body,
            status: StatusCode::OK,
        }
    }

    pub fn created(body: T) -> Self {
        Self {
            body,
            status: StatusCode::CREATED,
        }
    }
}

impl<T: Serialize> IntoResponse for ScimJsonWithStatus<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.body) {
            Ok(body) => (
                self.status,
                [(header::CONTENT_TYPE, SCIM_CONTENT_TYPE)],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize SCIM response: {}", e);
                ScimErrorResponse::internal("Failed to serialize response").into_response()
            }
        }
    }
}

fn parse_payload(body: &Bytes) -> Result<ScimUserPayload, ScimErrorResponse> {
    serde_json::from_slice(body)
        .map_err(|e| ScimErrorResponse::invalid_syntax(format!("Invalid JSON: {}", e)))
}

// =============================================================================
// User Endpoints
// =============================================================================

/// List users with optional filter and pagination.
///
/// `GET /scim/v2/Users`
///
/// Query parameters:
/// - `filter`: SCIM filter expression (e.g., `userName eq "john@example.com"`)
/// - `startIndex`: 1-based pagination start (default: 1)
/// - `count`: Results per page (default: all, capped by `scim.max_results`)
#[tracing::instrument(name = "scim.users.list", skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    params: Result<Query<ScimListParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => {
            return ScimErrorResponse::invalid_value(format!("Invalid query parameters: {}", e))
                .into_response();
        }
    };

    match state.scim_users.get_all(&actor, &params).await {
        Ok(response) => ScimJsonWithStatus::ok(response).into_response(),
        Err(e) => ScimErrorResponse::from(e).into_response(),
    }
}

/// Create a new user.
///
/// `POST /scim/v2/Users`
///
/// Returns 201 Created with the full user resource on success.
#[tracing::instrument(name = "scim.users.create", skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    body: Bytes,
) -> Response {
    let payload = match parse_payload(&body) {
        Ok(p) => p,
        Err(e) => return e.into_response(),
    };

    match state.scim_users.create(&actor, &payload).await {
        Ok(created) => ScimJsonWithStatus::created(created).into_response(),
        Err(e) => ScimErrorResponse::from(e).into_response(),
    }
}

/// Get a user by ID.
///
/// `GET /scim/v2/Users/{id}`
#[tracing::instrument(name = "scim.users.get", skip_all, fields(%id))]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Response {
    match state.scim_users.get(&actor, &id).await {
        Ok(user) => ScimJsonWithStatus::ok(user).into_response(),
        Err(e) => ScimErrorResponse::from(e).into_response(),
    }
}

/// Replace a user.
///
/// `PUT /scim/v2/Users/{id}`
///
/// Attributes absent from the request keep their stored values.
#[tracing::instrument(name = "scim.users.replace", skip_all, fields(%id))]
pub async fn replace_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let payload = match parse_payload(&body) {
        Ok(p) => p,
        Err(e) => return e.into_response(),
    };

    match state.scim_users.replace(&actor, &id, &payload).await {
        Ok(updated) => ScimJsonWithStatus::ok(updated).into_response(),
        Err(e) => ScimErrorResponse::from(e).into_response(),
    }
}

/// Delete a user.
///
/// `DELETE /scim/v2/Users/{id}`
#[tracing::instrument(name = "scim.users.delete", skip_all, fields(%id))]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Response {
    match state.scim_users.delete(&actor, &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ScimErrorResponse::from(e).into_response(),
    }
}
