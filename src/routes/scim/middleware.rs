//! SCIM Bearer Token Authentication Middleware
//!
//! Identity providers authenticate with a single shared bearer token taken
//! from `scim.bearer_token`. A valid token makes the caller a site admin.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::{AppState, models::Actor, scim::ScimErrorResponse};

/// SCIM bearer token authentication middleware.
///
/// Extracts the bearer token from the Authorization header, compares it
/// against the configured token, and injects an [`Actor`] into request
/// extensions.
///
/// Returns RFC 7644 compliant error responses on authentication failure.
pub async fn scim_auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.config.scim.bearer_token.as_deref() else {
        tracing::debug!("SCIM request rejected: no bearer token configured");
        return ScimErrorResponse::unauthorized("SCIM provisioning is not enabled")
            .into_response();
    };

    let token = match extract_bearer_token(&request) {
        Some(token) => token,
        None => {
            return ScimErrorResponse::unauthorized(
                "Missing or invalid Authorization header. Expected: Bearer <token>",
            )
            .into_response();
        }
    };

    if !token_matches(token, expected) {
        tracing::debug!("SCIM authentication failed: invalid token");
        return ScimErrorResponse::unauthorized("Invalid SCIM bearer token").into_response();
    }

    request.extensions_mut().insert(Actor::site_admin());

    next.run(request).await
}

/// Extract bearer token from the Authorization header.
///
/// Expects format: `Authorization: Bearer <token>`
/// Returns the token portion (may be empty if no token provided after "Bearer ").
fn extract_bearer_token(request: &Request<Body>) -> Option<&str> {
    let auth_header = request.headers().get(header::AUTHORIZATION)?;
    let auth_str = auth_header.to_str().ok()?;

    // Case-insensitive "Bearer " prefix check (7 chars for "Bearer ")
    if auth_str.len() >= 7 && auth_str[..7].eq_ignore_ascii_case("Bearer ") {
        Some(&auth_str[7..])
    } else {
        None
    }
}

fn token_matches(presented: &str, expected: &str) -> bool {
    !presented.is_empty() && bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}
