//! Error bodies returned by the Users endpoints.
//!
//! Every failure leaves the gateway as a `urn:...:api:messages:2.0:Error`
//! document. Filter and payload problems are 400s with a `scimType`, a taken
//! `userName` or `externalId` is a 409 `uniqueness`, and auth, lookup and
//! store failures carry only a status.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::{SCIM_CONTENT_TYPE, types::SCHEMA_ERROR};

/// Wire form of a provisioning failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimErrorResponse {
    /// Always exactly the Error schema URI
    pub schemas: Vec<String>,

    /// HTTP status rendered as a decimal string
    pub status: String,

    /// Set for 400 and 409 responses only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<ScimErrorType>,

    /// Message from the failing layer, e.g. the filter parser's position error
    pub detail: String,
}

impl ScimErrorResponse {
    fn new(
        status: StatusCode,
        scim_type: Option<ScimErrorType>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            schemas: vec![SCHEMA_ERROR.to_string()],
            status: status.as_u16().to_string(),
            scim_type,
            detail: detail.into(),
        }
    }

    /// The `filter` query parameter did not parse (400).
    pub fn invalid_filter(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            Some(ScimErrorType::InvalidFilter),
            detail,
        )
    }

    /// Request body is not a JSON user payload (400).
    pub fn invalid_syntax(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            Some(ScimErrorType::InvalidSyntax),
            detail,
        )
    }

    /// Payload or query value rejected before reaching the store (400).
    pub fn invalid_value(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            Some(ScimErrorType::InvalidValue),
            detail,
        )
    }

    /// Bearer token missing, wrong, or not configured (401).
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, None, detail)
    }

    /// Caller is not a site admin (403).
    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, None, detail)
    }

    /// No user with the requested id (404).
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, None, detail)
    }

    /// `userName` or `externalId` already belongs to another user (409).
    pub fn uniqueness(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            Some(ScimErrorType::Uniqueness),
            detail,
        )
    }

    /// Store or serialization failure (500).
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, None, detail)
    }

    /// Status to send; an unparsable `status` falls back to 500.
    pub fn status_code(&self) -> StatusCode {
        self.status
            .parse()
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ScimErrorResponse {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            [(header::CONTENT_TYPE, SCIM_CONTENT_TYPE)],
            Json(self),
        )
            .into_response()
    }
}

/// `scimType` values this gateway emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScimErrorType {
    InvalidFilter,
    InvalidSyntax,
    Uniqueness,
    InvalidValue,
}

impl std::fmt::Display for ScimErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScimErrorType::InvalidFilter => write!(f, "invalidFilter"),
            ScimErrorType::InvalidSyntax => write!(f, "invalidSyntax"),
            ScimErrorType::Uniqueness => write!(f, "uniqueness"),
            ScimErrorType::InvalidValue => write!(f, "invalidValue"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
