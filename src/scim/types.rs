//! SCIM 2.0 Resource and Protocol Types
//!
//! This module defines the SCIM User resource and the protocol types
//! (ListResponse, list query parameters) per RFC 7643/7644.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::filter::{Attribute, Filterable};

// =============================================================================
// Schema URIs
// =============================================================================

/// SCIM Core User schema URI
pub const SCHEMA_USER: &str = "urn:ietf:params:scim:schemas:core:2.0:User";

/// SCIM ListResponse schema URI
pub const SCHEMA_LIST_RESPONSE: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";

/// SCIM Error schema URI
pub const SCHEMA_ERROR: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

// =============================================================================
// Resource Metadata
// =============================================================================

/// Resource metadata common to all SCIM resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimMeta {
    /// The resource type, always "User" here
    pub resource_type: String,

    pub created: DateTime<Utc>,

    pub last_modified: DateTime<Utc>,

    /// The absolute URI of the resource
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ScimMeta {
    /// Create metadata for a User resource
    pub fn user(created: DateTime<Utc>, last_modified: DateTime<Utc>) -> Self {
        Self {
            resource_type: "User".to_string(),
            created,
            last_modified,
            location: None,
        }
    }

    /// Set the location URI
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

// =============================================================================
// User Resource (RFC 7643)
// =============================================================================

/// SCIM User resource as returned to the identity provider.
///
/// Every value here is synthesized from the stored user by
/// [`to_scim_user`](super::mapping::to_scim_user); filters are evaluated against
/// this tree, not against the stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
    /// SCIM schema URIs for this resource
    pub schemas: Vec<String>,

    /// Server-assigned identifier (the stored numeric id, stringified)
    pub id: String,

    /// Client-assigned identifier for correlation with the IdP
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    pub user_name: String,

    /// Name components; omitted when none are known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<ScimName>,

    /// Joined from the name components; may be empty
    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub emails: Vec<ScimEmail>,

    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ScimMeta>,
}

impl ScimUser {
    /// Get the address of the email marked primary, if any
    pub fn primary_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .find(|e| e.primary)
            .map(|e| e.value.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// User's name components. Only non-empty components are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimName {
    /// Given name (first name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,

    /// Family name (last name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

impl ScimName {
    /// Iterate the non-empty components in display order: given, middle, family.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        [&self.given_name, &self.middle_name, &self.family_name]
            .into_iter()
            .filter_map(|c| c.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Whether no component carries a value.
    pub fn is_empty(&self) -> bool {
        self.components().next().is_none()
    }

    /// Components joined by single spaces.
    pub fn formatted(&self) -> String {
        self.components().collect::<Vec<_>>().join(" ")
    }
}

/// Email address with primary flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimEmail {
    pub value: String,

    #[serde(default)]
    pub primary: bool,
}

impl ScimEmail {
    pub fn new(value: impl Into<String>, primary: bool) -> Self {
        Self {
            value: value.into(),
            primary,
        }
    }
}

// =============================================================================
// Inbound Payload
// =============================================================================

/// User payload as sent by the identity provider on create and replace.
///
/// Every field is optional so the mapper can tell "not supplied" apart from
/// "supplied empty". Unknown keys such as `schemas` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUserPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<ScimName>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<ScimEmailPayload>>,

    /// Accepted for compatibility; the store has no deactivation state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Inbound email entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimEmailPayload {
    #[serde(default)]
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,

    /// Email type (e.g., "work"); not stored
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub email_type: Option<String>,
}

impl ScimEmailPayload {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn primary(value: impl Into<String>) -> Self {
        Self {
            primary: Some(true),
            ..Self::new(value)
        }
    }
}

// =============================================================================
// Protocol Types (RFC 7644)
// =============================================================================

/// SCIM list response for paginated collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimListResponse<T> {
    /// SCIM schema URIs
    pub schemas: Vec<String>,

    /// Size of the filtered set before windowing
    pub total_results: usize,

    /// Number of results returned in this response
    pub items_per_page: usize,

    /// 1-based index of the first result in this response
    pub start_index: usize,

    #[serde(rename = "Resources")]
    pub resources: Vec<T>,
}

impl<T> ScimListResponse<T> {
    pub fn new(resources: Vec<T>, total_results: usize, start_index: usize) -> Self {
        let items_per_page = resources.len();
        Self {
            schemas: vec![SCHEMA_LIST_RESPONSE.to_string()],
            total_results,
            items_per_page,
            start_index,
            resources,
        }
    }
}

/// Query parameters for list operations.
///
/// Signed so that out-of-range values (`startIndex=0`, `count=-1`) reach the
/// pager and get clamped instead of being rejected at deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimListParams {
    /// SCIM filter expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// 1-based start index (default: 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<i64>,

    /// Number of results per page (default: all)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

// =============================================================================
// Filter Evaluation
// =============================================================================

impl Filterable for ScimUser {
    fn attribute(&self, name: &str) -> Attribute<'_> {
        match name.to_ascii_lowercase().as_str() {
            "id" => Attribute::String(&self.id),
            "externalid" => self
                .external_id
                .as_deref()
                .map_or(Attribute::Absent, Attribute::String),
            "username" => Attribute::String(&self.user_name),
            "displayname" => Attribute::String(&self.display_name),
            "name" => self
                .name
                .as_ref()
                .map_or(Attribute::Absent, |n| Attribute::Complex(n)),
            "emails" => Attribute::Multi(
                self.emails
                    .iter()
                    .map(|e| e as &dyn Filterable)
                    .collect(),
            ),
            "active" => Attribute::Bool(self.active),
            _ => Attribute::Absent,
        }
    }
}

impl Filterable for ScimName {
    fn attribute(&self, name: &str) -> Attribute<'_> {
        let component = match name.to_ascii_lowercase().as_str() {
            "givenname" => &self.given_name,
            "middlename" => &self.middle_name,
            "familyname" => &self.family_name,
            _ => return Attribute::Absent,
        };
        component
            .as_deref()
            .map_or(Attribute::Absent, Attribute::String)
    }
}

impl Filterable for ScimEmail {
    fn attribute(&self, name: &str) -> Attribute<'_> {
        match name.to_ascii_lowercase().as_str() {
            "value" => Attribute::String(&self.value),
            "primary" => Attribute::Bool(self.primary),
            _ => Attribute::Absent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serializes_camel_case() {
        let user = ScimUser {
            schemas: vec![SCHEMA_USER.to_string()],
            id: "1".to_string(),
            external_id: None,
            user_name: "user1".to_string(),
            name: Some(ScimName {
                given_name: Some("First".to_string()),
                middle_name: None,
                family_name: Some("Last".to_string()),
            }),
            display_name: "First Last".to_string(),
            emails: vec![ScimEmail::new("a@example.com", true)],
            active: true,
            meta: None,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["userName"], "user1");
        assert_eq!(json["displayName"], "First Last");
        assert_eq!(json["name"]["givenName"], "First");
        assert!(json["name"].get("middleName").is_none());
        assert!(json.get("externalId").is_none());
        assert!(json.get("meta").is_none());
        assert_eq!(json["emails"][0]["primary"], true);
    }

    #[test]
    fn test_payload_ignores_unknown_keys() {
        let payload: ScimUserPayload = serde_json::from_value(serde_json::json!({
            "schemas": [SCHEMA_USER],
            "userName": "bjensen",
            "emails": [{"value": "b@example.com", "type": "work", "primary": true}],
            "active": false,
            "phoneNumbers": []
        }))
        .unwrap();

        assert_eq!(payload.user_name.as_deref(), Some("bjensen"));
        assert_eq!(payload.active, Some(false));
        assert!(payload.name.is_none());
        let emails = payload.emails.unwrap();
        assert_eq!(emails[0].primary, Some(true));
        assert_eq!(emails[0].email_type.as_deref(), Some("work"));
    }

    #[test]
    fn test_payload_distinguishes_empty_from_absent_emails() {
        let absent: ScimUserPayload =
            serde_json::from_value(serde_json::json!({"userName": "a"})).unwrap();
        assert!(absent.emails.is_none());

        let empty: ScimUserPayload =
            serde_json::from_value(serde_json::json!({"userName": "a", "emails": []})).unwrap();
        assert_eq!(empty.emails, Some(Vec::new()));
    }

    #[test]
    fn test_name_components_skip_blanks() {
        let name = ScimName {
            given_name: Some("First".to_string()),
            middle_name: Some("  ".to_string()),
            family_name: Some("Last".to_string()),
        };
        assert_eq!(name.formatted(), "First Last");
        assert!(!name.is_empty());
        assert!(ScimName::default().is_empty());
    }

    #[test]
    fn test_list_response_shape() {
        let response = ScimListResponse::new(vec![1, 2], 4, 3);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["totalResults"], 4);
        assert_eq!(json["itemsPerPage"], 2);
        assert_eq!(json["startIndex"], 3);
        assert_eq!(json["Resources"], serde_json::json!([1, 2]));
        assert_eq!(json["schemas"][0], SCHEMA_LIST_RESPONSE);
    }

    #[test]
    fn test_list_params_from_query_keys() {
        let params: ScimListParams = serde_json::from_value(serde_json::json!({
            "filter": "userName eq \"a\"",
            "startIndex": 0,
            "count": -1
        }))
        .unwrap();
        assert_eq!(params.start_index, Some(0));
        assert_eq!(params.count, Some(-1));
    }
}
