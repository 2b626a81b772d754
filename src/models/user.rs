use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_emails;

/// An email address attached to a user, in store order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEmail {
    pub address: String,
    /// At most one email per user is primary.
    pub is_primary: bool,
    /// The store never verifies an address on its own.
    pub verified: bool,
}

impl UserEmail {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            is_primary: false,
            verified: false,
        }
    }

    pub fn primary(address: impl Into<String>) -> Self {
        Self {
            is_primary: true,
            ..Self::new(address)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Numeric identity, assigned by the store and never reused
    pub id: i32,
    pub username: String,
    pub display_name: String,
    pub emails: Vec<UserEmail>,
    /// Identity-provider correlation id; empty when the user was not provisioned via SCIM
    pub scim_external_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// First email flagged primary, in store order.
    pub fn primary_email(&self) -> Option<&UserEmail> {
        self.emails.iter().find(|e| e.is_primary)
    }

    /// Whether this user is correlated to an identity-provider record.
    pub fn is_scim_correlated(&self) -> bool {
        !self.scim_external_id.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(length(max = 255))]
    pub display_name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_emails"))]
    pub emails: Vec<UserEmail>,
    /// Empty when the user is not correlated to an identity provider
    #[serde(default)]
    #[validate(length(max = 255))]
    pub scim_external_id: String,
}

/// Partial update of a user. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 255))]
    pub username: Option<String>,
    #[validate(length(max = 255))]
    pub display_name: Option<String>,
    /// Replaces the whole email list when present
    #[validate(custom(function = "validate_emails"))]
    pub emails: Option<Vec<UserEmail>>,
    #[validate(length(max = 255))]
    pub scim_external_id: Option<String>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.display_name.is_none()
            && self.emails.is_none()
            && self.scim_external_id.is_none()
    }
}

/// Offset/limit window used by the store's own pagination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitOffset {
    pub limit: usize,
    pub offset: usize,
}

/// Options narrowing a user listing.
///
/// All set narrowing fields are combined with AND. Results are always ordered by
/// id ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsersListOptions {
    /// Only users with one of these ids
    pub user_ids: Option<Vec<i32>>,
    /// Only users with one of these usernames
    pub usernames: Option<Vec<String>>,
    /// Only users correlated to one of these external ids
    pub external_ids: Option<Vec<String>>,
    /// Window applied after narrowing
    pub limit_offset: Option<LimitOffset>,
}

impl UsersListOptions {
    /// Whether `user` satisfies the narrowing fields (ignores the window).
    pub fn matches(&self, user: &User) -> bool {
        self.user_ids
            .as_ref()
            .is_none_or(|ids| ids.contains(&user.id))
            && self
                .usernames
                .as_ref()
                .is_none_or(|names| names.iter().any(|n| *n == user.username))
            && self
                .external_ids
                .as_ref()
                .is_none_or(|ids| ids.iter().any(|id| *id == user.scim_external_id))
    }

    /// Whether any narrowing field is set.
    pub fn is_narrowed(&self) -> bool {
        self.user_ids.is_some() || self.usernames.is_some() || self.external_ids.is_some()
    }
}
