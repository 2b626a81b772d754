use serde::{Deserialize, Serialize};

/// The caller on whose behalf a provisioning operation runs.
///
/// Resolved by the transport layer before the request reaches the
/// provisioning service. Only site administrators may provision users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Internal user id of the caller, if the caller is a user.
    pub user_id: Option<i32>,
    /// Whether the caller holds site-admin rights.
    pub site_admin: bool,
}

impl Actor {
    /// A site administrator with no backing user record (e.g. an IdP token).
    pub fn site_admin() -> Self {
        Self {
            user_id: None,
            site_admin: true,
        }
    }

    /// A regular, non-admin user.
    pub fn user(user_id: i32) -> Self {
        Self {
            user_id: Some(user_id),
            site_admin: false,
        }
    }

    /// An unauthenticated caller.
    pub fn anonymous() -> Self {
        Self::default()
    }
}
