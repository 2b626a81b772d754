//! Mapping between stored users and SCIM User resources.
//!
//! The store keeps a single free-text display name; SCIM exposes structured name
//! components. Outbound, the components are parsed from the display name and the
//! SCIM `displayName` is re-joined from them. Inbound, supplied components are
//! joined into the display name that gets stored.

use thiserror::Error;

use super::types::{
    SCHEMA_USER, ScimEmail, ScimEmailPayload, ScimMeta, ScimName, ScimUser, ScimUserPayload,
};
use crate::models::{NewUser, UpdateUser, User, UserEmail};

/// Inbound payload rejected before reaching the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("userName is required")]
    MissingUserName,
    #[error("email value must not be empty (emails[{0}])")]
    EmptyEmail(usize),
}

/// Convert a stored user to its SCIM representation.
///
/// `base_url` is the SCIM service root (e.g. `https://idp.example.com/scim/v2`);
/// when set, `meta.location` points at the user's resource URL.
pub fn to_scim_user(user: &User, base_url: Option<&str>) -> ScimUser {
    let name = parse_display_name(&user.display_name);
    let display_name = name.formatted();

    let primary = user.emails.iter().position(|e| e.is_primary);
    let emails = user
        .emails
        .iter()
        .enumerate()
        .map(|(i, e)| ScimEmail::new(e.address.clone(), Some(i) == primary))
        .collect();

    let mut meta = ScimMeta::user(user.created_at, user.updated_at);
    if let Some(base_url) = base_url {
        meta = meta.with_location(format!(
            "{}/Users/{}",
            base_url.trim_end_matches('/'),
            user.id
        ));
    }

    ScimUser {
        schemas: vec![SCHEMA_USER.to_string()],
        id: user.id.to_string(),
        external_id: user
            .is_scim_correlated()
            .then(|| user.scim_external_id.clone()),
        user_name: user.username.clone(),
        name: (!name.is_empty()).then_some(name),
        display_name,
        emails,
        active: true,
        meta: Some(meta),
    }
}

/// Split a stored display name into name components.
///
/// One word is a given name, two are given and family, and with three or more
/// the words between the first and the last form the middle name.
pub fn parse_display_name(display_name: &str) -> ScimName {
    let words: Vec<&str> = display_name.split_whitespace().collect();
    let owned = |s: &str| Some(s.to_string());
    match words.as_slice() {
        [] => ScimName::default(),
        [given] => ScimName {
            given_name: owned(given),
            ..Default::default()
        },
        [given, family] => ScimName {
            given_name: owned(given),
            middle_name: None,
            family_name: owned(family),
        },
        [given, middle @ .., family] => ScimName {
            given_name: owned(given),
            middle_name: Some(middle.join(" ")),
            family_name: owned(family),
        },
    }
}

/// The fields of an inbound payload, normalized for the store.
///
/// `None` always means "not supplied"; nothing is defaulted here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAttributes {
    pub user_name: Option<String>,
    pub given_name: Option<String>,
    pub middle_name: Option<String>,
    pub family_name: Option<String>,
    /// Joined name components, or the supplied `displayName` when no component was given
    pub display_name: Option<String>,
    /// First `primary: true` entry wins; addresses are trimmed
    pub emails: Option<Vec<UserEmail>>,
    pub external_id: Option<String>,
    pub active: Option<bool>,
}

/// Normalize an inbound payload.
pub fn from_payload(payload: &ScimUserPayload) -> Result<UserAttributes, MappingError> {
    let trimmed = |s: &Option<String>| s.as_deref().map(|v| v.trim().to_string());
    let component = |s: &Option<String>| trimmed(s).filter(|v| !v.is_empty());

    let (given_name, middle_name, family_name) = match &payload.name {
        Some(name) => (
            component(&name.given_name),
            component(&name.middle_name),
            component(&name.family_name),
        ),
        None => (None, None, None),
    };

    let joined = [&given_name, &middle_name, &family_name]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    let display_name = if joined.is_empty() {
        trimmed(&payload.display_name)
    } else {
        Some(joined)
    };

    let emails = payload.emails.as_deref().map(map_emails).transpose()?;

    Ok(UserAttributes {
        user_name: trimmed(&payload.user_name),
        given_name,
        middle_name,
        family_name,
        display_name,
        emails,
        external_id: trimmed(&payload.external_id),
        active: payload.active,
    })
}

fn map_emails(emails: &[ScimEmailPayload]) -> Result<Vec<UserEmail>, MappingError> {
    let mut primary_seen = false;
    emails
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let address = e.value.trim();
            if address.is_empty() {
                return Err(MappingError::EmptyEmail(i));
            }
            let is_primary = e.primary == Some(true) && !primary_seen;
            primary_seen |= is_primary;
            Ok(UserEmail {
                address: address.to_string(),
                is_primary,
                verified: false,
            })
        })
        .collect()
}

impl UserAttributes {
    /// The supplied `userName`, which create and replace both require.
    pub fn require_user_name(&self) -> Result<&str, MappingError> {
        self.user_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or(MappingError::MissingUserName)
    }

    /// Build the store input for a new user.
    ///
    /// With `verify_emails` the provisioned addresses are stored as verified,
    /// trusting the identity provider to have checked them.
    pub fn into_new_user(self, verify_emails: bool) -> Result<NewUser, MappingError> {
        let username = self.require_user_name()?.to_string();
        Ok(NewUser {
            username,
            display_name: self.display_name.unwrap_or_default(),
            emails: mark_verified(self.emails.unwrap_or_default(), verify_emails, None),
            scim_external_id: self.external_id.unwrap_or_default(),
        })
    }

    /// Build the store update that makes `current` match this payload.
    ///
    /// Fields that were not supplied are left as they are. Addresses the user
    /// already had keep their verification state.
    pub fn into_update(self, current: &User, verify_emails: bool) -> Result<UpdateUser, MappingError> {
        let username = self.require_user_name()?.to_string();
        Ok(UpdateUser {
            username: (username != current.username).then_some(username),
            display_name: self.display_name,
            emails: self
                .emails
                .map(|emails| mark_verified(emails, verify_emails, Some(current))),
            scim_external_id: self.external_id,
        })
    }
}

fn mark_verified(mut emails: Vec<UserEmail>, verify: bool, current: Option<&User>) -> Vec<UserEmail> {
    for email in &mut emails {
        email.verified = verify
            || current.is_some_and(|user| {
                user.emails
                    .iter()
                    .any(|e| e.verified && e.address == email.address)
            });
    }
    emails
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn stored(id: i32, username: &str, display_name: &str, emails: Vec<UserEmail>) -> User {
        let now = Utc::now();
        User {
            id,
            username: username.to_string(),
            display_name: display_name.to_string(),
            emails,
            scim_external_id: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn name(given: Option<&str>, middle: Option<&str>, family: Option<&str>) -> ScimName {
        ScimName {
            given_name: given.map(String::from),
            middle_name: middle.map(String::from),
            family_name: family.map(String::from),
        }
    }

    #[test]
    fn test_parse_display_name() {
        assert_eq!(parse_display_name(""), ScimName::default());
        assert_eq!(parse_display_name("   "), ScimName::default());
        assert_eq!(parse_display_name("Cher"), name(Some("Cher"), None, None));
        assert_eq!(
            parse_display_name("First Last"),
            name(Some("First"), None, Some("Last"))
        );
        assert_eq!(
            parse_display_name("First Middle Last"),
            name(Some("First"), Some("Middle"), Some("Last"))
        );
        assert_eq!(
            parse_display_name("  Anna  Maria Van Der Berg "),
            name(Some("Anna"), Some("Maria Van Der"), Some("Berg"))
        );
    }

    #[test]
    fn test_to_scim_user_correlated() {
        let mut user = stored(1, "user1", "First Last", vec![UserEmail::new("a@example.com")]);
        user.scim_external_id = "external1".to_string();

        let scim = to_scim_user(&user, None);
        assert_eq!(scim.id, "1");
        assert_eq!(scim.external_id.as_deref(), Some("external1"));
        assert_eq!(scim.user_name, "user1");
        assert_eq!(scim.display_name, "First Last");
        assert_eq!(scim.name, Some(name(Some("First"), None, Some("Last"))));
        assert_eq!(scim.emails, vec![ScimEmail::new("a@example.com", false)]);
        assert!(scim.active);
        assert_eq!(scim.schemas, vec![SCHEMA_USER.to_string()]);

        let meta = scim.meta.unwrap();
        assert_eq!(meta.resource_type, "User");
        assert_eq!(meta.created, user.created_at);
        assert!(meta.location.is_none());
    }

    #[test]
    fn test_to_scim_user_uncorrelated_without_name() {
        let user = stored(4, "user4", "", Vec::new());
        let scim = to_scim_user(&user, Some("https://sso.example.com/scim/v2/"));
        assert!(scim.external_id.is_none());
        assert!(scim.name.is_none());
        assert_eq!(scim.display_name, "");
        assert!(scim.emails.is_empty());
        assert_eq!(
            scim.meta.unwrap().location.as_deref(),
            Some("https://sso.example.com/scim/v2/Users/4")
        );
    }

    #[test]
    fn test_to_scim_user_marks_first_primary_only() {
        let user = stored(
            2,
            "user2",
            "First Middle Last",
            vec![
                UserEmail::new("a@example.com"),
                UserEmail::primary("b@example.com"),
                UserEmail::primary("c@example.com"),
            ],
        );
        let scim = to_scim_user(&user, None);
        let flags: Vec<bool> = scim.emails.iter().map(|e| e.primary).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert_eq!(scim.primary_email(), Some("b@example.com"));
        assert_eq!(scim.display_name, "First Middle Last");
    }

    #[test]
    fn test_from_payload_absent_fields_stay_none() {
        let attrs = from_payload(&ScimUserPayload::default()).unwrap();
        assert_eq!(attrs, UserAttributes::default());
        assert_eq!(attrs.require_user_name(), Err(MappingError::MissingUserName));
    }

    #[test]
    fn test_from_payload_blank_user_name_is_missing() {
        let attrs = from_payload(&ScimUserPayload {
            user_name: Some("   ".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(attrs.require_user_name(), Err(MappingError::MissingUserName));
    }

    #[test]
    fn test_from_payload_joins_supplied_components() {
        let attrs = from_payload(&ScimUserPayload {
            user_name: Some("user1".to_string()),
            name: Some(name(Some("First"), Some(""), Some("Last"))),
            display_name: Some("Ignored".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(attrs.display_name.as_deref(), Some("First Last"));
        assert!(attrs.middle_name.is_none());
        assert_eq!(attrs.require_user_name(), Ok("user1"));
    }

    #[test]
    fn test_from_payload_falls_back_to_display_name() {
        let attrs = from_payload(&ScimUserPayload {
            name: Some(ScimName::default()),
            display_name: Some(" Babs Jensen ".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(attrs.display_name.as_deref(), Some("Babs Jensen"));
    }

    #[test]
    fn test_from_payload_emails() {
        let attrs = from_payload(&ScimUserPayload {
            emails: Some(vec![
                ScimEmailPayload::new(" a@example.com "),
                ScimEmailPayload::primary("b@example.com"),
                ScimEmailPayload::primary("c@example.com"),
            ]),
            ..Default::default()
        })
        .unwrap();
        let emails = attrs.emails.unwrap();
        assert_eq!(emails[0], UserEmail::new("a@example.com"));
        assert_eq!(emails[1], UserEmail::primary("b@example.com"));
        assert_eq!(emails[2], UserEmail::new("c@example.com"));
    }

    #[test]
    fn test_from_payload_rejects_empty_email() {
        let err = from_payload(&ScimUserPayload {
            emails: Some(vec![
                ScimEmailPayload::new("a@example.com"),
                ScimEmailPayload::new("  "),
            ]),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, MappingError::EmptyEmail(1));
    }

    #[test]
    fn test_round_trip_does_not_invent_middle_name() {
        let payload = ScimUserPayload {
            user_name: Some("user1".to_string()),
            name: Some(name(Some("First"), None, Some("Last"))),
            emails: Some(vec![ScimEmailPayload::primary("a@b.c")]),
            ..Default::default()
        };
        let new_user = from_payload(&payload)
            .unwrap()
            .into_new_user(false)
            .unwrap();
        assert_eq!(new_user.display_name, "First Last");

        let user = stored(5, &new_user.username, &new_user.display_name, new_user.emails);
        let scim = to_scim_user(&user, None);
        assert_eq!(scim.user_name, "user1");
        assert_eq!(scim.display_name, "First Last");
        assert_eq!(scim.name, Some(name(Some("First"), None, Some("Last"))));
        assert_eq!(scim.emails, vec![ScimEmail::new("a@b.c", true)]);
    }

    #[test]
    fn test_into_new_user_defaults_and_verification() {
        let attrs = UserAttributes {
            user_name: Some("user1".to_string()),
            emails: Some(vec![UserEmail::primary("a@b.c")]),
            external_id: Some("ext".to_string()),
            ..Default::default()
        };
        let new_user = attrs.clone().into_new_user(true).unwrap();
        assert_eq!(new_user.display_name, "");
        assert_eq!(new_user.scim_external_id, "ext");
        assert!(new_user.emails[0].verified);

        let unverified = attrs.into_new_user(false).unwrap();
        assert!(!unverified.emails[0].verified);
    }

    #[test]
    fn test_into_update_only_touches_supplied_fields() {
        let mut current = stored(
            1,
            "user1",
            "First Last",
            vec![UserEmail {
                address: "a@b.c".to_string(),
                is_primary: true,
                verified: true,
            }],
        );
        current.scim_external_id = "ext".to_string();

        let update = UserAttributes {
            user_name: Some("user1".to_string()),
            ..Default::default()
        }
        .into_update(&current, false)
        .unwrap();
        assert!(update.is_empty());

        let update = UserAttributes {
            user_name: Some("renamed".to_string()),
            emails: Some(vec![UserEmail::primary("a@b.c"), UserEmail::new("new@b.c")]),
            ..Default::default()
        }
        .into_update(&current, false)
        .unwrap();
        assert_eq!(update.username.as_deref(), Some("renamed"));
        let emails = update.emails.unwrap();
        assert!(emails[0].verified);
        assert!(!emails[1].verified);
        assert!(update.display_name.is_none());
        assert!(update.scim_external_id.is_none());
    }

    #[test]
    fn test_into_update_requires_user_name() {
        let current = stored(1, "user1", "", Vec::new());
        let err = UserAttributes::default()
            .into_update(&current, false)
            .unwrap_err();
        assert_eq!(err, MappingError::MissingUserName);
    }
}
