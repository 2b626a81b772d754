use serde::{Deserialize, Serialize};

/// SCIM provisioning configuration.
///
/// ```toml
/// [scim]
/// bearer_token = "${SCIM_TOKEN}"
/// base_url = "https://sso.example.com/scim/v2"
/// max_results = 200
/// verify_provisioned_emails = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScimConfig {
    /// Token the identity provider presents as `Authorization: Bearer <token>`.
    /// Requests carrying it act as a site admin. When unset, every request is
    /// rejected with 401.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Public URL of the SCIM service root, used for `meta.location`.
    /// Omitted from responses when unset.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Upper bound on `count` for list requests. Unbounded when unset.
    #[serde(default)]
    pub max_results: Option<usize>,

    /// Store provisioned email addresses as verified, trusting the identity
    /// provider to have verified them.
    #[serde(default)]
    pub verify_provisioned_emails: bool,
}

impl ScimConfig {
    pub(super) fn validate(&self) -> Result<(), String> {
        if let Some(token) = &self.bearer_token
            && token.trim().is_empty()
        {
            return Err("scim.bearer_token must not be empty".into());
        }
        if let Some(url) = &self.base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(format!(
                "scim.base_url must be an http(s) URL, got '{}'",
                url
            ));
        }
        if self.max_results == Some(0) {
            return Err("scim.max_results must be greater than 0".into());
        }
        Ok(())
    }
}
