//! SCIM 2.0 User Provisioning Service
//!
//! This service orchestrates user provisioning and deprovisioning operations
//! from identity providers via SCIM 2.0 protocol. It sits between the transport
//! and the user store: payloads are normalized by the mapper, listings are
//! evaluated against the synthesized SCIM resource and then windowed by the pager.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::{
    config::ScimConfig,
    db::{DbError, repos::UserStore},
    models::{Actor, UsersListOptions},
    scim::{
        Filter, FilterParseError, ScimErrorResponse, ScimListParams, ScimListResponse, ScimUser,
        ScimUserPayload, from_payload, mapping::MappingError, parse_filter, to_scim_user, window,
    },
};

/// SCIM provisioning error types
#[derive(Debug, Error)]
pub enum ScimProvisioningError {
    /// Caller is not a site admin
    #[error("Only site admins may manage SCIM users")]
    PermissionDenied,
    /// Filter expression could not be parsed
    #[error("{0}")]
    InvalidFilter(#[from] FilterParseError),
    /// Payload rejected before reaching the store
    #[error("{0}")]
    Validation(String),
    /// Uniqueness violation (userName or externalId)
    #[error("{0}")]
    Conflict(String),
    /// User not found
    #[error("User '{0}' not found")]
    NotFound(String),
    /// Store failure
    #[error("Store error: {0}")]
    Store(DbError),
}

impl From<DbError> for ScimProvisioningError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Conflict(msg) => ScimProvisioningError::Conflict(msg),
            DbError::Validation(msg) => ScimProvisioningError::Validation(msg),
            other => ScimProvisioningError::Store(other),
        }
    }
}

impl From<MappingError> for ScimProvisioningError {
    fn from(e: MappingError) -> Self {
        ScimProvisioningError::Validation(e.to_string())
    }
}

impl From<ScimProvisioningError> for ScimErrorResponse {
    fn from(e: ScimProvisioningError) -> Self {
        match e {
            ScimProvisioningError::PermissionDenied => ScimErrorResponse::forbidden(e.to_string()),
            ScimProvisioningError::InvalidFilter(err) => {
                ScimErrorResponse::invalid_filter(err.to_string())
            }
            ScimProvisioningError::Validation(msg) => ScimErrorResponse::invalid_value(msg),
            ScimProvisioningError::Conflict(msg) => ScimErrorResponse::uniqueness(msg),
            ScimProvisioningError::NotFound(_) => ScimErrorResponse::not_found(e.to_string()),
            ScimProvisioningError::Store(db_err) => {
                ScimErrorResponse::internal(format!("Database error: {}", db_err))
            }
        }
    }
}

/// Result type for SCIM provisioning operations
pub type ProvisioningResult<T> = Result<T, ScimProvisioningError>;

/// SCIM User resource handler.
///
/// Holds no per-request state; clones share the store.
#[derive(Clone)]
pub struct ScimUserHandler {
    store: Arc<dyn UserStore>,
    config: ScimConfig,
}

impl ScimUserHandler {
    pub fn new(store: Arc<dyn UserStore>, config: ScimConfig) -> Self {
        Self { store, config }
    }

    /// Create a new user.
    ///
    /// An `externalId` that is already correlated to a user is a conflict; the
    /// existing user is never silently reused.
    pub async fn create(
        &self,
        actor: &Actor,
        payload: &ScimUserPayload,
    ) -> ProvisioningResult<ScimUser> {
        authorize(actor)?;

        let new_user = from_payload(payload)?.into_new_user(self.config.verify_provisioned_emails)?;

        if !new_user.scim_external_id.is_empty()
            && let Some(existing) = self
                .store
                .get_user_by_external_id(&new_user.scim_external_id)
                .await?
        {
            return Err(ScimProvisioningError::Conflict(format!(
                "externalId '{}' is already provisioned as user {}",
                new_user.scim_external_id, existing.id
            )));
        }

        let user = self.store.create_user(new_user).await?;

        info!(
            user_id = user.id,
            user_name = %user.username,
            correlated = user.is_scim_correlated(),
            "SCIM user created"
        );

        Ok(self.to_resource(&user))
    }

    /// Get a user by id.
    pub async fn get(&self, actor: &Actor, id: &str) -> ProvisioningResult<ScimUser> {
        authorize(actor)?;
        let user_id = parse_user_id(id)?;

        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| ScimProvisioningError::NotFound(id.to_string()))?;

        Ok(self.to_resource(&user))
    }

    /// List users with optional filter and pagination.
    ///
    /// `totalResults` is always the size of the filtered set; `startIndex` and
    /// `count` only choose which part of it is returned.
    pub async fn get_all(
        &self,
        actor: &Actor,
        params: &ScimListParams,
    ) -> ProvisioningResult<ScimListResponse<ScimUser>> {
        authorize(actor)?;

        let filter = params
            .filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(parse_filter)
            .transpose()?;
        let count = self.effective_count(params.count);

        let Some(filter) = filter else {
            let total = self.store.count_users(UsersListOptions::default()).await?;
            let total = usize::try_from(total).unwrap_or(0);
            let page = window(total, params.start_index, count);

            let users = if page.limit == 0 {
                Vec::new()
            } else {
                self.store
                    .list_users(UsersListOptions {
                        limit_offset: Some(page.to_limit_offset()),
                        ..Default::default()
                    })
                    .await?
            };

            let resources = users.iter().map(|u| self.to_resource(u)).collect();
            return Ok(ScimListResponse::new(resources, total, page.start_index()));
        };

        let opts = push_down(&filter);
        let narrowed = opts.is_narrowed();
        let candidates = self.store.list_users(opts).await?;
        let candidate_count = candidates.len();

        let matched: Vec<ScimUser> = candidates
            .iter()
            .map(|u| self.to_resource(u))
            .filter(|u| filter.matches(u))
            .collect();

        let total = matched.len();
        let page = window(total, params.start_index, count);

        debug!(
            filter = %filter,
            narrowed,
            candidates = candidate_count,
            total,
            "SCIM user list filtered"
        );

        Ok(ScimListResponse::new(
            page.apply(matched),
            total,
            page.start_index(),
        ))
    }

    /// Replace a user (PUT).
    ///
    /// Only supplied attributes are written: absent `emails` keeps the stored
    /// list, while `emails: []` clears it. `active` is accepted and ignored.
    pub async fn replace(
        &self,
        actor: &Actor,
        id: &str,
        payload: &ScimUserPayload,
    ) -> ProvisioningResult<ScimUser> {
        authorize(actor)?;
        let user_id = parse_user_id(id)?;

        let attrs = from_payload(payload)?;
        attrs.require_user_name()?;

        let current = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| ScimProvisioningError::NotFound(id.to_string()))?;

        if let Some(external_id) = attrs.external_id.as_deref()
            && !external_id.is_empty()
            && external_id != current.scim_external_id
            && let Some(other) = self.store.get_user_by_external_id(external_id).await?
            && other.id != current.id
        {
            return Err(ScimProvisioningError::Conflict(format!(
                "externalId '{}' is already provisioned as user {}",
                external_id, other.id
            )));
        }

        let update = attrs.into_update(&current, self.config.verify_provisioned_emails)?;
        if update.is_empty() {
            debug!(user_id, "SCIM replace with no changes");
            return Ok(self.to_resource(&current));
        }

        let user = self
            .store
            .update_user(user_id, update)
            .await
            .map_err(not_found_as(id))?;

        info!(user_id, user_name = %user.username, "SCIM user replaced");

        Ok(self.to_resource(&user))
    }

    /// Delete a user.
    pub async fn delete(&self, actor: &Actor, id: &str) -> ProvisioningResult<()> {
        authorize(actor)?;
        let user_id = parse_user_id(id)?;

        self.store
            .delete_user(user_id)
            .await
            .map_err(not_found_as(id))?;

        info!(user_id, "SCIM user deleted");
        Ok(())
    }

    fn to_resource(&self, user: &crate::models::User) -> ScimUser {
        to_scim_user(user, self.config.base_url.as_deref())
    }

    /// Requested page size, capped by `max_results` when configured.
    fn effective_count(&self, requested: Option<i64>) -> Option<i64> {
        let Some(max) = self.config.max_results else {
            return requested;
        };
        let max = i64::try_from(max).unwrap_or(i64::MAX);
        Some(requested.map_or(max, |c| c.min(max)))
    }
}

fn authorize(actor: &Actor) -> ProvisioningResult<()> {
    if actor.site_admin {
        Ok(())
    } else {
        debug!(user_id = ?actor.user_id, "SCIM request denied for non-admin");
        Err(ScimProvisioningError::PermissionDenied)
    }
}

/// Resource ids are stringified store ids; anything else cannot name a user.
fn parse_user_id(id: &str) -> ProvisioningResult<i32> {
    id.parse::<i32>()
        .map_err(|_| ScimProvisioningError::NotFound(id.to_string()))
}

fn not_found_as(id: &str) -> impl FnOnce(DbError) -> ScimProvisioningError + '_ {
    move |e| match e {
        DbError::NotFound => ScimProvisioningError::NotFound(id.to_string()),
        other => other.into(),
    }
}

/// Store options implied by the filter's required equalities.
///
/// Narrowing only shrinks the candidate set; every candidate is still checked
/// against the full filter, so an unsupported predicate is simply not pushed.
fn push_down(filter: &Filter) -> UsersListOptions {
    let mut opts = UsersListOptions::default();
    for (attr, value) in filter.required_equalities() {
        match attr.to_ascii_lowercase().as_str() {
            "username" if opts.usernames.is_none() => {
                opts.usernames = Some(vec![value.to_string()]);
            }
            "externalid" if opts.external_ids.is_none() => {
                opts.external_ids = Some(vec![value.to_string()]);
            }
            // Only a canonical decimal id can equal a stringified store id
            "id" if opts.user_ids.is_none() => {
                opts.user_ids = Some(
                    value
                        .parse::<i32>()
                        .ok()
                        .filter(|id| id.to_string() == value)
                        .into_iter()
                        .collect(),
                );
            }
            _ => {}
        }
    }
    opts
}
