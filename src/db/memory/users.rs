//! In-memory user store.
//!
//! Reads are lock-free through `DashMap`. Mutations are serialized by a single
//! write lock so the username index always agrees with the records.

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;
use validator::Validate;

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::UserStore,
    },
    models::{NewUser, UpdateUser, User, UsersListOptions},
};

/// In-memory implementation of [`UserStore`].
///
/// # Multi-Node Deployments
///
/// Each process holds its own independent set of users. Use it for tests,
/// demos and single-node deployments that can tolerate losing state on restart.
#[derive(Debug)]
pub struct MemoryUserStore {
    users: DashMap<i32, User>,
    /// username -> id
    usernames: DashMap<String, i32>,
    next_id: AtomicI32,
    write_lock: Mutex<()>,
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self {
            users: DashMap::new(),
            usernames: DashMap::new(),
            next_id: AtomicI32::new(1),
            write_lock: Mutex::new(()),
        }
    }
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all users ordered by id ascending.
    fn sorted_users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        users
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list_users(&self, opts: UsersListOptions) -> DbResult<Vec<User>> {
        let matching = self
            .sorted_users()
            .into_iter()
            .filter(|u| opts.matches(u));

        let users = match opts.limit_offset {
            Some(lo) => matching.skip(lo.offset).take(lo.limit).collect(),
            None => matching.collect(),
        };

        Ok(users)
    }

    async fn count_users(&self, opts: UsersListOptions) -> DbResult<i64> {
        let count = self.users.iter().filter(|e| opts.matches(e.value())).count();
        Ok(count as i64)
    }

    async fn create_user(&self, input: NewUser) -> DbResult<User> {
        input.validate()?;

        let _guard = self.write_lock.lock().await;

        if self.usernames.contains_key(&input.username) {
            return Err(DbError::Conflict(format!(
                "username '{}' is already taken",
                input.username
            )));
        }

        if !input.scim_external_id.is_empty()
            && self
                .users
                .iter()
                .any(|e| e.value().scim_external_id == input.scim_external_id)
        {
            return Err(DbError::Conflict(format!(
                "external id '{}' is already correlated to a user",
                input.scim_external_id
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let user = User {
            id,
            username: input.username,
            display_name: input.display_name,
            emails: input.emails,
            scim_external_id: input.scim_external_id,
            created_at: now,
            updated_at: now,
        };

        self.usernames.insert(user.username.clone(), id);
        self.users.insert(id, user.clone());

        debug!(user_id = id, username = %user.username, "User created");
        Ok(user)
    }

    async fn update_user(&self, id: i32, input: UpdateUser) -> DbResult<User> {
        input.validate()?;

        let _guard = self.write_lock.lock().await;

        let mut user = self
            .users
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(DbError::NotFound)?;

        let rename = input
            .username
            .filter(|username| *username != user.username);
        let correlate = input
            .scim_external_id
            .filter(|external_id| *external_id != user.scim_external_id);

        // All conflict checks run before the index or the record change
        if let Some(username) = &rename
            && self.usernames.contains_key(username)
        {
            return Err(DbError::Conflict(format!(
                "username '{}' is already taken",
                username
            )));
        }
        if let Some(external_id) = &correlate
            && !external_id.is_empty()
            && self
                .users
                .iter()
                .any(|e| e.value().id != id && e.value().scim_external_id == *external_id)
        {
            return Err(DbError::Conflict(format!(
                "external id '{}' is already correlated to a user",
                external_id
            )));
        }

        if let Some(username) = rename {
            self.usernames.remove(&user.username);
            self.usernames.insert(username.clone(), id);
            user.username = username;
        }
        if let Some(external_id) = correlate {
            user.scim_external_id = external_id;
        }
        if let Some(display_name) = input.display_name {
            user.display_name = display_name;
        }
        if let Some(emails) = input.emails {
            user.emails = emails;
        }
        user.updated_at = Utc::now();

        self.users.insert(id, user.clone());

        debug!(user_id = id, "User updated");
        Ok(user)
    }

    async fn delete_user(&self, id: i32) -> DbResult<()> {
        let _guard = self.write_lock.lock().await;

        let (_, user) = self.users.remove(&id).ok_or(DbError::NotFound)?;
        self.usernames.remove(&user.username);

        debug!(user_id = id, username = %user.username, "User deleted");
        Ok(())
    }

    async fn get_user_by_external_id(&self, external_id: &str) -> DbResult<Option<User>> {
        if external_id.is_empty() {
            return Ok(None);
        }
        Ok(self
            .sorted_users()
            .into_iter()
            .find(|u| u.scim_external_id == external_id))
    }
}
