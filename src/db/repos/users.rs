use async_trait::async_trait;

use crate::{
    db::error::DbResult,
    models::{NewUser, UpdateUser, User, UsersListOptions},
};

/// Persistence contract required by SCIM provisioning.
///
/// Implementations must make each create/update/delete atomic per record and
/// enforce username uniqueness, reporting collisions as `DbError::Conflict`.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// List users matching `opts`, ordered by id ascending.
    async fn list_users(&self, opts: UsersListOptions) -> DbResult<Vec<User>>;
    /// Count users matching `opts`. The window in `opts` is ignored.
    async fn count_users(&self, opts: UsersListOptions) -> DbResult<i64>;
    async fn create_user(&self, input: NewUser) -> DbResult<User>;
    async fn update_user(&self, id: i32, input: UpdateUser) -> DbResult<User>;
    async fn delete_user(&self, id: i32) -> DbResult<()>;
    async fn get_user_by_external_id(&self, external_id: &str) -> DbResult<Option<User>>;

    /// Fetch one user by id.
    async fn get_user_by_id(&self, id: i32) -> DbResult<Option<User>> {
        let opts = UsersListOptions {
            user_ids: Some(vec![id]),
            ..Default::default()
        };
        Ok(self.list_users(opts).await?.into_iter().next())
    }
}
