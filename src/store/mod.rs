/// User store
///
/// The persistent user store is an external collaborator reached through the
/// `UserStore` trait. Refresh-token mutations are single atomic operations on
/// one record so that concurrent rotations of the same token cannot both
/// observe it present.

mod memory;
mod postgres;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{NewUser, Pagination, User, UserChanges, UserFilter};
use crate::error::DatabaseError;

pub type StoreResult<T> = Result<T, DatabaseError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_by_employee_id(&self, employee_id: &str) -> StoreResult<Option<User>>;

    async fn find_by_phone_number(&self, phone_number: &str) -> StoreResult<Option<User>>;

    /// Fails with `UniqueConstraintViolation` if email, employee id or phone
    /// number is already taken.
    async fn create(&self, user: NewUser) -> StoreResult<User>;

    /// Returns the updated record, or `None` if the user does not exist.
    async fn update_fields(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>>;

    /// Returns the deleted record, or `None` if the user did not exist.
    async fn delete(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Newest first.
    async fn list(&self, filter: &UserFilter, pagination: Pagination) -> StoreResult<Vec<User>>;

    async fn count(&self, filter: &UserFilter) -> StoreResult<u64>;

    /// Append a refresh-token digest (no duplicates) and stamp `last_login`.
    /// Returns `false` if the user does not exist.
    async fn push_refresh_token(
        &self,
        id: Uuid,
        digest: &str,
        last_login: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Remove an exact digest. Returns `true` only if this call removed it.
    async fn pull_refresh_token(&self, id: Uuid, digest: &str) -> StoreResult<bool>;

    /// Returns `false` if the user does not exist.
    async fn clear_refresh_tokens(&self, id: Uuid) -> StoreResult<bool>;
}
