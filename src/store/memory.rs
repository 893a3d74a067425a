/// In-memory user store used by tests and single-process runs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::{StoreResult, UserStore};
use crate::domain::{NewUser, Pagination, User, UserChanges, UserFilter};
use crate::error::DatabaseError;

/// `DashMap`-backed store. Each record mutation happens under the entry's
/// shard lock, which gives the per-record atomicity the registry relies on.
#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<DashMap<Uuid, User>>,
    /// Serializes writes that touch unique columns
    unique_guard: Arc<Mutex<()>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_unique(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.unique_guard
            .lock()
            .map_err(|_| DatabaseError::UnexpectedError("user store lock poisoned".to_string()))
    }

    fn find_where(&self, predicate: impl Fn(&User) -> bool) -> Option<User> {
        self.users
            .iter()
            .find(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.find_where(|u| u.email == email))
    }

    async fn find_by_employee_id(&self, employee_id: &str) -> StoreResult<Option<User>> {
        Ok(self.find_where(|u| u.employee_id == employee_id))
    }

    async fn find_by_phone_number(&self, phone_number: &str) -> StoreResult<Option<User>> {
        Ok(self.find_where(|u| u.phone_number == phone_number))
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let _guard = self.lock_unique()?;

        let clash = self.find_where(|u| {
            u.email == user.email
                || u.employee_id == user.employee_id
                || u.phone_number == user.phone_number
        });
        if clash.is_some() {
            return Err(DatabaseError::UniqueConstraintViolation(
                "User already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            middle_name: user.middle_name,
            last_name: user.last_name,
            email: user.email,
            employee_id: user.employee_id,
            phone_number: user.phone_number,
            password_hash: user.password_hash,
            role: user.role,
            is_active: true,
            refresh_tokens: Vec::new(),
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_fields(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>> {
        let _guard = self.lock_unique()?;

        if let Some(email) = &changes.email {
            if self.find_where(|u| u.id != id && &u.email == email).is_some() {
                return Err(DatabaseError::UniqueConstraintViolation(
                    "User with this email already exists".to_string(),
                ));
            }
        }

        Ok(self.users.get_mut(&id).map(|mut entry| {
            changes.apply(entry.value_mut(), Utc::now());
            entry.value().clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.remove(&id).map(|(_, user)| user))
    }

    async fn list(&self, filter: &UserFilter, pagination: Pagination) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        Ok(users
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit as usize)
            .collect())
    }

    async fn count(&self, filter: &UserFilter) -> StoreResult<u64> {
        Ok(self
            .users
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .count() as u64)
    }

    async fn push_refresh_token(
        &self,
        id: Uuid,
        digest: &str,
        last_login: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(match self.users.get_mut(&id) {
            Some(mut entry) => {
                let user = entry.value_mut();
                if !user.holds_refresh_token(digest) {
                    user.refresh_tokens.push(digest.to_string());
                }
                user.last_login = Some(last_login);
                user.updated_at = last_login;
                true
            }
            None => false,
        })
    }

    async fn pull_refresh_token(&self, id: Uuid, digest: &str) -> StoreResult<bool> {
        Ok(match self.users.get_mut(&id) {
            Some(mut entry) => {
                let tokens = &mut entry.value_mut().refresh_tokens;
                let before = tokens.len();
                tokens.retain(|t| t != digest);
                tokens.len() != before
            }
            None => false,
        })
    }

    async fn clear_refresh_tokens(&self, id: Uuid) -> StoreResult<bool> {
        Ok(match self.users.get_mut(&id) {
            Some(mut entry) => {
                entry.value_mut().refresh_tokens.clear();
                true
            }
            None => false,
        })
    }
}
