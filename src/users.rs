/// User directory: cached reads and the writes that invalidate them

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::PasswordHasher;
use crate::cache::{keys, UserCache};
use crate::configuration::AdminSettings;
use crate::domain::{NewUser, Pagination, PublicUser, Role, UserChanges, UserFilter};
use crate::error::{AppError, DatabaseError, ValidationError};
use crate::session::Registration;
use crate::store::UserStore;
use crate::validators;

/// Partial profile update; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(self) -> Result<UserChanges, ValidationError> {
        Ok(UserChanges {
            first_name: self
                .first_name
                .map(|name| validators::validate_name("first name", &name))
                .transpose()?,
            middle_name: self
                .middle_name
                .map(|name| validators::validate_middle_name(&name))
                .transpose()?,
            last_name: self
                .last_name
                .map(|name| validators::validate_name("last name", &name))
                .transpose()?,
            email: self
                .email
                .map(|email| validators::validate_email(&email))
                .transpose()?,
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

/// Raw list/count query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub role: Option<String>,
}

impl ListQuery {
    /// Page defaults to 1 and limit to 10; limit is capped at 100.
    pub fn pagination(&self) -> Result<Pagination, AppError> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(i64::from(Pagination::DEFAULT_LIMIT));

        if page < 1 {
            return Err(AppError::BadRequest("page must be at least 1".to_string()));
        }
        if limit < 1 {
            return Err(AppError::BadRequest("limit must be at least 1".to_string()));
        }

        Ok(Pagination {
            page: u32::try_from(page)
                .map_err(|_| AppError::BadRequest("page is out of range".to_string()))?,
            limit: limit.min(i64::from(Pagination::MAX_LIMIT)) as u32,
        })
    }

    /// Blank searches and unrecognized roles do not filter.
    pub fn filter(&self) -> UserFilter {
        UserFilter {
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            role: self.role.as_deref().and_then(Role::parse),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPage {
    pub users: Vec<PublicUser>,
    pub pagination: PageInfo,
}

/// What `UserService::ensure_admin` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminBootstrap {
    Created,
    AlreadyPresent,
}

pub struct UserService {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    cache: UserCache,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, hasher: Arc<dyn PasswordHasher>, cache: UserCache) -> Self {
        Self {
            store,
            hasher,
            cache,
        }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<PublicUser, AppError> {
        let store = &self.store;
        self.cache
            .read_through(&keys::single_user(user_id), self.cache.single_ttl(), || async move {
                store
                    .find_by_id(user_id)
                    .await?
                    .map(|user| user.to_public())
                    .ok_or_else(|| AppError::NotFound("User not found".to_string()))
            })
            .await
    }

    pub async fn list_users(&self, query: &ListQuery) -> Result<UserPage, AppError> {
        let pagination = query.pagination()?;
        let filter = query.filter();
        let store = &self.store;
        let list_filter = &filter;
        let list_key = keys::user_list(pagination, &filter);

        let (users, total) = tokio::try_join!(
            self.cache.read_through(
                &list_key,
                self.cache.list_ttl(),
                || async move {
                    let users = store.list(list_filter, pagination).await?;
                    Ok::<_, AppError>(users.iter().map(|user| user.to_public()).collect::<Vec<_>>())
                },
            ),
            self.count_filtered(&filter),
        )?;

        Ok(UserPage {
            users,
            pagination: PageInfo {
                page: pagination.page,
                limit: pagination.limit,
                total,
                pages: pagination.total_pages(total),
            },
        })
    }

    pub async fn count_users(&self, query: &ListQuery) -> Result<u64, AppError> {
        self.count_filtered(&query.filter()).await
    }

    async fn count_filtered(&self, filter: &UserFilter) -> Result<u64, AppError> {
        let store = &self.store;
        self.cache
            .read_through(&keys::user_count(filter), self.cache.list_ttl(), || async move {
                Ok::<_, AppError>(store.count(filter).await?)
            })
            .await
    }

    /// # Errors
    /// `Conflict` if the new email belongs to another user, `NotFound` if the
    /// user is gone.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<PublicUser, AppError> {
        let changes = update.validate()?;

        if changes.is_empty() {
            return self
                .store
                .find_by_id(user_id)
                .await?
                .map(|user| user.to_public())
                .ok_or_else(|| AppError::NotFound("User not found".to_string()));
        }

        if let Some(email) = &changes.email {
            if let Some(owner) = self.store.find_by_email(email).await? {
                if owner.id != user_id {
                    return Err(AppError::Conflict(
                        "User with this email already exists".to_string(),
                    ));
                }
            }
        }

        let user = self
            .store
            .update_fields(user_id, changes)
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueConstraintViolation(_) => {
                    AppError::Conflict("User with this email already exists".to_string())
                }
                other => other.into(),
            })?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        self.cache.invalidate_user(user_id).await;
        tracing::info!(user_id = %user_id, "Profile updated");
        Ok(user.to_public())
    }

    pub async fn deactivate(&self, user_id: Uuid) -> Result<(), AppError> {
        let changes = UserChanges {
            is_active: Some(false),
            ..Default::default()
        };
        self.store
            .update_fields(user_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        self.cache.invalidate_user(user_id).await;
        tracing::info!(user_id = %user_id, "User deactivated");
        Ok(())
    }

    pub async fn delete(&self, user_id: Uuid) -> Result<(), AppError> {
        self.store
            .delete(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        self.cache.invalidate_user(user_id).await;
        tracing::info!(user_id = %user_id, "User deleted");
        Ok(())
    }

    /// Password changes are invisible in listings, so only the single-user
    /// entry is dropped.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        change: PasswordChange,
    ) -> Result<(), AppError> {
        validators::require("old password", &change.old_password)?;
        validators::validate_password_strength(&change.new_password)?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !self
            .hasher
            .verify(&change.old_password, &user.password_hash)
            .await?
        {
            return Err(AppError::BadRequest("Old password does not match".to_string()));
        }

        let password_hash = self.hasher.hash(&change.new_password).await?;
        self.store
            .update_fields(
                user_id,
                UserChanges {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        self.cache.invalidate_single(user_id).await;
        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Create the configured administrator unless that employee ID already
    /// exists. An existing account is left exactly as it is.
    ///
    /// # Errors
    /// `Validation` if a configured field is invalid, `Conflict` if the email
    /// or phone number belongs to another account.
    pub async fn ensure_admin(&self, admin: &AdminSettings) -> Result<AdminBootstrap, AppError> {
        let admin = Registration {
            first_name: admin.first_name.clone(),
            middle_name: None,
            last_name: admin.last_name.clone(),
            email: admin.email.clone(),
            employee_id: admin.employee_id.clone(),
            phone_number: admin.phone_number.clone(),
            password: admin.password.clone(),
        }
        .validate()?;

        if let Some(existing) = self.store.find_by_employee_id(&admin.employee_id).await? {
            if existing.role != Role::Admin {
                tracing::warn!(
                    user_id = %existing.id,
                    role = %existing.role,
                    "Configured administrator exists without the ADMIN role"
                );
            }
            return Ok(AdminBootstrap::AlreadyPresent);
        }

        let (by_email, by_phone_number) = tokio::try_join!(
            self.store.find_by_email(&admin.email),
            self.store.find_by_phone_number(&admin.phone_number),
        )?;
        if by_email.is_some() {
            return Err(AppError::Conflict("User with this email already exists".to_string()));
        }
        if by_phone_number.is_some() {
            return Err(AppError::Conflict(
                "User with this phone number already exists".to_string(),
            ));
        }

        let password_hash = self.hasher.hash(&admin.password).await?;
        let user = self
            .store
            .create(NewUser {
                first_name: admin.first_name,
                middle_name: None,
                last_name: admin.last_name,
                email: admin.email,
                employee_id: admin.employee_id,
                phone_number: admin.phone_number,
                password_hash,
                role: Role::Admin,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueConstraintViolation(_) => {
                    AppError::Conflict("User already exists".to_string())
                }
                other => other.into(),
            })?;

        self.cache.invalidate_listings();
        tracing::info!(user_id = %user.id, employee_id = %user.employee_id, "Administrator created");
        Ok(AdminBootstrap::Created)
    }
}
