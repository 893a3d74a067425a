/// Session Manager
///
/// Registration, login, refresh-token rotation and logout. Every successful
/// login or registration mints an access/refresh pair; the refresh token is
/// recorded in the registry and handed to the transport for the cookie.

use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{
    PasswordHasher, RefreshTokenRegistry, TokenCodec, TokenKind, TokenPair, TokenSubject,
};
use crate::cache::UserCache;
use crate::domain::{NewUser, PublicUser, Role, User};
use crate::error::{AppError, AuthError, DatabaseError, ValidationError};
use crate::store::UserStore;
use crate::validators;

/// Registration payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub employee_id: String,
    pub phone_number: String,
    pub password: String,
}

impl Registration {
    /// Normalize and check every field, stopping at the first failure
    pub fn validate(self) -> Result<Registration, ValidationError> {
        let middle_name = match self.middle_name {
            Some(name) => Some(validators::validate_middle_name(&name)?).filter(|n| !n.is_empty()),
            None => None,
        };
        validators::validate_password_strength(&self.password)?;

        Ok(Registration {
            first_name: validators::validate_name("first name", &self.first_name)?,
            middle_name,
            last_name: validators::validate_name("last name", &self.last_name)?,
            email: validators::validate_email(&self.email)?,
            employee_id: validators::validate_employee_id(&self.employee_id)?,
            phone_number: validators::validate_phone_number(&self.phone_number)?,
            password: self.password,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub employee_id: String,
    pub password: String,
}

/// Result of a successful register or login
#[derive(Debug, Clone)]
pub struct Session {
    pub user: PublicUser,
    pub tokens: TokenPair,
}

/// Principal attached to a request once its bearer token checks out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Fail with `InsufficientPermissions` unless the principal holds one of
/// `allowed`.
pub fn authorize(principal: &AuthenticatedUser, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %principal.user_id,
            role = %principal.role,
            "Insufficient permissions"
        );
        Err(AuthError::InsufficientPermissions)
    }
}

pub struct SessionManager {
    store: Arc<dyn UserStore>,
    codec: Arc<TokenCodec>,
    registry: RefreshTokenRegistry,
    hasher: Arc<dyn PasswordHasher>,
    cache: UserCache,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn UserStore>,
        codec: Arc<TokenCodec>,
        hasher: Arc<dyn PasswordHasher>,
        cache: UserCache,
    ) -> Self {
        Self {
            registry: RefreshTokenRegistry::new(Arc::clone(&store)),
            store,
            codec,
            hasher,
            cache,
        }
    }

    /// Lifetime of refresh tokens in seconds, for the cookie's max-age
    pub fn refresh_token_lifetime(&self) -> i64 {
        self.codec.expiry_seconds(TokenKind::Refresh)
    }

    /// Create an account and open a first session
    ///
    /// # Errors
    /// `Conflict` if the employee id, email or phone number is taken, checked
    /// in that order.
    pub async fn register(&self, registration: Registration) -> Result<Session, AppError> {
        let registration = registration.validate()?;

        let (by_employee_id, by_email, by_phone_number) = tokio::try_join!(
            self.store.find_by_employee_id(&registration.employee_id),
            self.store.find_by_email(&registration.email),
            self.store.find_by_phone_number(&registration.phone_number),
        )?;

        let taken = if by_employee_id.is_some() {
            Some("employee ID")
        } else if by_email.is_some() {
            Some("email")
        } else if by_phone_number.is_some() {
            Some("phone number")
        } else {
            None
        };
        if let Some(field) = taken {
            return Err(AppError::Conflict(format!(
                "User with this {} already exists",
                field
            )));
        }

        let password_hash = self.hasher.hash(&registration.password).await?;

        let user = self
            .store
            .create(NewUser {
                first_name: registration.first_name,
                middle_name: registration.middle_name,
                last_name: registration.last_name,
                email: registration.email,
                employee_id: registration.employee_id,
                phone_number: registration.phone_number,
                password_hash,
                role: Role::User,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration
                DatabaseError::UniqueConstraintViolation(_) => {
                    AppError::Conflict("User already exists".to_string())
                }
                other => other.into(),
            })?;

        let session = self.start_session(&user).await?;
        self.cache.invalidate_listings();

        tracing::info!(user_id = %user.id, employee_id = %user.employee_id, "User registered");
        Ok(session)
    }

    pub async fn login(&self, credentials: Credentials) -> Result<Session, AppError> {
        validators::require("employee ID", &credentials.employee_id)?;
        validators::require("password", &credentials.password)?;

        let user = self
            .store
            .find_by_employee_id(credentials.employee_id.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self
            .hasher
            .verify(&credentials.password, &user.password_hash)
            .await?
        {
            tracing::warn!(user_id = %user.id, "Password mismatch on login");
            return Err(AuthError::InvalidCredentials.into());
        }

        if !user.is_active {
            return Err(AuthError::AccountInactive.into());
        }

        let session = self.start_session(&user).await?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(session)
    }

    /// Rotate: the presented token is consumed and a new pair issued
    pub async fn refresh(&self, presented: Option<&str>) -> Result<TokenPair, AppError> {
        let presented = presented
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::RefreshTokenMissing)?;

        let claims = self
            .codec
            .verify(TokenKind::Refresh, presented)
            .map_err(|_| AuthError::RefreshTokenInvalid)?;
        let user_id = claims
            .user_id()
            .map_err(|_| AuthError::RefreshTokenInvalid)?;

        if !self.registry.is_valid(user_id, presented).await? {
            tracing::warn!(user_id = %user_id, "Refresh token not honored");
            return Err(AuthError::RefreshTokenRevoked.into());
        }

        if !self.registry.remove(user_id, presented).await? {
            tracing::warn!(user_id = %user_id, "Refresh token consumed concurrently");
            return Err(AuthError::RefreshTokenRevoked.into());
        }

        // Deleted or deactivated between the check and the removal
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AuthError::RefreshTokenRevoked)?;

        let tokens = self.codec.issue_pair(&TokenSubject::from(&user))?;
        self.registry.add(user.id, &tokens.refresh_token).await?;

        tracing::debug!(user_id = %user.id, "Refresh token rotated");
        Ok(tokens)
    }

    /// End one session. A missing or unknown token is not an error.
    pub async fn logout(&self, user_id: Uuid, presented: Option<&str>) -> Result<(), AppError> {
        if let Some(token) = presented.filter(|token| !token.is_empty()) {
            self.registry.remove(user_id, token).await?;
        }
        tracing::info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    pub async fn logout_all(&self, user_id: Uuid) -> Result<(), AppError> {
        self.registry.remove_all(user_id).await?;
        tracing::info!(user_id = %user_id, "User logged out from all devices");
        Ok(())
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<PublicUser, AppError> {
        self.store
            .find_by_id(user_id)
            .await?
            .map(|user| user.to_public())
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Check a bearer access token against the store. The cache is never
    /// consulted, so deactivation takes effect on the next request.
    pub async fn authenticate(&self, access_token: &str) -> Result<AuthenticatedUser, AppError> {
        let claims = self
            .codec
            .verify(TokenKind::Access, access_token)
            .map_err(|_| AuthError::TokenInvalid)?;
        let user_id = claims.user_id().map_err(|_| AuthError::TokenInvalid)?;

        match self.store.find_by_id(user_id).await? {
            Some(user) if user.is_active => Ok(AuthenticatedUser {
                user_id: user.id,
                email: user.email,
                role: user.role,
            }),
            _ => Err(AuthError::UserInactive.into()),
        }
    }

    async fn start_session(&self, user: &User) -> Result<Session, AppError> {
        let tokens = self.codec.issue_pair(&TokenSubject::from(user))?;
        let logged_in_at = self.registry.add(user.id, &tokens.refresh_token).await?;

        let mut public = user.to_public();
        public.last_login = Some(logged_in_at);
        Ok(Session {
            user: public,
            tokens,
        })
    }
}
