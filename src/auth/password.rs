/// Password Hashing and Verification
///
/// Handles password hashing with bcrypt and password strength validation.
/// Bcrypt is CPU-bound, so both directions run on the blocking pool.

use async_trait::async_trait;

use crate::error::{AppError, ValidationError};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, password: &str) -> Result<String, AppError>;

    /// `Ok(false)` on mismatch; `Err` only if the stored hash is unusable
    async fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError>;
}

/// Bcrypt with a configurable work factor
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[async_trait]
impl PasswordHasher for BcryptHasher {
    async fn hash(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_owned();
        let cost = self.cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let password = password.to_owned();
        let hash = hash.to_owned();

        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }
}

/// Validate password strength requirements
///
/// Requirements:
/// - Minimum 8 characters
/// - Maximum 128 characters
/// - At least one digit
/// - At least one lowercase letter
/// - At least one uppercase letter
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        ));
    }

    // bcrypt limitation and DoS prevention
    if length > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        ));
    }

    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(ValidationError::WeakPassword);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> BcryptHasher {
        BcryptHasher::new(4)
    }

    #[tokio::test]
    async fn test_hash_password() {
        let password = "ValidPassword123";
        let hash = hasher().hash(password).await.expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(hash.starts_with("$2"));
    }

    #[tokio::test]
    async fn test_verify_password() {
        let hash = hasher().hash("ValidPassword123").await.unwrap();

        assert!(hasher().verify("ValidPassword123", &hash).await.unwrap());
        assert!(!hasher().verify("WrongPassword123", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_password_hashes_differently() {
        let a = hasher().hash("ValidPassword123").await.unwrap();
        let b = hasher().hash("ValidPassword123").await.unwrap();

        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_unusable_hash_is_an_error() {
        assert!(hasher().verify("ValidPassword123", "not-a-hash").await.is_err());
    }

    #[test]
    fn test_too_short_password() {
        assert_eq!(
            validate_password_strength("Short1"),
            Err(ValidationError::TooShort("password".to_string(), MIN_PASSWORD_LENGTH))
        );
    }

    #[test]
    fn test_too_long_password() {
        let long_password = "a".repeat(MAX_PASSWORD_LENGTH) + "A1";
        assert!(matches!(
            validate_password_strength(&long_password),
            Err(ValidationError::TooLong(_, _))
        ));
    }

    #[test]
    fn test_missing_character_classes() {
        for weak in ["NoDigitsPassword", "NOLOWERCASE1", "nouppercase1"] {
            assert_eq!(
                validate_password_strength(weak),
                Err(ValidationError::WeakPassword),
                "{} should be rejected",
                weak
            );
        }
    }

    #[test]
    fn test_valid_password() {
        assert!(validate_password_strength("Secret123").is_ok());
        assert!(validate_password_strength("ValidPassword123").is_ok());
    }
}
