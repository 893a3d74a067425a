/// JWT Claims structure
///
/// Represents the payload shared by access and refresh tokens: the user's
/// identity and role plus the standard JWT claims (RFC 7519).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Role, User};
use crate::error::TokenError;

/// Identity carried by every token, before timestamps are attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub email: String,
    pub phone_number: String,
    pub role: Role,
}

impl From<&User> for TokenSubject {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            role: user.role,
        }
    }
}

/// JWT Claims for access and refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// User email
    pub email: String,
    /// User phone number
    pub phone_number: String,
    /// User role
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Unique token id; keeps two tokens minted in the same second distinct
    pub jti: String,
}

impl Claims {
    /// Create new claims for `subject`, valid for `expiry_seconds` from `issued_at`
    pub fn new(subject: &TokenSubject, issued_at: i64, expiry_seconds: i64, issuer: &str) -> Self {
        Self {
            sub: subject.user_id.to_string(),
            email: subject.email.clone(),
            phone_number: subject.phone_number.clone(),
            role: subject.role,
            iat: issued_at,
            exp: issued_at + expiry_seconds,
            iss: issuer.to_string(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// Returns `Malformed` if the subject is not a valid UUID
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Malformed)
    }

    /// The identity part of the claims, without timestamps
    pub fn subject(&self) -> Result<TokenSubject, TokenError> {
        Ok(TokenSubject {
            user_id: self.user_id()?,
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            role: self.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            phone_number: "+15550000001".to_string(),
            role: Role::User,
        }
    }

    #[test]
    fn test_claims_creation() {
        let subject = subject();
        let claims = Claims::new(&subject, 1_000, 3600, "test");

        assert_eq!(claims.sub, subject.user_id.to_string());
        assert_eq!(claims.email, subject.email);
        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.exp, 4_600);
        assert_eq!(claims.iss, "test");
        assert_eq!(claims.subject().unwrap(), subject);
    }

    #[test]
    fn test_each_claims_gets_unique_id() {
        let subject = subject();
        let a = Claims::new(&subject, 1_000, 60, "test");
        let b = Claims::new(&subject, 1_000, 60, "test");

        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_invalid_user_id() {
        let mut claims = Claims::new(&subject(), 1_000, 3600, "test");
        claims.sub = "invalid-uuid".to_string();

        assert_eq!(claims.user_id(), Err(TokenError::Malformed));
    }
}
