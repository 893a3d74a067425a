/// JWT Token Codec
///
/// Signs and verifies the two token kinds. Access and refresh tokens use
/// independent secrets and lifetimes, checked once at construction.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{Claims, TokenSubject};
use crate::configuration::JwtSettings;
use crate::error::{AppError, ConfigError, TokenError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Freshly minted access + refresh tokens with identical payloads
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_seconds: i64,
}

impl SigningKeys {
    fn new(secret: &str, expiry_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }
}

pub struct TokenCodec {
    access: SigningKeys,
    refresh: SigningKeys,
    issuer: String,
    validation: Validation,
}

impl TokenCodec {
    /// # Errors
    /// `ConfigError` if a secret is unset, both secrets are equal, or an
    /// expiry is not positive or exceeds `MAX_TOKEN_EXPIRY`.
    pub fn new(config: &JwtSettings) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut validation = Validation::new(Algorithm::HS256);
        // Verify issuer matches configuration
        validation.set_issuer(&[&config.issuer]);
        validation.leeway = 0;

        Ok(Self {
            access: SigningKeys::new(&config.access_secret, config.access_token_expiry),
            refresh: SigningKeys::new(&config.refresh_secret, config.refresh_token_expiry),
            issuer: config.issuer.clone(),
            validation,
        })
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Lifetime of `kind` tokens in seconds
    pub fn expiry_seconds(&self, kind: TokenKind) -> i64 {
        self.keys(kind).expiry_seconds
    }

    /// Sign a new `kind` token for `subject`, issued now
    pub fn issue(&self, kind: TokenKind, subject: &TokenSubject) -> Result<String, AppError> {
        self.issue_at(kind, subject, Utc::now().timestamp())
    }

    pub(crate) fn issue_at(
        &self,
        kind: TokenKind,
        subject: &TokenSubject,
        issued_at: i64,
    ) -> Result<String, AppError> {
        let keys = self.keys(kind);
        let claims = Claims::new(subject, issued_at, keys.expiry_seconds, &self.issuer);

        encode(&Header::default(), &claims, &keys.encoding)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    pub fn issue_pair(&self, subject: &TokenSubject) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue(TokenKind::Access, subject)?,
            refresh_token: self.issue(TokenKind::Refresh, subject)?,
        })
    }

    /// Validate a `kind` token and return its claims
    ///
    /// # Errors
    /// - `InvalidSignature` if signed with another key (including the other
    ///   kind's secret) or by another issuer
    /// - `Expired` once the embedded expiry has passed
    /// - `Malformed` if the token cannot be decoded
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.keys(kind).decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let error = match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::InvalidSignature
                    | ErrorKind::InvalidIssuer
                    | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
                    _ => TokenError::Malformed,
                };
                tracing::debug!(kind = ?kind, error = %e, "JWT validation error");
                error
            })
    }
}
