/// Authentication module
///
/// Handles JWT token issuing/verification, password hashing,
/// and the refresh-token registry.

mod claims;
mod jwt;
mod password;
mod refresh_token;

pub use claims::{Claims, TokenSubject};
pub use jwt::{TokenCodec, TokenKind, TokenPair};
pub use password::{validate_password_strength, BcryptHasher, PasswordHasher};
pub use refresh_token::{hash_token, RefreshTokenRegistry};
