use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub password: PasswordSettings,
    /// Administrator created at startup when absent
    #[serde(default)]
    pub admin: Option<AdminSettings>,
}

impl Settings {
    /// Startup checks. Any failure here must stop the process.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.jwt.validate()?;
        self.cache.validate()?;
        self.password.validate()
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Marks the refresh-token cookie `Secure`; enable behind TLS.
    #[serde(default)]
    pub secure_cookies: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// JWT signing settings. Access and refresh tokens each get their own secret
/// and lifetime.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    #[serde(default)]
    pub access_secret: String,
    #[serde(default)]
    pub refresh_secret: String,
    pub access_token_expiry: i64,   // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_expiry: i64,  // seconds (e.g., 604800 for 7 days)
    pub issuer: String,
}

impl JwtSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.access_secret".to_string()));
        }
        if self.refresh_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.refresh_secret".to_string()));
        }
        // A shared secret would let a refresh token pass as an access token and vice versa.
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::InvalidValue(
                "jwt.access_secret and jwt.refresh_secret must differ".to_string(),
            ));
        }
        check_expiry("jwt.access_token_expiry", self.access_token_expiry)?;
        check_expiry("jwt.refresh_token_expiry", self.refresh_token_expiry)?;
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.issuer".to_string()));
        }
        Ok(())
    }
}

/// Longest accepted token lifetime, in seconds (one year)
pub const MAX_TOKEN_EXPIRY: i64 = 365 * 24 * 60 * 60;

fn check_expiry(key: &str, seconds: i64) -> Result<(), ConfigError> {
    if seconds <= 0 {
        return Err(ConfigError::InvalidValue(format!("{} must be positive", key)));
    }
    if seconds > MAX_TOKEN_EXPIRY {
        return Err(ConfigError::InvalidValue(format!(
            "{} must not exceed {} seconds",
            key, MAX_TOKEN_EXPIRY
        )));
    }
    Ok(())
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Redis,
    Memory,
}

#[derive(serde::Deserialize, Clone)]
pub struct CacheSettings {
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackendKind,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// TTL in seconds for paginated lists and counts
    #[serde(default = "default_user_list_ttl")]
    pub user_list_ttl: u64,
    /// TTL in seconds for single-user lookups
    #[serde(default = "default_single_user_ttl")]
    pub single_user_ttl: u64,
}

fn default_cache_backend() -> CacheBackendKind {
    CacheBackendKind::Redis
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_user_list_ttl() -> u64 {
    300
}

fn default_single_user_ttl() -> u64 {
    600
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            redis_url: default_redis_url(),
            user_list_ttl: default_user_list_ttl(),
            single_user_ttl: default_single_user_ttl(),
        }
    }
}

impl CacheSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_list_ttl == 0 || self.single_user_ttl == 0 {
            return Err(ConfigError::InvalidValue(
                "cache TTLs must be at least one second".to_string(),
            ));
        }
        if self.backend == CacheBackendKind::Redis && self.redis_url.trim().is_empty() {
            return Err(ConfigError::MissingRequired("cache.redis_url".to_string()));
        }
        Ok(())
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct PasswordSettings {
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

fn default_bcrypt_cost() -> u32 {
    10
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self {
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

impl PasswordSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // bcrypt accepts costs 4..=31
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "password.bcrypt_cost {} is outside 4..=31",
                self.bcrypt_cost
            )));
        }
        Ok(())
    }
}

/// Bootstrap administrator account, e.g. `APP_ADMIN__EMPLOYEE_ID`.
/// Field rules are the same as for registration.
#[derive(serde::Deserialize, Clone)]
pub struct AdminSettings {
    pub employee_id: String,
    pub email: String,
    pub phone_number: String,
    #[serde(default = "default_admin_first_name")]
    pub first_name: String,
    #[serde(default = "default_admin_last_name")]
    pub last_name: String,
    pub password: String,
}

fn default_admin_first_name() -> String {
    "Admin".to_string()
}

fn default_admin_last_name() -> String {
    "User".to_string()
}

/// Load settings from `configuration.{yaml,toml,json}` (optional) overlaid
/// with `APP_`-prefixed environment variables, e.g. `APP_JWT__ACCESS_SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    Ok(settings.try_deserialize::<Settings>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt() -> JwtSettings {
        JwtSettings {
            access_secret: "access-secret-at-least-32-characters-long".to_string(),
            refresh_secret: "refresh-secret-at-least-32-characters-long".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            issuer: "staff_auth".to_string(),
        }
    }

    #[test]
    fn test_valid_jwt_settings() {
        assert!(jwt().validate().is_ok());
    }

    #[test]
    fn test_missing_secret_rejected() {
        let mut settings = jwt();
        settings.refresh_secret = "  ".to_string();

        assert!(matches!(
            settings.validate(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_shared_secret_rejected() {
        let mut settings = jwt();
        settings.refresh_secret = settings.access_secret.clone();

        assert!(matches!(settings.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_non_positive_expiry_rejected() {
        let mut settings = jwt();
        settings.refresh_token_expiry = 0;

        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_oversized_expiry_rejected() {
        let mut settings = jwt();
        settings.access_token_expiry = i64::MAX;
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidValue(_))));

        let mut settings = jwt();
        settings.refresh_token_expiry = MAX_TOKEN_EXPIRY + 1;
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidValue(_))));

        let mut settings = jwt();
        settings.refresh_token_expiry = MAX_TOKEN_EXPIRY;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_bcrypt_cost_bounds() {
        assert!(PasswordSettings { bcrypt_cost: 3 }.validate().is_err());
        assert!(PasswordSettings { bcrypt_cost: 4 }.validate().is_ok());
        assert!(PasswordSettings { bcrypt_cost: 32 }.validate().is_err());
    }

    #[test]
    fn test_cache_defaults() {
        let cache = CacheSettings::default();

        assert_eq!(cache.user_list_ttl, 300);
        assert_eq!(cache.single_user_ttl, 600);
        assert!(cache.validate().is_ok());
    }
}
