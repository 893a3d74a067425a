/// User identity record and the views derived from it.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    /// Exact, case-sensitive match against the stored representation.
    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "USER" => Some(Role::User),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full user record as held by the store.
///
/// `password_hash` and `refresh_tokens` never leave the crate through
/// `PublicUser`. `refresh_tokens` holds token digests, not raw tokens.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub employee_id: String,
    pub phone_number: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub refresh_tokens: Vec<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            first_name: self.first_name.clone(),
            middle_name: self.middle_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            employee_id: self.employee_id.clone(),
            phone_number: self.phone_number.clone(),
            role: self.role,
            is_active: self.is_active,
            last_login: self.last_login,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn holds_refresh_token(&self, digest: &str) -> bool {
        self.refresh_tokens.iter().any(|t| t == digest)
    }
}

/// User as shown to clients and stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub employee_id: String,
    pub phone_number: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated registration data, password already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub employee_id: String,
    pub phone_number: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial update. `None` leaves a field untouched; `middle_name: Some("")`
/// clears the middle name.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.middle_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.is_active.is_none()
    }

    /// Apply to an in-memory record, stamping `updated_at`.
    pub fn apply(self, user: &mut User, now: DateTime<Utc>) {
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(middle_name) = self.middle_name {
            user.middle_name = if middle_name.is_empty() {
                None
            } else {
                Some(middle_name)
            };
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(password_hash) = self.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
        user.updated_at = now;
    }
}

/// Filter shared by the list and count queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub search: Option<String>,
    pub role: Option<Role>,
}

impl UserFilter {
    /// Case-insensitive substring match on first name, last name, email and
    /// employee id, plus exact role match.
    pub fn matches(&self, user: &User) -> bool {
        if let Some(role) = self.role {
            if user.role != role {
                return false;
            }
        }
        match &self.search {
            None => true,
            Some(search) => {
                let needle = search.to_lowercase();
                [
                    &user.first_name,
                    &user.last_name,
                    &user.email,
                    &user.employee_id,
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        total.div_ceil(u64::from(self.limit))
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_user(employee_id: &str) -> User {
    let now = Utc::now();
    let id = Uuid::new_v4();
    User {
        id,
        first_name: "Ada".to_string(),
        middle_name: None,
        last_name: "Lovelace".to_string(),
        email: format!("{}@example.com", employee_id.to_lowercase()),
        employee_id: employee_id.to_string(),
        phone_number: format!("+1{:010}", id.as_u128() % 10_000_000_000),
        password_hash: "$2b$04$hash".to_string(),
        role: Role::User,
        is_active: true,
        refresh_tokens: Vec::new(),
        last_login: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::User.to_string(), "USER");
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "ADMIN");
    }

    #[test]
    fn test_public_view_hides_secrets() {
        let mut user = sample_user("E100");
        user.refresh_tokens.push("digest".to_string());

        let json = serde_json::to_value(user.to_public()).unwrap();

        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refreshTokens").is_none());
        assert_eq!(json["employeeId"], "E100");
    }

    #[test]
    fn test_apply_changes_clears_middle_name() {
        let mut user = sample_user("E100");
        user.middle_name = Some("Byron".to_string());

        UserChanges {
            middle_name: Some(String::new()),
            first_name: Some("Augusta".to_string()),
            ..Default::default()
        }
        .apply(&mut user, Utc::now());

        assert_eq!(user.middle_name, None);
        assert_eq!(user.first_name, "Augusta");
    }

    #[test]
    fn test_filter_matches() {
        let mut user = sample_user("E100");
        user.role = Role::Admin;

        assert!(UserFilter::default().matches(&user));
        assert!(UserFilter {
            search: Some("LOVE".to_string()),
            role: None
        }
        .matches(&user));
        assert!(UserFilter {
            search: Some("e10".to_string()),
            role: Some(Role::Admin)
        }
        .matches(&user));
        assert!(!UserFilter {
            search: None,
            role: Some(Role::User)
        }
        .matches(&user));
        assert!(!UserFilter {
            search: Some("zzz".to_string()),
            role: None
        }
        .matches(&user));
    }

    #[test]
    fn test_pagination() {
        let page = Pagination { page: 3, limit: 10 };

        assert_eq!(page.offset(), 20);
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(21), 3);
        assert_eq!(page.total_pages(30), 3);
    }
}
