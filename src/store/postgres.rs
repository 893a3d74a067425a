/// Postgres-backed user store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{StoreResult, UserStore};
use crate::domain::{NewUser, Pagination, Role, User, UserChanges, UserFilter};
use crate::error::DatabaseError;

const USER_COLUMNS: &str = "id, first_name, middle_name, last_name, email, employee_id, \
     phone_number, password_hash, role, is_active, refresh_tokens, last_login, \
     created_at, updated_at";

/// Raw `users` row; `role` is validated on the way out.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    middle_name: Option<String>,
    last_name: String,
    email: String,
    employee_id: String,
    phone_number: String,
    password_hash: String,
    role: String,
    is_active: bool,
    refresh_tokens: Vec<String>,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role).ok_or_else(|| {
            DatabaseError::UnexpectedError(format!("unknown role '{}' for user {}", row.role, row.id))
        })?;

        Ok(User {
            id: row.id,
            first_name: row.first_name,
            middle_name: row.middle_name,
            last_name: row.last_name,
            email: row.email,
            employee_id: row.employee_id,
            phone_number: row.phone_number,
            password_hash: row.password_hash,
            role,
            is_active: row.is_active,
            refresh_tokens: row.refresh_tokens,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_user(row: Option<UserRow>) -> StoreResult<Option<User>> {
    row.map(User::try_from).transpose()
}

/// Escape LIKE metacharacters and wrap in `%` for a substring match
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        into_user(row)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        into_user(row)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_employee_id(&self, employee_id: &str) -> StoreResult<Option<User>> {
        self.find_one("employee_id", employee_id).await
    }

    async fn find_by_phone_number(&self, phone_number: &str) -> StoreResult<Option<User>> {
        self.find_one("phone_number", phone_number).await
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let now = Utc::now();
        let sql = format!(
            r#"
            INSERT INTO users (id, first_name, middle_name, last_name, email, employee_id,
                               phone_number, password_hash, role, is_active, refresh_tokens,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, '{{}}', $10, $10)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.first_name)
            .bind(&user.middle_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.employee_id)
            .bind(&user.phone_number)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        User::try_from(row)
    }

    async fn update_fields(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                middle_name = CASE
                    WHEN $3::text IS NULL THEN middle_name
                    WHEN $3 = '' THEN NULL
                    ELSE $3
                END,
                last_name = COALESCE($4, last_name),
                email = COALESCE($5, email),
                password_hash = COALESCE($6, password_hash),
                is_active = COALESCE($7, is_active),
                updated_at = $8
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(changes.first_name)
            .bind(changes.middle_name)
            .bind(changes.last_name)
            .bind(changes.email)
            .bind(changes.password_hash)
            .bind(changes.is_active)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;
        into_user(row)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("DELETE FROM users WHERE id = $1 RETURNING {}", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        into_user(row)
    }

    async fn list(&self, filter: &UserFilter, pagination: Pagination) -> StoreResult<Vec<User>> {
        let sql = format!(
            r#"
            SELECT {} FROM users
            WHERE ($1::text IS NULL
                   OR first_name ILIKE $1 OR last_name ILIKE $1
                   OR email ILIKE $1 OR employee_id ILIKE $1)
              AND ($2::text IS NULL OR role = $2)
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#,
            USER_COLUMNS
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(filter.search.as_deref().map(like_pattern))
            .bind(filter.role.map(|r| r.as_str()))
            .bind(i64::from(pagination.limit))
            .bind(pagination.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn count(&self, filter: &UserFilter) -> StoreResult<u64> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::text IS NULL
                   OR first_name ILIKE $1 OR last_name ILIKE $1
                   OR email ILIKE $1 OR employee_id ILIKE $1)
              AND ($2::text IS NULL OR role = $2)
            "#,
        )
        .bind(filter.search.as_deref().map(like_pattern))
        .bind(filter.role.map(|r| r.as_str()))
        .fetch_one(&self.pool)
        .await?;

        Ok(total.max(0) as u64)
    }

    async fn push_refresh_token(
        &self,
        id: Uuid,
        digest: &str,
        last_login: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_tokens = array_append(array_remove(refresh_tokens, $2), $2),
                last_login = $3,
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(digest)
        .bind(last_login)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn pull_refresh_token(&self, id: Uuid, digest: &str) -> StoreResult<bool> {
        // The membership test in WHERE is re-checked after a concurrent writer
        // commits, so only one of two racing removals affects the row.
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_tokens = array_remove(refresh_tokens, $2)
            WHERE id = $1 AND $2 = ANY(refresh_tokens)
            "#,
        )
        .bind(id)
        .bind(digest)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear_refresh_tokens(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET refresh_tokens = '{}' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
