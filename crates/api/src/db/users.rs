//! User repository for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use authentic_core::{Email, UserId, UserRole};

use super::{RepositoryError, UserRepository};
use crate::models::{NewUser, User, UserAddress};

const USER_COLUMNS: &str = "id, name, email, image, google_id, role, phone, address, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: String,
    image: Option<String>,
    google_id: Option<String>,
    role: UserRole,
    phone: Option<String>,
    address: Option<Json<UserAddress>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            image: row.image,
            google_id: row.google_id,
            role: row.role,
            phone: row.phone,
            address: row.address.map(|Json(address)| address),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres-backed [`UserRepository`].
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(
        &self,
        clause: &str,
        value: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn get_many(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().map(UserId::as_uuid).collect();
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_by("lower(email) = lower($1)", email.as_str())
            .await
    }

    async fn get_by_google_id(&self, google_id: &str) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_by("google_id = $1", google_id).await
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE lower(email) = lower($1)"
        );
        let Some(row) = sqlx::query_as::<_, UserWithHashRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        Ok(Some((User::try_from(row.user)?, row.password_hash)))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let (user, password_hash) = new_user.into_user(Utc::now());
        let sql = format!(
            r"
            INSERT INTO users (id, name, email, password_hash, google_id, image, role, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {USER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&password_hash)
            .bind(&user.google_id)
            .bind(&user.image)
            .bind(user.role)
            .bind(&user.phone)
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "user"))?;

        User::try_from(row)
    }

    async fn link_google(
        &self,
        id: UserId,
        google_id: &str,
        image: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            r"
            UPDATE users
            SET google_id = $2, image = COALESCE($3, image), updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(google_id)
            .bind(image)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "google account link"))?
            .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }

    async fn set_role(
        &self,
        email: &Email,
        role: UserRole,
    ) -> Result<Option<User>, RepositoryError> {
        let sql = format!(
            r"
            UPDATE users SET role = $2, updated_at = now()
            WHERE lower(email) = lower($1)
            RETURNING {USER_COLUMNS}
            "
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.as_str())
            .bind(role)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn list_by_role(&self, role: UserRole) -> Result<Vec<User>, RepositoryError> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY created_at ASC");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(role)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn delete_by_role(&self, role: UserRole) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE role = $1")
            .bind(role)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_by_role(&self, role: UserRole) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
