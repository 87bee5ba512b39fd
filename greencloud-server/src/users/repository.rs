use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use greencloud_model::{NewUser, Role, User};
#[cfg(test)]
use mockall::automock;
use sqlx::{FromRow, PgPool};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("email already used")]
    DuplicateEmail,
    #[error("corrupt user row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Lookups ignore soft-deleted users, but a soft-deleted user still owns
/// their email address.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn exists_by_email(&self, email: &str)
    -> Result<bool, RepositoryError>;

    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, RepositoryError>;

    async fn find_by_id(&self, id: i64)
    -> Result<Option<User>, RepositoryError>;

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn record_login(&self, id: i64) -> Result<(), RepositoryError>;

    async fn ping(&self) -> Result<(), RepositoryError>;
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    email_confirm: String,
    password_hash: String,
    role: i16,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    last_login: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_ordinal(row.role).map_err(|err| {
            RepositoryError::CorruptRow {
                id: row.id,
                reason: err.to_string(),
            }
        })?;

        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            email_confirmed: row.email_confirm.trim() == "Y",
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
            last_login: row.last_login,
        })
    }
}

const USER_COLUMNS: &str = "id, username, email, email_confirm, \
     password_hash, role, created_at, updated_at, deleted_at, last_login";

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl fmt::Debug for PostgresUserRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresUserRepository")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn exists_by_email(
        &self,
        email: &str,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE email = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_id(
        &self,
        id: i64,
    ) -> Result<Option<User>, RepositoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, role) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.ordinal())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| match &err {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    RepositoryError::DuplicateEmail
                }
                _ => RepositoryError::Database(err),
            })?;
        User::try_from(row)
    }

    async fn record_login(&self, id: i64) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE users SET last_login = now(), updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
