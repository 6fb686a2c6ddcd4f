/// Postgres store backends
///
/// Username and nickname uniqueness is enforced by UNIQUE constraints on the
/// `users` table; the revocation ledger is the `token_blacklist` table keyed
/// by `jti`. See `migrations/` for the schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{BlacklistEntry, CredentialStore, NewUser, RevocationLedger, User};
use crate::error::AppError;

type UserRow = (Uuid, String, String, String, bool, DateTime<Utc>);

fn into_user(row: UserRow) -> User {
    let (id, username, nickname, password_hash, is_active, created_at) = row;
    User {
        id,
        username,
        nickname,
        password_hash,
        is_active,
        created_at,
    }
}

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, username, nickname, password_hash, is_active, created_at)
            VALUES ($1, $2, $3, $4, true, $5)
            RETURNING id, username, nickname, password_hash, is_active, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.nickname)
        .bind(&new_user.password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(into_user(row))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, nickname, password_hash, is_active, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(into_user))
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn nickname_exists(&self, nickname: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE nickname = $1)",
        )
        .bind(nickname)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[derive(Clone)]
pub struct PgRevocationLedger {
    pool: PgPool,
}

impl PgRevocationLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationLedger for PgRevocationLedger {
    /// The insert is awaited to completion (autocommit) before returning,
    /// so a successful logout response implies a persisted revocation.
    async fn revoke(&self, entry: &BlacklistEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO token_blacklist (jti, user_id, expires_at, blacklisted_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(entry.jti)
        .bind(entry.user_id)
        .bind(entry.expires_at)
        .bind(entry.blacklisted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, AppError> {
        let revoked = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM token_blacklist WHERE jti = $1)",
        )
        .bind(jti)
        .fetch_one(&self.pool)
        .await?;

        Ok(revoked)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
