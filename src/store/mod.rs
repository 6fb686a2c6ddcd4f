/// Credential Store and Revocation Ledger
///
/// Both are traits so the auth service can be wired to Postgres in the binary
/// and to in-memory maps in tests. Implementations must be safe to share
/// across request workers.

mod memory;
mod postgres;

pub use memory::{InMemoryCredentialStore, InMemoryRevocationLedger};
pub use postgres::{PgCredentialStore, PgRevocationLedger};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{AppError, DatabaseError};

/// A stored user. `password_hash` never leaves the server.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub nickname: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Data needed to create a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub nickname: String,
    pub password_hash: String,
}

/// A revoked refresh token, indexed by its `jti`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlacklistEntry {
    pub jti: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub blacklisted_at: DateTime<Utc>,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts a user. Username and nickname uniqueness is enforced atomically;
    /// a collision returns `DatabaseError::UniqueConstraintViolation`.
    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn username_exists(&self, username: &str) -> Result<bool, AppError>;

    async fn nickname_exists(&self, nickname: &str) -> Result<bool, AppError>;

    async fn count(&self) -> Result<i64, AppError>;
}

#[async_trait]
pub trait RevocationLedger: Send + Sync {
    /// Durably records a revocation. Revoking an already-revoked `jti` succeeds.
    async fn revoke(&self, entry: &BlacklistEntry) -> Result<(), AppError>;

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, AppError>;

    /// Drops entries whose token expired before `now`. Returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

/// Runs a store call under a deadline; elapsing maps to a retryable
/// `DatabaseError::Timeout` naming the operation.
pub async fn bounded<T, F>(limit: Duration, operation: &str, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation = operation, timeout_ms = limit.as_millis() as u64, "Store call timed out");
            Err(AppError::Database(DatabaseError::Timeout(operation.to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_through_result() {
        let value = bounded(Duration::from_millis(100), "fast", async { Ok::<_, AppError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result = bounded(Duration::from_millis(10), "slow", async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, AppError>(())
        })
        .await;

        match result {
            Err(AppError::Database(DatabaseError::Timeout(op))) => assert_eq!(op, "slow"),
            other => panic!("Expected timeout, got {:?}", other),
        }
    }
}
