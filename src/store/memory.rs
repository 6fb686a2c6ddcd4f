/// In-memory store backends
///
/// Used by tests and local runs without Postgres. A single lock guards both
/// uniqueness indexes so check-and-insert is atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::{BlacklistEntry, CredentialStore, NewUser, RevocationLedger, User};
use crate::error::{AppError, DatabaseError};

#[derive(Default)]
struct Users {
    by_username: HashMap<String, User>,
    nickname_owner: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    users: Arc<Mutex<Users>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Users>, AppError> {
        self.users
            .lock()
            .map_err(|_| AppError::Internal("credential store lock poisoned".to_string()))
    }

    /// Flips `is_active` for an existing user. Returns false when the user is unknown.
    pub fn set_active(&self, username: &str, active: bool) -> Result<bool, AppError> {
        let mut users = self.lock()?;
        Ok(match users.by_username.get_mut(username) {
            Some(user) => {
                user.is_active = active;
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut users = self.lock()?;

        if users.by_username.contains_key(&new_user.username) {
            return Err(DatabaseError::UniqueConstraintViolation("users_username_key".to_string()).into());
        }
        if users.nickname_owner.contains_key(&new_user.nickname) {
            return Err(DatabaseError::UniqueConstraintViolation("users_nickname_key".to_string()).into());
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            nickname: new_user.nickname,
            password_hash: new_user.password_hash,
            is_active: true,
            created_at: Utc::now(),
        };
        users
            .nickname_owner
            .insert(user.nickname.clone(), user.username.clone());
        users.by_username.insert(user.username.clone(), user.clone());

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.lock()?.by_username.get(username).cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        Ok(self.lock()?.by_username.contains_key(username))
    }

    async fn nickname_exists(&self, nickname: &str) -> Result<bool, AppError> {
        Ok(self.lock()?.nickname_owner.contains_key(nickname))
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.lock()?.by_username.len() as i64)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryRevocationLedger {
    entries: Arc<Mutex<HashMap<Uuid, BlacklistEntry>>>,
}

impl InMemoryRevocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, BlacklistEntry>>, AppError> {
        self.entries
            .lock()
            .map_err(|_| AppError::Internal("revocation ledger lock poisoned".to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RevocationLedger for InMemoryRevocationLedger {
    async fn revoke(&self, entry: &BlacklistEntry) -> Result<(), AppError> {
        self.lock()?.entry(entry.jti).or_insert_with(|| entry.clone());
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, AppError> {
        Ok(self.lock()?.contains_key(&jti))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at >= now);
        Ok((before - entries.len()) as u64)
    }
}
