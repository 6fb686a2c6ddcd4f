/// Auth service: signup, login, logout, refresh.
///
/// Every expected failure comes back as an `AppError`; nothing here panics
/// or leaks store detail to the client.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::claims::{Claims, TokenKind};
use crate::auth::jwt::{TokenDecoder, TokenIssuer, TokenPair};
use crate::auth::password::PasswordHasher;
use crate::auth::verifier::TokenVerifier;
use crate::configuration::JwtSettings;
use crate::error::{
    AppError, AuthError, ConflictError, DatabaseError, LogoutFailure, OperationError,
};
use crate::store::{bounded, BlacklistEntry, CredentialStore, NewUser, RevocationLedger};
use crate::validators::{validate_login, validate_signup};

/// Public view of a freshly created user
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SignupResponse {
    pub username: String,
    pub nickname: String,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    store_timeout: Duration,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        ledger: Arc<dyn RevocationLedger>,
        hasher: PasswordHasher,
        jwt: &JwtSettings,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            hasher,
            issuer: TokenIssuer::new(jwt),
            verifier: TokenVerifier::new(TokenDecoder::new(jwt), ledger, store_timeout),
            store_timeout,
        }
    }

    /// Decoder used by the bearer middleware on protected routes
    pub fn decoder(&self) -> TokenDecoder {
        self.verifier.decoder().clone()
    }

    pub fn ledger(&self) -> Arc<dyn RevocationLedger> {
        self.verifier.ledger().clone()
    }

    pub async fn signup(
        &self,
        username: &str,
        password: &str,
        nickname: &str,
    ) -> Result<SignupResponse, AppError> {
        // Surrounding whitespace is dropped from names; passwords are taken verbatim.
        let (username, nickname) = (username.trim(), nickname.trim());
        validate_signup(username, password, nickname).map_err(AppError::Validation)?;

        // Fast path only; the store's unique constraints decide races.
        if bounded(self.store_timeout, "username_exists", self.store.username_exists(username)).await?
            || bounded(self.store_timeout, "nickname_exists", self.store.nickname_exists(nickname)).await?
        {
            return Err(ConflictError::UserAlreadyExists.into());
        }

        let password_hash = self.hasher.hash(password).await?;
        let new_user = NewUser {
            username: username.to_string(),
            nickname: nickname.to_string(),
            password_hash,
        };

        let user = match bounded(self.store_timeout, "create_user", self.store.create_user(new_user)).await {
            Ok(user) => user,
            Err(AppError::Database(DatabaseError::UniqueConstraintViolation(constraint))) => {
                tracing::info!(constraint = %constraint, "Concurrent duplicate signup");
                return Err(ConflictError::UserAlreadyExists.into());
            }
            Err(e) => return Err(e),
        };

        tracing::info!(user_id = %user.id, username = %user.username, "User signed up");

        Ok(SignupResponse {
            username: user.username,
            nickname: user.nickname,
        })
    }

    /// Unknown users and wrong passwords fail identically, and both pay for
    /// one bcrypt run, so the response reveals nothing about which it was.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AppError> {
        let username = username.trim();
        validate_login(username, password).map_err(AppError::Validation)?;

        let user = bounded(self.store_timeout, "find_by_username", self.store.find_by_username(username)).await?;

        let user = match user {
            Some(user) => {
                let password_ok = self.hasher.verify(password, &user.password_hash).await?;
                if !password_ok || !user.is_active {
                    tracing::info!(user_id = %user.id, active = user.is_active, "Login rejected");
                    return Err(AuthError::InvalidCredentials.into());
                }
                user
            }
            None => {
                self.hasher.hash(password).await?;
                tracing::info!("Login rejected for unknown username");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        let pair = self.issuer.issue(user.id, &user.username)?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(pair)
    }

    /// Blacklists a refresh token. Any failure past the presence check is
    /// reported to the client as `LOGOUT_FAILED`; the cause is kept for logs.
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), AppError> {
        let refresh_token = match refresh_token.map(str::trim) {
            Some(token) if !token.is_empty() => token,
            _ => return Err(OperationError::RefreshTokenRequired.into()),
        };

        let claims = self
            .verifier
            .verify(Some(refresh_token), TokenKind::Refresh)
            .await
            .map_err(logout_failed)?;

        let entry = blacklist_entry(&claims).map_err(logout_failed)?;
        bounded(self.store_timeout, "revoke", self.verifier.ledger().revoke(&entry))
            .await
            .map_err(logout_failed)?;

        tracing::info!(user_id = %entry.user_id, jti = %entry.jti, "Refresh token blacklisted");
        Ok(())
    }

    /// Issues a new access token for the identity in a valid refresh token.
    /// The refresh token itself is not rotated.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<String, AppError> {
        let claims = self.verifier.verify(refresh_token, TokenKind::Refresh).await?;
        let user_id = claims.user_id()?;

        let access_token = self.issuer.issue_access(user_id, &claims.username)?;
        tracing::info!(user_id = %user_id, "Access token refreshed");

        Ok(access_token)
    }
}

fn blacklist_entry(claims: &Claims) -> Result<BlacklistEntry, AppError> {
    Ok(BlacklistEntry {
        jti: claims.jti,
        user_id: claims.user_id()?,
        expires_at: claims.expires_at(),
        blacklisted_at: Utc::now(),
    })
}

fn logout_failed(error: AppError) -> AppError {
    let cause = match error {
        AppError::Auth(e) => LogoutFailure::Token(e),
        AppError::Database(e) => LogoutFailure::Ledger(e),
        other => LogoutFailure::Internal(other.to_string()),
    };
    OperationError::LogoutFailed(cause).into()
}
