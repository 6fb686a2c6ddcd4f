/// JWT Claims structure
///
/// Payload carried by both access and refresh tokens: standard RFC 7519
/// claims plus the token kind, so one kind can never stand in for the other.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// Which half of a token pair a token is
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    pub username: String,
    pub token_type: TokenKind,
    /// Unique token identifier; the revocation ledger indexes refresh tokens by it
    pub jti: Uuid,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub iss: String,
}

impl Claims {
    /// Create claims for `kind` expiring `expiry_seconds` from now
    pub fn new(
        user_id: Uuid,
        username: String,
        kind: TokenKind,
        expiry_seconds: i64,
        issuer: String,
    ) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            username,
            token_type: kind,
            jti: Uuid::new_v4(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// A subject that is not a UUID makes the whole token invalid.
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::TokenInvalid)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    pub fn is_expired(&self) -> bool {
        self.exp < Utc::now().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "testuser".to_string(), TokenKind::Refresh, 3600, "test".to_string());

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.username, "testuser");
        assert_eq!(claims.token_type, TokenKind::Refresh);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(!claims.is_expired());
        assert_eq!(claims.expires_at().timestamp(), claims.exp);
    }

    #[test]
    fn test_each_token_gets_its_own_jti() {
        let user_id = Uuid::new_v4();
        let a = Claims::new(user_id, "u".to_string(), TokenKind::Access, 60, "t".to_string());
        let b = Claims::new(user_id, "u".to_string(), TokenKind::Access, 60, "t".to_string());
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_invalid_user_id() {
        let mut claims = Claims::new(Uuid::new_v4(), "u".to_string(), TokenKind::Access, 60, "t".to_string());
        claims.sub = "invalid-uuid".to_string();

        assert_eq!(claims.user_id().unwrap_err(), AuthError::TokenInvalid);
    }

    #[test]
    fn test_token_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TokenKind::Access).unwrap(), "\"access\"");
        assert_eq!(serde_json::to_string(&TokenKind::Refresh).unwrap(), "\"refresh\"");
    }
}
