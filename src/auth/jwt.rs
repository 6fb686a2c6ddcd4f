/// JWT Token Issuance and Decoding
///
/// `TokenIssuer` mints HS256-signed access/refresh tokens with independent
/// lifetimes. `TokenDecoder` checks signature, issuer, expiry and token kind;
/// it knows nothing about revocation (see `TokenVerifier`).

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenKind};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Access and refresh token issued together on login
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct TokenIssuer {
    key: Arc<EncodingKey>,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
    issuer: String,
}

impl TokenIssuer {
    pub fn new(config: &JwtSettings) -> Self {
        Self {
            key: Arc::new(EncodingKey::from_secret(config.secret.as_bytes())),
            access_token_expiry: config.access_token_expiry,
            refresh_token_expiry: config.refresh_token_expiry,
            issuer: config.issuer.clone(),
        }
    }

    /// Issue an access/refresh pair for a user
    ///
    /// # Errors
    /// Returns error if token signing fails
    pub fn issue(&self, user_id: Uuid, username: &str) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue_access(user_id, username)?,
            refresh_token: self.sign(TokenKind::Refresh, user_id, username)?,
        })
    }

    /// Issue a lone access token, as the refresh flow does
    pub fn issue_access(&self, user_id: Uuid, username: &str) -> Result<String, AppError> {
        self.sign(TokenKind::Access, user_id, username)
    }

    fn sign(&self, kind: TokenKind, user_id: Uuid, username: &str) -> Result<String, AppError> {
        let expiry = match kind {
            TokenKind::Access => self.access_token_expiry,
            TokenKind::Refresh => self.refresh_token_expiry,
        };
        let claims = Claims::new(user_id, username.to_string(), kind, expiry, self.issuer.clone());

        encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }
}

#[derive(Clone)]
pub struct TokenDecoder {
    key: Arc<DecodingKey>,
    validation: Validation,
}

impl TokenDecoder {
    pub fn new(config: &JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Verify issuer matches configuration
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;

        Self {
            key: Arc::new(DecodingKey::from_secret(config.secret.as_bytes())),
            validation,
        }
    }

    /// Validate a token of the expected kind and extract its claims
    ///
    /// # Errors
    /// `TokenExpired` for a well-signed token past `exp`; `TokenInvalid` for
    /// anything malformed, forged, from another issuer, or of the wrong kind.
    pub fn decode(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::debug!(error = %e, "JWT validation error");
                    AuthError::TokenInvalid
                }
            })?;

        if claims.token_type != kind {
            tracing::debug!(expected = ?kind, found = ?claims.token_type, "Wrong token kind");
            return Err(AuthError::TokenInvalid);
        }
        claims.user_id()?;

        Ok(claims)
    }
}
