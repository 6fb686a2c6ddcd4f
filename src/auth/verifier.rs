/// Token Verifier
///
/// Access tokens are valid iff signature and expiry check out. Refresh tokens
/// additionally must be absent from the revocation ledger.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::claims::{Claims, TokenKind};
use crate::auth::jwt::TokenDecoder;
use crate::error::{AppError, AuthError};
use crate::store::{bounded, RevocationLedger};

#[derive(Clone)]
pub struct TokenVerifier {
    decoder: TokenDecoder,
    ledger: Arc<dyn RevocationLedger>,
    store_timeout: Duration,
}

impl TokenVerifier {
    pub fn new(decoder: TokenDecoder, ledger: Arc<dyn RevocationLedger>, store_timeout: Duration) -> Self {
        Self {
            decoder,
            ledger,
            store_timeout,
        }
    }

    pub fn decoder(&self) -> &TokenDecoder {
        &self.decoder
    }

    pub fn ledger(&self) -> &Arc<dyn RevocationLedger> {
        &self.ledger
    }

    /// Verify a presented token of `kind`
    ///
    /// # Errors
    /// `AppError::Auth` carries the rejection reason; a ledger failure or
    /// timeout surfaces as `AppError::Database`.
    pub async fn verify(&self, token: Option<&str>, kind: TokenKind) -> Result<Claims, AppError> {
        let token = match token.map(str::trim) {
            Some(token) if !token.is_empty() => token,
            _ => return Err(AuthError::TokenMissing.into()),
        };

        let claims = self.decoder.decode(token, kind)?;

        if kind == TokenKind::Refresh {
            let revoked = bounded(
                self.store_timeout,
                "is_revoked",
                self.ledger.is_revoked(claims.jti),
            )
            .await?;
            if revoked {
                tracing::info!(jti = %claims.jti, user_id = %claims.sub, "Blacklisted refresh token presented");
                return Err(AuthError::TokenRevoked.into());
            }
        }

        Ok(claims)
    }
}
