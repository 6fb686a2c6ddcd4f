/// Authentication Routes
///
/// Thin adapters between HTTP and `AuthService`: parse the request, call the
/// service, shape the response.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, Claims};
use crate::error::{AppError, AuthError, LogoutFailure, OperationError};

/// Header carrying the refresh token on logout
pub const REFRESH_TOKEN_HEADER: &str = "X-Refresh-Token";

/// Missing fields deserialize as empty strings so validation can name them.
#[derive(Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub nickname: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// Body of a refused refresh: `{"detail", "code"}` rather than the usual envelope.
#[derive(Serialize)]
pub struct TokenNotValidResponse {
    pub detail: String,
    pub code: String,
}

/// POST /auth/signup
///
/// # Errors
/// - 400 `VALIDATION_ERROR`: one entry per offending field
/// - 400 `USER_ALREADY_EXISTS`: username or nickname taken
pub async fn signup(
    body: web::Json<SignupRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let created = service
        .signup(&body.username, &body.password, &body.nickname)
        .await?;

    Ok(HttpResponse::Created().json(created))
}

/// POST /auth/login
///
/// # Errors
/// - 400 `INVALID_CREDENTIALS`: same body for unknown user and wrong password
pub async fn login(
    body: web::Json<LoginRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let pair = service.login(&body.username, &body.password).await?;

    Ok(HttpResponse::Ok().json(pair))
}

/// POST /auth/logout
///
/// **Requires a valid access token** (checked by `JwtMiddleware`); the refresh
/// token to revoke travels in the `X-Refresh-Token` header.
pub async fn logout(
    req: HttpRequest,
    claims: web::ReqData<Claims>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    // Present but undecodable is a bad token, not a missing one
    let refresh_token = match req.headers().get(REFRESH_TOKEN_HEADER) {
        Some(value) => Some(value.to_str().map_err(|_| {
            OperationError::LogoutFailed(LogoutFailure::Token(AuthError::TokenInvalid))
        })?),
        None => None,
    };

    service.logout(refresh_token).await?;
    tracing::debug!(user_id = %claims.sub, "Logout completed");

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Logged out successfully.".to_string(),
    }))
}

/// POST /auth/refresh
///
/// # Errors
/// - 401 `{"detail", "code": "token_not_valid"}`: missing, malformed, expired or blacklisted
/// - 503: revocation ledger unavailable
pub async fn refresh(
    body: web::Json<RefreshRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    match service.refresh(body.refresh_token.as_deref()).await {
        Ok(access_token) => Ok(HttpResponse::Ok().json(AccessTokenResponse { access_token })),
        Err(AppError::Auth(reason)) => Ok(token_not_valid(reason)),
        Err(e) => Err(e),
    }
}

fn token_not_valid(reason: AuthError) -> HttpResponse {
    tracing::info!(reason = %reason, "Refresh rejected");
    HttpResponse::Unauthorized().json(TokenNotValidResponse {
        detail: reason.reason().to_string(),
        code: "token_not_valid".to_string(),
    })
}
