/// Application Error Handling
///
/// One control-flow error type (`AppError`) built from domain-specific enums:
/// 1. Validation errors (field-level, 400)
/// 2. Conflict errors (`USER_ALREADY_EXISTS`, 400)
/// 3. Authentication errors (credentials and tokens)
/// 4. Operation errors (`REFRESH_TOKEN_REQUIRED`, `LOGOUT_FAILED`, 400)
/// 5. Database errors (store failures and timeouts)
///
/// Every variant renders to `{"error": {"code", "message"}}`.

use actix_web::{error::ResponseError, http::header, http::StatusCode, HttpResponse};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Field-level validation failure. The first argument is always the field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            ValidationError::EmptyField(field)
            | ValidationError::TooShort(field, _)
            | ValidationError::TooLong(field, _)
            | ValidationError::InvalidFormat(field) => field,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is required", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
        }
    }
}

impl StdError for ValidationError {}

/// Uniqueness conflicts on user identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    UserAlreadyExists,
}

impl fmt::Display for ConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictError::UserAlreadyExists => write!(f, "User already exists."),
        }
    }
}

impl StdError for ConflictError {}

/// Database operation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    QueryExecution(String),
    ConnectionPool(String),
    Timeout(String),
    UnexpectedError(String),
}

impl DatabaseError {
    /// Failures a client may retry without changing the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DatabaseError::ConnectionPool(_) | DatabaseError::Timeout(_))
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::Timeout(operation) => write!(f, "Store call timed out: {}", operation),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Authentication errors: credential checks and token verification outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials,
    TokenMissing,
    TokenExpired,
    TokenInvalid,
    TokenRevoked,
}

impl AuthError {
    /// Human-readable rejection reason used in the `detail` of refresh failures.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Invalid username or password",
            AuthError::TokenMissing => "Token is missing",
            AuthError::TokenExpired => "Token is expired",
            AuthError::TokenInvalid => "Token is invalid",
            AuthError::TokenRevoked => "Token is blacklisted",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason())
    }
}

impl StdError for AuthError {}

/// Internal cause of a failed logout. Logged, never shown to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutFailure {
    Token(AuthError),
    Ledger(DatabaseError),
    Internal(String),
}

impl LogoutFailure {
    pub fn cause(&self) -> &'static str {
        match self {
            LogoutFailure::Token(_) => "token_rejected",
            LogoutFailure::Ledger(_) => "ledger_unavailable",
            LogoutFailure::Internal(_) => "internal",
        }
    }
}

impl fmt::Display for LogoutFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogoutFailure::Token(e) => write!(f, "{}", e),
            LogoutFailure::Ledger(e) => write!(f, "{}", e),
            LogoutFailure::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

/// Operation-level failures of the logout flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    RefreshTokenRequired,
    LogoutFailed(LogoutFailure),
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationError::RefreshTokenRequired => write!(f, "Refresh token is required."),
            OperationError::LogoutFailed(_) => {
                write!(f, "An error occurred while processing logout.")
            }
        }
    }
}

impl StdError for OperationError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Validation(Vec<ValidationError>),
    Conflict(ConflictError),
    Database(DatabaseError),
    Auth(AuthError),
    Operation(OperationError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(errors) => {
                let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                write!(f, "{}", messages.join("; "))
            }
            AppError::Conflict(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Operation(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(vec![err])
    }
}

impl From<ConflictError> for AppError {
    fn from(err: ConflictError) -> Self {
        AppError::Conflict(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<OperationError> for AppError {
    fn from(err: OperationError) -> Self {
        AppError::Operation(err)
    }
}

const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let error = match &err {
            sqlx::Error::Database(db_err)
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                DatabaseError::UniqueConstraintViolation(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DatabaseError::ConnectionPool(err.to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => DatabaseError::ConnectionPool(err.to_string()),
            sqlx::Error::Database(_) | sqlx::Error::RowNotFound | sqlx::Error::ColumnDecode { .. } => {
                DatabaseError::QueryExecution(err.to_string())
            }
            _ => DatabaseError::UnexpectedError(err.to_string()),
        };
        AppError::Database(error)
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Inner body of every structured error response
#[derive(Debug, serde::Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}

/// `{"error": {...}}` envelope
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                fields: None,
            },
        }
    }

    pub fn with_fields(mut self, errors: &[ValidationError]) -> Self {
        let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for e in errors {
            fields.entry(e.field().to_string()).or_default().push(e.to_string());
        }
        self.error.fields = Some(fields);
        self
    }
}

/// Seconds a client should wait before retrying a retryable store failure.
const RETRY_AFTER_SECS: &str = "1";

impl AppError {
    /// Stable client-facing code for this error
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Conflict(ConflictError::UserAlreadyExists) => "USER_ALREADY_EXISTS",
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => "USER_ALREADY_EXISTS",
            AppError::Database(e) if e.is_retryable() => "SERVICE_UNAVAILABLE",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
                AuthError::TokenMissing => "TOKEN_NOT_FOUND",
                AuthError::TokenExpired => "TOKEN_EXPIRED",
                AuthError::TokenInvalid | AuthError::TokenRevoked => "INVALID_TOKEN",
            },
            AppError::Operation(OperationError::RefreshTokenRequired) => "REFRESH_TOKEN_REQUIRED",
            AppError::Operation(OperationError::LogoutFailed(_)) => "LOGOUT_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-facing message. Internal detail never leaks from here.
    fn client_message(&self) -> String {
        match self {
            AppError::Validation(_) => "Invalid input.".to_string(),
            AppError::Conflict(e) => e.to_string(),
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                ConflictError::UserAlreadyExists.to_string()
            }
            AppError::Database(e) if e.is_retryable() => {
                "Service temporarily unavailable, please retry.".to_string()
            }
            AppError::Database(_) => "Database error occurred.".to_string(),
            AppError::Auth(AuthError::InvalidCredentials) => {
                "Invalid username or password.".to_string()
            }
            AppError::Auth(AuthError::TokenMissing) => "Token was not provided.".to_string(),
            AppError::Auth(AuthError::TokenExpired) => "Token has expired.".to_string(),
            AppError::Auth(_) => "Token is invalid.".to_string(),
            AppError::Operation(e) => e.to_string(),
            AppError::Internal(_) => "Internal server error.".to_string(),
        }
    }

    /// Runs inside the request span, which carries the request id.
    fn log_error(&self) {
        match self {
            AppError::Validation(errors) => {
                tracing::info!(
                    fields = errors.len(),
                    error = %self,
                    "Validation error"
                );
            }
            AppError::Conflict(e) => {
                tracing::info!(error = %e, "Duplicate user");
            }
            AppError::Auth(e) => {
                tracing::warn!(error = %e, "Authentication error");
            }
            AppError::Operation(OperationError::LogoutFailed(cause)) => {
                tracing::warn!(
                    cause = cause.cause(),
                    error = %cause,
                    "Logout failed"
                );
            }
            AppError::Operation(e) => {
                tracing::info!(error = %e, "Operation rejected");
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) | AppError::Operation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Database(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(AuthError::InvalidCredentials) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.log_error();

        let mut body = ErrorResponse::new(self.code(), self.client_message());
        if let AppError::Validation(errors) = self {
            body = body.with_fields(errors);
        }

        let mut response = HttpResponse::build(self.status_code());
        if matches!(self, AppError::Database(e) if e.is_retryable()) {
            response.insert_header((header::RETRY_AFTER, RETRY_AFTER_SECS));
        }
        response.json(body)
    }
}
