/// Authentication module
///
/// Token lifecycle (issue, verify, revoke), password hashing, and the
/// service that orchestrates signup, login, logout and refresh.

mod claims;
mod jwt;
mod password;
mod service;
mod verifier;

pub use claims::{Claims, TokenKind};
pub use jwt::{TokenDecoder, TokenIssuer, TokenPair};
pub use password::{hash_password, verify_password, PasswordHasher};
pub use service::{AuthService, SignupResponse};
pub use verifier::TokenVerifier;
