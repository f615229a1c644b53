//! Authentication and authorization for the gateway.
//!
//! This module provides:
//! - Password hashing with Argon2id
//! - JWT token issuance and verification
//! - A user directory with unique email index and role index
//! - Authenticator and role gate middleware
//! - Register/login handlers and super-admin seeding

mod config;
mod handlers;
mod jwt;
mod middleware;
mod password;
/// Super-admin seeding at startup.
pub mod setup;
#[cfg(test)]
pub(crate) mod test_support;
mod users;

pub use config::{AuthConfig, AuthConfigBuilder};
pub use handlers::{
    ApiResponse, LoginData, LoginRequest, RegisterRequest, ValidatedJson, login, register,
    register_admin,
};
pub use jwt::{Claims, IssuedToken, TokenIssuer};
pub use middleware::{AuthState, Authenticated, RoleGate, authenticate, require_role};
pub use password::CredentialHasher;
pub use setup::{SeedOutcome, run_seed, seed_super_admin};
pub use users::{NewUser, PublicUser, Role, User, UserDirectory, UserStore};

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed request input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource already exists (duplicate email).
    #[error("{0}")]
    Conflict(String),

    /// Directory insert hit an existing email.
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Unknown email or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No Authorization header on a protected route.
    #[error("Missing Authorization header")]
    MissingToken,

    /// Token signature does not match.
    #[error("Invalid token")]
    InvalidToken,

    /// Token is past its expiry.
    #[error("Token expired")]
    ExpiredToken,

    /// Token is not a structurally valid JWT.
    #[error("Malformed token")]
    MalformedToken,

    /// No authenticated identity on the request.
    #[error("Unauthorized user")]
    Unauthenticated,

    /// Authenticated identity lacks the required role.
    #[error("Access forbidden")]
    Forbidden,

    /// Password hashing failed.
    #[error("Hashing error: {0}")]
    Hashing(String),

    /// Token encoding failed.
    #[error("Token error: {0}")]
    TokenEncoding(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),
}
