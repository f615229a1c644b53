//! # Gatekeep Gateway
//!
//! HTTP authentication service: registration, login, JWT issuance and role gating.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication and authorization.
pub mod auth;
mod server;

pub use auth::{AuthConfig, AuthError, AuthState, Role, RoleGate, SeedOutcome, User, UserStore};
pub use server::{Gateway, GatewayConfig, router};

/// Start the gateway server.
///
/// # Errors
///
/// Returns error if server fails to start.
pub async fn start(config: GatewayConfig) -> Result<(), GatewayError> {
    let gateway = Gateway::new(config)?;
    gateway.run().await
}

/// Gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Server error.
    #[error("Server error: {0}")]
    Server(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Auth initialization or storage error.
    #[error(transparent)]
    Auth(#[from] auth::AuthError),
}
