//! Authentication configuration.

use std::time::Duration;

use gatekeep_core::config::{
    Config, DEFAULT_HASH_COST, DEFAULT_HASH_MEMORY_KIB, DEFAULT_TOKEN_LIFETIME,
};
use gatekeep_core::Secret;

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT signing secret. Startup fails if unset.
    pub jwt_secret: Option<Secret>,

    /// Lifetime of issued access tokens.
    pub token_lifetime: Duration,

    /// Argon2 iteration count.
    pub hash_cost: u32,

    /// Argon2 memory cost in KiB.
    pub hash_memory_kib: u32,

    /// Require the literal `Bearer` scheme in the Authorization header.
    pub strict_bearer: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            hash_cost: DEFAULT_HASH_COST,
            hash_memory_kib: DEFAULT_HASH_MEMORY_KIB,
            strict_bearer: false,
        }
    }
}

impl From<&Config> for AuthConfig {
    fn from(config: &Config) -> Self {
        Self {
            jwt_secret: Some(config.jwt_secret.clone()),
            token_lifetime: config.token_lifetime,
            hash_cost: config.hash_cost,
            hash_memory_kib: config.hash_memory_kib,
            strict_bearer: config.strict_bearer,
        }
    }
}

impl AuthConfig {
    /// Create a new auth config builder.
    #[must_use]
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }
}

/// Builder for `AuthConfig`.
#[derive(Debug, Default)]
pub struct AuthConfigBuilder {
    config: AuthConfig,
}

impl AuthConfigBuilder {
    /// Set the JWT secret.
    #[must_use]
    pub fn jwt_secret(mut self, secret: impl Into<Secret>) -> Self {
        self.config.jwt_secret = Some(secret.into());
        self
    }

    /// Set the token lifetime.
    #[must_use]
    pub const fn token_lifetime(mut self, lifetime: Duration) -> Self {
        self.config.token_lifetime = lifetime;
        self
    }

    /// Set the Argon2 iteration count.
    #[must_use]
    pub const fn hash_cost(mut self, cost: u32) -> Self {
        self.config.hash_cost = cost;
        self
    }

    /// Set the Argon2 memory cost in KiB.
    #[must_use]
    pub const fn hash_memory_kib(mut self, kib: u32) -> Self {
        self.config.hash_memory_kib = kib;
        self
    }

    /// Require the literal `Bearer` scheme.
    #[must_use]
    pub const fn strict_bearer(mut self, strict: bool) -> Self {
        self.config.strict_bearer = strict;
        self
    }

    /// Build the config.
    #[must_use]
    pub fn build(self) -> AuthConfig {
        self.config
    }
}
