//! Configuration loading and validation.
//!
//! All settings come from `GATEKEEP_*` environment variables and are read
//! exactly once at startup. Missing or malformed required values are fatal.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use validator::ValidateEmail;

use crate::secrets::Secret;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Missing required field.
    #[error("Missing required environment variable: {0}")]
    MissingField(&'static str),

    /// A value could not be parsed.
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        /// Environment variable name.
        key: &'static str,
        /// Raw value as found in the environment.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Config validation error.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Environment variable names.
pub mod env {
    /// JWT signing secret.
    pub const JWT_SECRET: &str = "GATEKEEP_JWT_SECRET";
    /// Token lifetime (`90s`, `30m`, `12h`, `1d` or bare seconds).
    pub const JWT_EXPIRES_IN: &str = "GATEKEEP_JWT_EXPIRES_IN";
    /// Argon2 iteration count.
    pub const HASH_COST: &str = "GATEKEEP_HASH_COST";
    /// Argon2 memory cost in KiB.
    pub const HASH_MEMORY_KIB: &str = "GATEKEEP_HASH_MEMORY_KIB";
    /// Path of the user store.
    pub const DATABASE_PATH: &str = "GATEKEEP_DATABASE_PATH";
    /// Listen host.
    pub const HOST: &str = "GATEKEEP_HOST";
    /// Listen port.
    pub const PORT: &str = "GATEKEEP_PORT";
    /// Allowed CORS origin.
    pub const CORS_ORIGIN: &str = "GATEKEEP_CORS_ORIGIN";
    /// Super-admin seed email.
    pub const SUPERADMIN_EMAIL: &str = "GATEKEEP_SUPERADMIN_EMAIL";
    /// Super-admin seed password.
    pub const SUPERADMIN_PASSWORD: &str = "GATEKEEP_SUPERADMIN_PASSWORD";
    /// Require the literal `Bearer` scheme in the Authorization header.
    pub const STRICT_BEARER: &str = "GATEKEEP_STRICT_BEARER";
}

/// Default token lifetime (one day).
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 3600);
/// Default Argon2 iteration count.
pub const DEFAULT_HASH_COST: u32 = 2;
/// Default Argon2 memory cost in KiB.
pub const DEFAULT_HASH_MEMORY_KIB: u32 = 19 * 1024;
/// Default listen host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Credentials used to seed the initial super-admin.
#[derive(Debug, Clone)]
pub struct SeedCredentials {
    /// Super-admin email.
    pub email: String,
    /// Super-admin password.
    pub password: Secret,
}

/// Process-wide configuration.
///
/// Built once at startup and treated as immutable afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// JWT signing secret.
    pub jwt_secret: Secret,
    /// Lifetime of issued tokens.
    pub token_lifetime: Duration,
    /// Argon2 iteration count.
    pub hash_cost: u32,
    /// Argon2 memory cost in KiB.
    pub hash_memory_kib: u32,
    /// Directory holding the user store.
    pub database_path: PathBuf,
    /// Listen host.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Allowed CORS origin, `*` for any.
    pub cors_origin: String,
    /// Super-admin seed credentials, if configured.
    pub superadmin: Option<SeedCredentials>,
    /// Require the literal `Bearer` scheme.
    pub strict_bearer: bool,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing or any value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing or any value is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get(env::JWT_SECRET)
            .map(Secret::new)
            .ok_or(ConfigError::MissingField(env::JWT_SECRET))?;

        let token_lifetime = match get(env::JWT_EXPIRES_IN) {
            Some(raw) => parse_duration(&raw).map_err(|reason| ConfigError::InvalidValue {
                key: env::JWT_EXPIRES_IN,
                value: raw,
                reason,
            })?,
            None => DEFAULT_TOKEN_LIFETIME,
        };

        let hash_cost = parse_number(env::HASH_COST, get(env::HASH_COST), DEFAULT_HASH_COST)?;
        let hash_memory_kib = parse_number(
            env::HASH_MEMORY_KIB,
            get(env::HASH_MEMORY_KIB),
            DEFAULT_HASH_MEMORY_KIB,
        )?;
        let port = parse_number(env::PORT, get(env::PORT), DEFAULT_PORT)?;

        let database_path = get(env::DATABASE_PATH)
            .map_or_else(default_database_path, PathBuf::from);

        let superadmin = match (get(env::SUPERADMIN_EMAIL), get(env::SUPERADMIN_PASSWORD)) {
            (Some(email), Some(password)) => Some(SeedCredentials {
                email,
                password: Secret::new(password),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingField(env::SUPERADMIN_PASSWORD)),
            (None, Some(_)) => return Err(ConfigError::MissingField(env::SUPERADMIN_EMAIL)),
        };

        let strict_bearer = match get(env::STRICT_BEARER) {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: env::STRICT_BEARER,
                value: raw,
                reason: "expected true/false".to_string(),
            })?,
            None => false,
        };

        let config = Self {
            jwt_secret,
            token_lifetime,
            hash_cost,
            hash_memory_kib,
            database_path,
            host: get(env::HOST).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            cors_origin: get(env::CORS_ORIGIN).unwrap_or_else(|| "*".to_string()),
            superadmin,
            strict_bearer,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns error describing the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingField(env::JWT_SECRET));
        }
        if self.token_lifetime.is_zero() {
            return Err(ConfigError::Validation(
                "token lifetime must be greater than zero".to_string(),
            ));
        }
        let lifetime_fits = chrono::Duration::from_std(self.token_lifetime)
            .ok()
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .is_some();
        if !lifetime_fits {
            return Err(ConfigError::Validation(
                "token lifetime is too large to compute an expiry".to_string(),
            ));
        }
        if self.hash_cost == 0 {
            return Err(ConfigError::Validation(
                "hash cost must be at least 1".to_string(),
            ));
        }
        if let Some(seed) = &self.superadmin {
            if !seed.email.validate_email() {
                return Err(ConfigError::InvalidValue {
                    key: env::SUPERADMIN_EMAIL,
                    value: seed.email.clone(),
                    reason: "not a valid email address".to_string(),
                });
            }
        }
        if self.jwt_secret.expose().len() < 32 {
            tracing::warn!("JWT secret is shorter than 32 bytes");
        }
        Ok(())
    }
}

/// Default location of the user store.
#[must_use]
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gatekeep")
}

fn parse_number<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key,
                value: raw,
                reason: e.to_string(),
            }),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a human duration such as `90s`, `30m`, `12h`, `7d` or bare seconds.
///
/// # Errors
///
/// Returns a description of the problem if the value is not a duration.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| "expected a number followed by s, m, h or d".to_string())?;

    let multiplier = match unit.to_ascii_lowercase().as_str() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        other => return Err(format!("unknown unit {other:?}")),
    };

    value
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| "duration overflows".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[(env::JWT_SECRET, "s3cret")])).unwrap();
        assert_eq!(config.jwt_secret.expose(), "s3cret");
        assert_eq!(config.token_lifetime, DEFAULT_TOKEN_LIFETIME);
        assert_eq!(config.hash_cost, DEFAULT_HASH_COST);
        assert_eq!(config.hash_memory_kib, DEFAULT_HASH_MEMORY_KIB);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.cors_origin, "*");
        assert!(config.superadmin.is_none());
        assert!(!config.strict_bearer);
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let result = Config::from_lookup(lookup(&[]));
        assert!(matches!(
            result,
            Err(ConfigError::MissingField(env::JWT_SECRET))
        ));

        let result = Config::from_lookup(lookup(&[(env::JWT_SECRET, "   ")]));
        assert!(matches!(result, Err(ConfigError::MissingField(_))));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            (env::JWT_SECRET, "s3cret"),
            (env::JWT_EXPIRES_IN, "12h"),
            (env::HASH_COST, "3"),
            (env::PORT, "8080"),
            (env::HOST, "0.0.0.0"),
            (env::CORS_ORIGIN, "https://shop.example"),
            (env::DATABASE_PATH, "/tmp/gatekeep-db"),
            (env::SUPERADMIN_EMAIL, "root@example.com"),
            (env::SUPERADMIN_PASSWORD, "rootpw"),
            (env::STRICT_BEARER, "true"),
        ]))
        .unwrap();

        assert_eq!(config.token_lifetime, Duration::from_secs(12 * 3600));
        assert_eq!(config.hash_cost, 3);
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.cors_origin, "https://shop.example");
        assert_eq!(config.database_path, PathBuf::from("/tmp/gatekeep-db"));
        let seed = config.superadmin.unwrap();
        assert_eq!(seed.email, "root@example.com");
        assert_eq!(seed.password.expose(), "rootpw");
        assert!(config.strict_bearer);
    }

    #[test]
    fn test_invalid_values() {
        let result = Config::from_lookup(lookup(&[
            (env::JWT_SECRET, "s3cret"),
            (env::PORT, "eighty"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: env::PORT, .. })
        ));

        let result = Config::from_lookup(lookup(&[
            (env::JWT_SECRET, "s3cret"),
            (env::JWT_EXPIRES_IN, "0s"),
        ]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));

        let result = Config::from_lookup(lookup(&[
            (env::JWT_SECRET, "s3cret"),
            (env::HASH_COST, "0"),
        ]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));

        let result = Config::from_lookup(lookup(&[
            (env::JWT_SECRET, "s3cret"),
            (env::JWT_EXPIRES_IN, "100000000000000"),
        ]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));

        let result = Config::from_lookup(lookup(&[
            (env::JWT_SECRET, "s3cret"),
            (env::JWT_EXPIRES_IN, "3650d"),
        ]));
        assert!(result.is_ok());
    }

    #[test]
    fn test_partial_seed_credentials() {
        let result = Config::from_lookup(lookup(&[
            (env::JWT_SECRET, "s3cret"),
            (env::SUPERADMIN_EMAIL, "root@example.com"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::MissingField(env::SUPERADMIN_PASSWORD))
        ));
    }

    #[test]
    fn test_malformed_seed_email() {
        let result = Config::from_lookup(lookup(&[
            (env::JWT_SECRET, "s3cret"),
            (env::SUPERADMIN_EMAIL, "root-at-example"),
            (env::SUPERADMIN_PASSWORD, "rootpw"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                key: env::SUPERADMIN_EMAIL,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("90"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("90s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("30m"), Ok(Duration::from_secs(1800)));
        assert_eq!(parse_duration("1D"), Ok(Duration::from_secs(86_400)));
        assert_eq!(parse_duration("7d"), Ok(Duration::from_secs(7 * 86_400)));
        assert!(parse_duration("d").is_err());
        assert!(parse_duration("10w").is_err());
        assert!(parse_duration("").is_err());
    }
}
