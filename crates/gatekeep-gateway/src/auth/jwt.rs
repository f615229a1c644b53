//! JWT token management.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::AuthError;
use super::config::AuthConfig;
use super::users::{Role, User};

/// JWT claims.
///
/// A snapshot of the user at issuance time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// Granted roles.
    pub roles: BTreeSet<Role>,
    /// Email address.
    pub email: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

impl Claims {
    /// Whether the claims hold at least one of `permitted`.
    #[must_use]
    pub fn has_any_role(&self, permitted: &BTreeSet<Role>) -> bool {
        !self.roles.is_disjoint(permitted)
    }
}

/// A freshly signed access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    /// Compact JWS string.
    pub token: String,
    /// Expiration instant.
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies access tokens with a process-wide HMAC secret.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenIssuer {
    /// Create a new issuer with a secret key.
    #[must_use]
    pub fn new(secret: &[u8], lifetime: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            lifetime,
        }
    }

    /// Create an issuer from auth configuration.
    ///
    /// # Errors
    ///
    /// Returns error if no secret is configured.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let secret = config
            .jwt_secret
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::Config("JWT secret is not configured".to_string()))?;

        Ok(Self::new(secret.expose().as_bytes(), config.token_lifetime))
    }

    /// Generate a random 256-bit secret key.
    #[must_use]
    pub fn generate_secret() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }

    /// Generate a random secret as hex string.
    #[must_use]
    pub fn generate_hex_secret() -> String {
        hex::encode(Self::generate_secret())
    }

    /// Configured token lifetime.
    #[must_use]
    pub const fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Sign an access token for a user.
    ///
    /// # Errors
    ///
    /// Returns error if token encoding fails.
    pub fn sign(&self, user: &User) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let lifetime = chrono::Duration::from_std(self.lifetime)
            .map_err(|e| AuthError::Config(format!("Token lifetime out of range: {e}")))?;
        let expires_at = now
            .checked_add_signed(lifetime)
            .ok_or_else(|| AuthError::Config("Token expiry is out of range".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            roles: user.roles.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        Ok(IssuedToken {
            token: self.encode_claims(&claims)?,
            expires_at,
        })
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenEncoding(format!("Encoding failed: {e}")))
    }

    /// Verify signature and expiry and decode the claims.
    ///
    /// # Errors
    ///
    /// Returns `ExpiredToken` past expiry, `MalformedToken` if the token cannot
    /// be parsed and `InvalidToken` for any other validation failure.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::MissingRequiredClaim(_) => AuthError::MalformedToken,
                _ => AuthError::InvalidToken,
            })
    }

    /// Extract the token from an Authorization header value.
    ///
    /// Lax mode takes the second whitespace-separated segment whatever the
    /// scheme. Strict mode requires exactly `Bearer <token>` (scheme is
    /// case-insensitive).
    #[must_use]
    pub fn extract_from_header(header: &str, strict: bool) -> Option<&str> {
        let mut parts = header.split_whitespace();
        if !strict {
            return parts.nth(1);
        }

        match (parts.next(), parts.next(), parts.next()) {
            (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
                Some(token)
            }
            _ => None,
        }
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}
