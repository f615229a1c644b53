//! Authentication middleware for axum.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::AuthError;
use super::config::AuthConfig;
use super::jwt::{Claims, TokenIssuer};
use super::password::CredentialHasher;
use super::users::{Role, UserDirectory};

/// Shared authentication state.
pub struct AuthState {
    /// Auth configuration.
    pub config: AuthConfig,
    /// Token issuer.
    pub issuer: TokenIssuer,
    /// Password hasher.
    pub hasher: CredentialHasher,
    /// User directory.
    pub users: Arc<dyn UserDirectory>,
}

impl AuthState {
    /// Create a new auth state.
    #[must_use]
    pub fn new(
        config: AuthConfig,
        issuer: TokenIssuer,
        hasher: CredentialHasher,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            config,
            issuer,
            hasher,
            users,
        }
    }

    /// Build issuer and hasher from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the JWT secret is missing or the hash parameters are invalid.
    pub fn initialize(config: AuthConfig, users: Arc<dyn UserDirectory>) -> Result<Self, AuthError> {
        let issuer = TokenIssuer::from_config(&config)?;
        let hasher = CredentialHasher::new(config.hash_cost, config.hash_memory_kib)?;

        Ok(Self::new(config, issuer, hasher, users))
    }

    /// Validate a token and return claims.
    ///
    /// # Errors
    ///
    /// Returns error if token is invalid, expired or malformed.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.issuer.verify(token)
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("config", &self.config)
            .field("issuer", &self.issuer)
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}

/// Error envelope for every failed request.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) | Self::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::UserExists(_) => (
                StatusCode::BAD_REQUEST,
                "User already exists with this email".to_string(),
            ),
            Self::InvalidCredentials => (StatusCode::BAD_REQUEST, "Invalid credentials".to_string()),
            Self::MissingToken => (
                StatusCode::FORBIDDEN,
                "Unauthorized: No token provided".to_string(),
            ),
            Self::InvalidToken | Self::ExpiredToken | Self::MalformedToken => (
                StatusCode::FORBIDDEN,
                "Unauthorized: Invalid Token".to_string(),
            ),
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, "Unauthorized User".to_string()),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Access Forbidden".to_string()),
            Self::Hashing(_) | Self::TokenEncoding(_) | Self::Storage(_) | Self::Config(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}

/// Verify the bearer token and attach its claims to the request.
///
/// Rejects with 403 when the header is missing or the token does not verify.
/// The specific verification failure is logged, never returned.
///
/// # Errors
///
/// Returns `MissingToken`, or the token error reported by the issuer.
pub async fn authenticate(
    State(auth): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?;

    let token = header
        .to_str()
        .ok()
        .and_then(|value| TokenIssuer::extract_from_header(value, auth.config.strict_bearer))
        .ok_or(AuthError::MalformedToken)?;

    let claims = auth.verify_token(token).inspect_err(|e| {
        tracing::debug!(error = %e, "Token rejected");
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Extractor for the claims attached by [`authenticate`].
#[derive(Debug, Clone)]
pub struct Authenticated(pub Claims);

impl Authenticated {
    /// Get the user ID.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.0.sub
    }
}

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(Self)
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Route guard admitting identities that hold at least one permitted role.
#[derive(Debug, Clone)]
pub struct RoleGate {
    permitted: Arc<BTreeSet<Role>>,
}

impl RoleGate {
    /// Create a gate for the given roles.
    #[must_use]
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            permitted: Arc::new(roles.into_iter().collect()),
        }
    }

    /// Check the (possibly absent) authenticated identity.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` without claims, `Forbidden` without a matching role.
    pub fn check(&self, claims: Option<&Claims>) -> Result<(), AuthError> {
        let claims = claims.ok_or(AuthError::Unauthenticated)?;

        if claims.has_any_role(&self.permitted) {
            Ok(())
        } else {
            tracing::debug!(user_id = %claims.sub, "Role gate denied request");
            Err(AuthError::Forbidden)
        }
    }
}

/// Middleware applying a [`RoleGate`]. Must run after [`authenticate`].
///
/// # Errors
///
/// Returns `Unauthenticated` (401) or `Forbidden` (403).
pub async fn require_role(
    State(gate): State<RoleGate>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    gate.check(request.extensions().get::<Claims>())?;
    Ok(next.run(request).await)
}
