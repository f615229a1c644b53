//! Register and login handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequest, Request, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use validator::Validate;

use super::AuthError;
use super::middleware::{AuthState, Authenticated};
use super::users::{NewUser, PublicUser, Role, User};

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Human-readable outcome.
    pub message: String,
    /// Payload.
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wrap a payload.
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

/// Registration body, shared by the customer and admin endpoints.
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Email address.
    #[validate(email)]
    pub email: String,
    /// First name.
    #[validate(length(min = 1))]
    pub first_name: String,
    /// Last name.
    #[validate(length(min = 1))]
    pub last_name: String,
    /// Plaintext password.
    #[validate(length(min = 1))]
    pub password: String,
    /// Optional profile image reference.
    #[serde(default, alias = "profileimg")]
    pub profile_image: Option<String>,
}

/// Login body.
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address.
    #[validate(email)]
    pub email: String,
    /// Plaintext password.
    #[validate(length(min = 1))]
    pub password: String,
}

/// Successful login payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    /// Signed access token.
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: &'static str,
    /// Token expiry.
    pub expires_at: DateTime<Utc>,
    /// The authenticated user.
    pub user: PublicUser,
}

/// JSON body extractor that runs `validator` checks.
///
/// Rejections use the standard error envelope instead of axum's plain-text body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state)
            .await
            .map_err(|e| AuthError::Validation(e.body_text()))?;

        value.validate().map_err(|e| {
            let mut fields: Vec<String> = e.field_errors().keys().map(ToString::to_string).collect();
            fields.sort();
            AuthError::Validation(format!("Invalid fields: {}", fields.join(", ")))
        })?;

        Ok(Self(value))
    }
}

/// `POST /register`: create a customer account.
///
/// # Errors
///
/// `Conflict` if the email is taken, internal errors otherwise.
pub async fn register(
    State(auth): State<Arc<AuthState>>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<Json<ApiResponse<PublicUser>>, AuthError> {
    let user = create_account(
        &auth,
        request,
        Role::Customer,
        "User already exists with this email",
    )
    .await?;

    tracing::info!(user_id = %user.id, "Customer registered");

    Ok(Json(ApiResponse::new(
        "User Registered Successfully",
        user.to_public(),
    )))
}

/// `POST /register/admin`: create an admin account.
///
/// The route is gated to `SUPERADMIN` by the middleware stack; the handler
/// itself only records who made the call.
///
/// # Errors
///
/// `Conflict` if the email is taken, internal errors otherwise.
pub async fn register_admin(
    State(auth): State<Arc<AuthState>>,
    caller: Authenticated,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PublicUser>>), AuthError> {
    let user = create_account(&auth, request, Role::Admin, "Admin already exists").await?;

    tracing::info!(
        user_id = %user.id,
        created_by = %caller.user_id(),
        "Admin registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Admin Created Successfully", user.to_public())),
    ))
}

/// `POST /login`: verify credentials and issue an access token.
///
/// Unknown email and wrong password produce the same response.
///
/// # Errors
///
/// `InvalidCredentials` on either failure, internal errors otherwise.
pub async fn login(
    State(auth): State<Arc<AuthState>>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginData>>, AuthError> {
    let Some(user) = auth.users.find_by_email(&request.email).await? else {
        tracing::debug!("Login rejected: unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    let valid = auth
        .hasher
        .verify_async(request.password, user.password_hash.clone())
        .await?;
    if !valid {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    let issued = auth.issuer.sign(&user)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(ApiResponse::new(
        "User logged in successfully",
        LoginData {
            access_token: issued.token,
            token_type: "Bearer",
            expires_at: issued.expires_at,
            user: user.to_public(),
        },
    )))
}

/// Check, hash and insert. A directory insert conflict is the final word on
/// uniqueness; the lookup only short-circuits the common case.
async fn create_account(
    auth: &AuthState,
    request: RegisterRequest,
    role: Role,
    conflict_message: &str,
) -> Result<User, AuthError> {
    if auth.users.find_by_email(&request.email).await?.is_some() {
        return Err(AuthError::Conflict(conflict_message.to_string()));
    }

    let password_hash = auth.hasher.hash_async(request.password).await?;
    let user = User::new(
        NewUser {
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            profile_image: request.profile_image,
            role,
        },
        password_hash,
    );

    auth.users.insert(&user).await.map_err(|e| match e {
        AuthError::UserExists(_) => AuthError::Conflict(conflict_message.to_string()),
        other => other,
    })?;

    Ok(user)
}
