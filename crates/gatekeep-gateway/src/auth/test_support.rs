//! Shared fixtures for auth tests.

use std::path::Path;
use std::sync::Arc;

use axum::response::Response;

use super::{AuthConfig, AuthState, NewUser, Role, User, UserStore};

pub const TEST_SECRET: &str = "test-secret-0123456789abcdef0123456789";

/// Cheap hashing parameters so tests stay fast.
pub fn test_config() -> AuthConfig {
    AuthConfig::builder()
        .jwt_secret(TEST_SECRET)
        .hash_cost(1)
        .hash_memory_kib(64)
        .build()
}

pub fn auth_state(dir: &Path) -> Arc<AuthState> {
    auth_state_with(dir, test_config())
}

pub fn auth_state_with(dir: &Path, config: AuthConfig) -> Arc<AuthState> {
    let users = Arc::new(UserStore::open(dir).unwrap());
    Arc::new(AuthState::initialize(config, users).unwrap())
}

pub async fn create_user(state: &AuthState, email: &str, password: &str, role: Role) -> User {
    let hash = state.hasher.hash_async(password.to_string()).await.unwrap();
    let user = User::new(
        NewUser {
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            profile_image: None,
            role,
        },
        hash,
    );
    state.users.insert(&user).await.unwrap();
    user
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
