//! Gateway server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use gatekeep_core::{Config, SeedCredentials};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::GatewayError;
use crate::auth::{
    AuthConfig, AuthState, Role, RoleGate, SeedOutcome, UserDirectory, UserStore, authenticate,
    login, register, register_admin, require_role, run_seed, seed_super_admin,
};

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bind host.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Allowed CORS origin, `*` for any.
    pub cors_origin: String,
    /// Directory holding the user store.
    pub database_path: PathBuf,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Super-admin seed credentials.
    pub superadmin: Option<SeedCredentials>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: gatekeep_core::config::DEFAULT_HOST.to_string(),
            port: gatekeep_core::config::DEFAULT_PORT,
            cors_origin: "*".to_string(),
            database_path: gatekeep_core::config::default_database_path(),
            auth: AuthConfig::default(),
            superadmin: None,
        }
    }
}

impl From<&Config> for GatewayConfig {
    fn from(config: &Config) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            cors_origin: config.cors_origin.clone(),
            database_path: config.database_path.clone(),
            auth: AuthConfig::from(config),
            superadmin: config.superadmin.clone(),
        }
    }
}

/// Build the API router.
///
/// `/register/admin` runs the authenticator, then a `SUPERADMIN` role gate.
pub fn router(state: Arc<AuthState>) -> Router {
    let admin = Router::new()
        .route("/register/admin", post(register_admin))
        .route_layer(middleware::from_fn_with_state(
            RoleGate::new([Role::SuperAdmin]),
            require_role,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(admin);

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1/auth", auth_routes)
        .with_state(state)
}

fn cors_layer(origin: &str) -> Result<CorsLayer, GatewayError> {
    let allow_origin = if origin == "*" {
        AllowOrigin::from(Any)
    } else {
        let value = HeaderValue::from_str(origin)
            .map_err(|e| GatewayError::Config(format!("Invalid CORS origin {origin:?}: {e}")))?;
        AllowOrigin::exact(value)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

/// Gateway server.
pub struct Gateway {
    config: GatewayConfig,
    state: Arc<AuthState>,
}

impl Gateway {
    /// Open the user store and build the auth state.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be opened or the auth config is invalid.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let store = UserStore::open(&config.database_path)?;
        let users: Arc<dyn UserDirectory> = Arc::new(store);
        let state = Arc::new(AuthState::initialize(config.auth.clone(), users)?);

        Ok(Self { config, state })
    }

    /// Shared auth state.
    #[must_use]
    pub fn state(&self) -> Arc<AuthState> {
        self.state.clone()
    }

    /// Create the super-admin now.
    ///
    /// # Errors
    ///
    /// Returns error if no seed credentials are configured or the insert fails.
    pub async fn seed(&self) -> Result<SeedOutcome, GatewayError> {
        let credentials = self.config.superadmin.as_ref().ok_or_else(|| {
            GatewayError::Config("Super-admin credentials are not configured".to_string())
        })?;

        Ok(seed_super_admin(self.state.users.as_ref(), &self.state.hasher, credentials).await?)
    }

    /// Run the gateway server until Ctrl-C.
    ///
    /// Seeding runs in the background; the listener does not wait for it.
    ///
    /// # Errors
    ///
    /// Returns error if the address is invalid or the listener fails.
    pub async fn run(&self) -> Result<(), GatewayError> {
        let seed_state = self.state.clone();
        let credentials = self.config.superadmin.clone();
        tokio::spawn(async move {
            run_seed(
                seed_state.users.as_ref(),
                &seed_state.hasher,
                credentials.as_ref(),
            )
            .await;
        });

        let app = router(self.state.clone())
            .layer(cors_layer(&self.config.cors_origin)?)
            .layer(TraceLayer::new_for_http());

        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid address: {e}")))?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Gateway listening on http://{}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| GatewayError::Server(e.to_string()))?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn health_handler() -> &'static str {
    "OK"
}
