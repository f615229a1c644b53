//! Seed command - create the super-admin without starting the server.

use anyhow::{Context, Result};
use gatekeep_core::Config;
use gatekeep_gateway::{Gateway, GatewayConfig, SeedOutcome};

use crate::ui;

/// Create the super-admin from the configured credentials.
pub async fn run_seed() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let gateway = Gateway::new(GatewayConfig::from(&config))?;

    match gateway.seed().await? {
        SeedOutcome::Created(admin) => {
            ui::success("Super admin created");
            ui::kv("ID", &admin.id.to_string());
            ui::kv("Email", &admin.email);
        }
        SeedOutcome::AlreadyExists => ui::info("Super admin already exists"),
    }

    Ok(())
}
