//! Serve command - start the HTTP server.

use anyhow::{Context, Result};
use gatekeep_core::Config;
use gatekeep_gateway::GatewayConfig;

use crate::ui;

/// Serve command arguments.
#[derive(Debug, Clone, Default)]
pub struct ServeArgs {
    /// Host override.
    pub host: Option<String>,
    /// Port override.
    pub port: Option<u16>,
}

/// Load configuration, apply overrides and run until Ctrl-C.
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let gateway_config = apply_overrides(GatewayConfig::from(&config), args);
    tracing::debug!(config = ?gateway_config, "Resolved gateway configuration");

    ui::header("Starting Gatekeep");
    ui::kv(
        "Address",
        &format!("{}:{}", gateway_config.host, gateway_config.port),
    );
    ui::kv("Database", &gateway_config.database_path.display().to_string());
    ui::kv("CORS origin", &gateway_config.cors_origin);
    if gateway_config.superadmin.is_none() {
        ui::warning("No super-admin credentials set; admin registration stays locked");
    }
    println!();

    gatekeep_gateway::start(gateway_config).await?;
    Ok(())
}

fn apply_overrides(mut config: GatewayConfig, args: ServeArgs) -> GatewayConfig {
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_apply_overrides() {
        let config = apply_overrides(
            GatewayConfig::default(),
            ServeArgs {
                host: Some("0.0.0.0".to_string()),
                port: None,
            },
        );
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);

        let config = apply_overrides(
            GatewayConfig::default(),
            ServeArgs {
                host: None,
                port: Some(8080),
            },
        );
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
    }
}
