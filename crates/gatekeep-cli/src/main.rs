//! Gatekeep CLI - run and administer the authentication service.

mod commands;
mod ui;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "gatekeep")]
#[command(about = "Gatekeep - registration, login and role-gated JWT auth")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Bind host (overrides GATEKEEP_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides GATEKEEP_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create the super-admin from GATEKEEP_SUPERADMIN_* and exit
    Seed,

    /// Print a random hex secret suitable for GATEKEEP_JWT_SECRET
    GenerateSecret,
}

fn init_logging(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer().with_target(false)))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Serve { host, port } => {
            commands::run_serve(commands::serve::ServeArgs { host, port }).await?;
        }
        Commands::Seed => commands::run_seed().await?,
        Commands::GenerateSecret => commands::run_generate_secret(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::parse_from(["gatekeep", "--log-json", "serve", "--port", "8080"]);
        assert!(cli.log_json);
        assert!(!cli.verbose);
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(8080));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_generate_secret() {
        let cli = Cli::parse_from(["gatekeep", "generate-secret", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::GenerateSecret));
    }
}
