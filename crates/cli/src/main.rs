//! Yard Patrol CLI - operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Hash the admin password for ADMIN_PASSWORD_HASH (reads stdin)
//! printf '%s' 'my admin password' | yp-cli admin hash-password
//!
//! # Load and validate the site configuration
//! yp-cli config check
//!
//! # ...and check the identity provider answers
//! yp-cli config check --probe
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "yp-cli")]
#[command(author, version, about = "Yard Patrol CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the admin portal operator
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Inspect the site configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Print an Argon2 hash of the password read from stdin
    HashPassword,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Load the configuration from the environment and report problems
    Check {
        /// Also check that the identity provider is reachable
        #[arg(long)]
        probe: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Admin { action } => match action {
            AdminAction::HashPassword => {
                commands::admin::hash_password(std::io::stdin().lock(), std::io::stdout())?;
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Check { probe } => {
                commands::config::check(probe, std::io::stdout()).await?;
            }
        },
    }
    Ok(())
}
