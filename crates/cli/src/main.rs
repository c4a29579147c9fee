//! Authentic CLI - database migrations, seeding and admin account tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! authentic-cli migrate
//!
//! # Seed the launch catalog and the bootstrap admin (SEED_ADMIN_*)
//! authentic-cli seed
//!
//! # Seed from a YAML catalog instead
//! authentic-cli seed --catalog catalog.yaml
//!
//! # Admin accounts
//! authentic-cli admin list
//! authentic-cli admin promote -e owner@authentic-ctg.com
//! authentic-cli admin purge --yes
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "authentic-cli")]
#[command(author, version, about = "Authentic CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog (when empty) and the bootstrap admin
    Seed {
        /// YAML catalog file to use instead of the launch catalog
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// List admin accounts
    List,
    /// Grant the admin role to an existing account
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Delete every admin account
    Purge {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { catalog } => commands::seed::run(catalog.as_deref()).await?,
        Commands::Admin { action } => match action {
            AdminAction::List => commands::admin::list().await?,
            AdminAction::Promote { email } => commands::admin::promote(&email).await?,
            AdminAction::Purge { yes } => commands::admin::purge(yes).await?,
        },
    }
    Ok(())
}
