//! MotoStore CLI - Catalog management tools.
//!
//! # Usage
//!
//! ```bash
//! # Import categories and products from a YAML file
//! motostore-cli catalog import catalog.yaml
//!
//! # Validate a file without writing
//! motostore-cli catalog import catalog.yaml --dry-run
//!
//! # List the catalog, inactive entries included
//! motostore-cli catalog list
//! ```
//!
//! All writes use the backend's service-role key, which bypasses row-level
//! security. Keep it out of the storefront's environment.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "motostore-cli")]
#[command(author, version, about = "MotoStore CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Create or update categories and products from a YAML file
    Import {
        /// Path to the catalog file
        file: PathBuf,

        /// Validate the file without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// List every category and product
    List,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::catalog::CatalogError> {
    match cli.command {
        Commands::Catalog { action } => match action {
            CatalogAction::Import { file, dry_run } => {
                commands::catalog::import_file(&file, dry_run).await?;
            }
            CatalogAction::List => commands::catalog::list().await?,
        },
    }
    Ok(())
}
