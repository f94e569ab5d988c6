//! BizVistar CLI - Database migrations and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table used for carts and checkout forms
//! bv-cli migrate
//!
//! # Validate a catalog file before publishing it
//! bv-cli catalog check crates/storefront/catalogs/flara.json
//!
//! # Preview a landing-page selection
//! bv-cli catalog featured crates/storefront/catalogs/flara.json --count 4 --pin 3
//! ```
//!
//! # Commands
//!
//! - `migrate` - Create or update the session store schema
//! - `catalog check` - Validate a catalog file
//! - `catalog featured` - Print the landing-page selection of a catalog

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bv-cli")]
#[command(author, version, about = "BizVistar storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect catalog files
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Validate a JSON or YAML catalog file
    Check {
        /// Catalog file path
        file: PathBuf,
    },
    /// Print the landing-page selection of a catalog as JSON
    Featured {
        /// Catalog file path
        file: PathBuf,

        /// Number of slots to fill
        #[arg(short, long, default_value_t = 8)]
        count: usize,

        /// Product ids shown first (repeatable)
        #[arg(short, long)]
        pin: Vec<String>,
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
        Commands::Migrate => commands::migrate::sessions().await?,
        Commands::Catalog { action } => match action {
            CatalogAction::Check { file } => commands::catalog::check(&file)?,
            CatalogAction::Featured { file, count, pin } => {
                commands::catalog::featured(&file, count, &pin)?;
            }
        },
    }
    Ok(())
}
