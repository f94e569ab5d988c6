//! Database migration commands.
//!
//! The storefront keeps carts and checkout forms in `tower-sessions` records,
//! so its only schema is the session store's table.
//!
//! # Usage
//!
//! ```bash
//! bv-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use secrecy::SecretString;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;

use bizvistar_storefront::db;

/// Errors raised while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create or update the session store table.
///
/// # Errors
///
/// Returns an error if no database URL is configured, the database is
/// unreachable, or the migration fails.
pub async fn sessions() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Running session store migrations...");
    PostgresStore::new(pool).migrate().await?;

    info!("Session store migrations complete!");
    Ok(())
}
