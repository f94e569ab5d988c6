//! Database operations for storefront `PostgreSQL`.
//!
//! # Database: `bizvistar_storefront`
//!
//! Orders are owned by the order service; the storefront only keeps shopper
//! sessions here. Each session carries the cart, cart UI and checkout state of
//! every storefront scope the shopper has visited.
//!
//! ## Tables
//!
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! The session table is created by the session store and run via:
//! ```bash
//! cargo run -p bizvistar-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Check that the database answers queries.
///
/// # Errors
///
/// Returns `sqlx::Error` if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}
