//! Application state shared across handlers.

use std::sync::Arc;

use bizvistar_core::checkout::OrderSubmitter;
use sqlx::PgPool;
use tokio::task::JoinHandle;

use crate::bridge::{BroadcastChannel, spawn_catalog_sync};
use crate::catalogs::CatalogRegistry;
use crate::config::StorefrontConfig;
use crate::orders::HttpOrderClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalogs: CatalogRegistry,
    orders: Arc<dyn OrderSubmitter>,
    bridge: BroadcastChannel,
}

impl AppState {
    /// Create the application state with the HTTP order client.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    /// * `catalogs` - Bundled template catalogs
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool, catalogs: CatalogRegistry) -> Self {
        let orders = Arc::new(HttpOrderClient::new(&config.orders));
        Self::with_order_submitter(config, pool, catalogs, orders)
    }

    /// Create the application state with a custom order submitter.
    #[must_use]
    pub fn with_order_submitter(
        config: StorefrontConfig,
        pool: PgPool,
        catalogs: CatalogRegistry,
        orders: Arc<dyn OrderSubmitter>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalogs,
                orders,
                bridge: BroadcastChannel::new(),
            }),
        }
    }

    /// Start applying editor catalog updates.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_catalog_sync(&self) -> JoinHandle<()> {
        spawn_catalog_sync(&self.inner.bridge, self.inner.catalogs.clone())
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the catalog registry.
    #[must_use]
    pub fn catalogs(&self) -> &CatalogRegistry {
        &self.inner.catalogs
    }

    /// Get the order service client.
    #[must_use]
    pub fn orders(&self) -> &dyn OrderSubmitter {
        self.inner.orders.as_ref()
    }

    /// Get the editor bridge channel.
    #[must_use]
    pub fn bridge(&self) -> &BroadcastChannel {
        &self.inner.bridge
    }
}
