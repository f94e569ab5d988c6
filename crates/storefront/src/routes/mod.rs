//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Database readiness check
//!
//! # Scoped storefront routes
//! {scope} = /sites/{site}/{template}    - Published tenant site
//!         | /preview/{template}         - Template preview (no tenant)
//!
//! GET  {scope}/catalog                  - Effective catalog
//! GET  {scope}/featured?count=N&pin=..  - Landing-page selection
//! GET  {scope}/cart                     - Cart view
//! POST {scope}/cart/add                 - Add a product
//! POST {scope}/cart/increase            - One more unit of a line
//! POST {scope}/cart/decrease            - One less unit of a line
//! POST {scope}/cart/remove              - Remove a line
//! POST {scope}/cart/clear               - Empty the cart
//! POST {scope}/cart/open                - Open the cart drawer
//! POST {scope}/cart/close               - Close the cart drawer
//! GET  {scope}/checkout                 - Checkout form state
//! POST {scope}/checkout/field           - Edit one form field
//! POST {scope}/checkout                 - Submit the order
//!
//! # Editor bridge
//! POST /sites/{site}/editor/messages    - Dispatch an editor message
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod editor;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::db;
use crate::middleware::{cart_rate_limiter, checkout_rate_limiter};
use crate::state::AppState;

/// Create the routes of one storefront scope.
///
/// Cart mutations and form edits share one rate limiter; order submission
/// has its own, stricter one.
pub fn scoped_routes() -> Router<AppState> {
    let mutations = Router::new()
        .route("/cart/add", post(cart::add))
        .route("/cart/increase", post(cart::increase))
        .route("/cart/decrease", post(cart::decrease))
        .route("/cart/remove", post(cart::remove))
        .route("/cart/clear", post(cart::clear))
        .route("/cart/open", post(cart::open))
        .route("/cart/close", post(cart::close))
        .route("/checkout/field", post(checkout::update_field))
        .layer(cart_rate_limiter());

    Router::new()
        .route("/catalog", get(catalog::show))
        .route("/featured", get(catalog::featured))
        .route("/cart", get(cart::show))
        .route(
            "/checkout",
            get(checkout::show).merge(post(checkout::submit).layer(checkout_rate_limiter())),
        )
        .merge(mutations)
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let scoped = scoped_routes();

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/sites/{site}/{template}", scoped.clone())
        .nest("/preview/{template}", scoped)
        .route("/sites/{site}/editor/messages", post(editor::dispatch))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match db::ping(state.pool()).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
