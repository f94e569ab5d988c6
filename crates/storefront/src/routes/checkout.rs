//! Checkout route handlers.
//!
//! The checkout controller is persisted in the session next to the cart. A
//! submission persists the `Submitting` phase before calling the order
//! service, so a second submit from another tab is refused until the first
//! one finishes or goes stale.

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, extract::State};
use bizvistar_core::cart::CartStore;
use bizvistar_core::catalog::CatalogSnapshot;
use bizvistar_core::checkout::{
    CheckoutController, CheckoutError, CheckoutField, OrderOutcome, OrderRequest, SubmitError,
};
use bizvistar_core::storage::Storage;
use bizvistar_core::template::StorageScope;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::StorefrontScope;
use crate::session_storage::SessionStorage;
use crate::state::AppState;
use crate::views::{CartView, CheckoutView};

/// Body of `POST checkout/field`.
#[derive(Debug, Deserialize)]
pub struct FieldUpdate {
    pub field: CheckoutField,
    #[serde(default)]
    pub value: String,
}

/// Answer to a placed order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlaced {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub checkout: CheckoutView,
    pub cart: CartView,
}

/// Read the scope's checkout state, starting fresh when absent or unreadable.
fn load_checkout(storage: &impl Storage, scope: &StorageScope) -> CheckoutController {
    storage
        .get_item(&scope.checkout_key())
        .and_then(|raw| {
            serde_json::from_str::<CheckoutController>(&raw)
                .map_err(|e| warn!(error = %e, "Discarding unreadable checkout state"))
                .ok()
        })
        .filter(|checkout| checkout.template() == scope.template())
        .unwrap_or_else(|| CheckoutController::new(scope.template()))
}

fn store_checkout(storage: &mut impl Storage, scope: &StorageScope, checkout: &CheckoutController) {
    match serde_json::to_string(checkout) {
        Ok(raw) => storage.set_item(&scope.checkout_key(), raw),
        Err(e) => warn!(error = %e, "Failed to serialize checkout state"),
    }
}

/// Keys a checkout request touches.
fn checkout_keys(scope: &StorageScope) -> [String; 3] {
    [scope.cart_key(), scope.cart_ui_key(), scope.checkout_key()]
}

/// Show the checkout form.
#[instrument(skip(session))]
pub async fn show(scope: StorefrontScope, session: Session) -> Result<Json<CheckoutView>> {
    let storage = SessionStorage::load(&session, &[scope.0.checkout_key()]).await?;
    let checkout = load_checkout(&storage, &scope.0);
    Ok(Json(CheckoutView::from(&checkout)))
}

/// Record one field edit.
#[instrument(skip(session, update), fields(field = ?update.field))]
pub async fn update_field(
    scope: StorefrontScope,
    session: Session,
    Json(update): Json<FieldUpdate>,
) -> Result<Json<CheckoutView>> {
    let mut storage = SessionStorage::load(&session, &[scope.0.checkout_key()]).await?;
    let mut checkout = load_checkout(&storage, &scope.0);

    checkout.handle_change(update.field, update.value);

    store_checkout(&mut storage, &scope.0, &checkout);
    storage.flush(&session).await?;
    Ok(Json(CheckoutView::from(&checkout)))
}

/// Send the order, bounded by the configured timeout.
async fn send_order(
    state: &AppState,
    request: &OrderRequest,
) -> std::result::Result<OrderOutcome, SubmitError> {
    let timeout = state.config().orders.timeout;
    tokio::time::timeout(timeout, state.orders().submit_order(request))
        .await
        .unwrap_or(Err(SubmitError::Timeout(timeout)))
}

/// How long a persisted `Submitting` phase is honoured.
fn stale_after(timeout: Duration) -> chrono::Duration {
    chrono::Duration::from_std(timeout.saturating_mul(2)).unwrap_or(chrono::Duration::MAX)
}

/// Validate the form and place the order.
#[instrument(skip(state, session))]
pub async fn submit(
    State(state): State<AppState>,
    scope: StorefrontScope,
    session: Session,
) -> Result<Json<OrderPlaced>> {
    let scope = scope.0;
    let mut storage = SessionStorage::load(&session, &checkout_keys(&scope)).await?;
    let mut checkout = load_checkout(&storage, &scope);
    let catalog: Arc<CatalogSnapshot> = state.catalogs().snapshot(&scope).await;

    if checkout.abandon_stale(Utc::now(), stale_after(state.config().orders.timeout)) {
        store_checkout(&mut storage, &scope, &checkout);
    }

    let begun = {
        let cart = CartStore::load(Arc::clone(&catalog), scope.clone(), &mut storage);
        checkout.begin_submit(&cart, &scope)
    };

    let request = match begun {
        Ok(request) => request,
        Err(error) => {
            store_checkout(&mut storage, &scope, &checkout);
            storage.flush(&session).await?;
            return Err(AppError::checkout(error, CheckoutView::from(&checkout)));
        }
    };

    // Persist the in-flight flag before waiting on the order service
    store_checkout(&mut storage, &scope, &checkout);
    storage.flush(&session).await?;
    session.save().await?;

    add_breadcrumb("checkout", "Submitting order", None);
    let result = send_order(&state, &request).await;

    let (finished, cart_view) = {
        let mut cart = CartStore::load(catalog, scope.clone(), &mut storage);
        let finished = checkout.finish_submit(&mut cart, result);
        (finished, CartView::new(&cart, Utc::now()))
    };

    store_checkout(&mut storage, &scope, &checkout);
    storage.flush(&session).await?;

    let order_id = match finished {
        Ok(OrderOutcome::Placed { order_id }) => order_id,
        Ok(OrderOutcome::Rejected(reason)) => {
            return Err(AppError::checkout(
                CheckoutError::Rejected(reason),
                CheckoutView::from(&checkout),
            ));
        }
        Err(error) => return Err(AppError::checkout(error, CheckoutView::from(&checkout))),
    };

    info!(order_id = ?order_id, "Checkout complete");
    Ok(Json(OrderPlaced {
        success: true,
        order_id,
        checkout: CheckoutView::from(&checkout),
        cart: cart_view,
    }))
}
