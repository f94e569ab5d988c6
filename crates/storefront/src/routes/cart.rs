//! Cart route handlers.
//!
//! Each request loads the scope's cart from the session, applies one
//! mutation and writes the changed keys back. Mutations answer with the
//! updated cart and an `HX-Trigger: cart-updated` header so other widgets
//! on the page can refresh.

use axum::{
    Json,
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use bizvistar_core::ProductId;
use bizvistar_core::cart::CartStore;
use bizvistar_core::variant::VariantSelection;
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{debug, instrument};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::StorefrontScope;
use crate::session_storage::SessionStorage;
use crate::state::AppState;
use crate::views::CartView;

/// Body of `POST cart/add`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub selected_variants: Option<VariantSelection>,
}

/// Body of the per-line mutations.
///
/// Without a signature `increase` and `decrease` target the product's first
/// line and `remove` drops every line of the product.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_signature: Option<String>,
}

impl LineRequest {
    fn signature(&self) -> Option<&str> {
        self.variant_signature.as_deref()
    }
}

/// Load the scope's cart from the session.
pub(crate) async fn load_cart(
    state: &AppState,
    scope: &StorefrontScope,
    session: &Session,
) -> Result<CartStore<SessionStorage>> {
    let scope = scope.0.clone();
    let storage = SessionStorage::load(session, &[scope.cart_key(), scope.cart_ui_key()]).await?;
    let catalog = state.catalogs().snapshot(&scope).await;
    Ok(CartStore::load(catalog, scope, storage))
}

/// Render the cart and write any changes back to the session.
async fn save_and_render(cart: CartStore<SessionStorage>, session: &Session) -> Result<CartView> {
    let view = CartView::new(&cart, Utc::now());
    let mut storage = cart.into_storage();
    storage.flush(session).await?;
    Ok(view)
}

fn updated(view: CartView) -> Response {
    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        Json(view),
    )
        .into_response()
}

/// Show the cart.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    scope: StorefrontScope,
    session: Session,
) -> Result<Json<CartView>> {
    let cart = load_cart(&state, &scope, &session).await?;
    // Loading may normalize a stored cart; persist that too
    Ok(Json(save_and_render(cart, &session).await?))
}

/// Add a product to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    scope: StorefrontScope,
    session: Session,
    Json(request): Json<AddToCartRequest>,
) -> Result<Response> {
    let mut cart = load_cart(&state, &scope, &session).await?;
    let quantity = request.quantity.unwrap_or(1);

    cart.add_to_cart(&request.product_id, quantity, request.selected_variants)?;

    let product_id = request.product_id.to_string();
    let quantity = quantity.to_string();
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[
            ("product_id", product_id.as_str()),
            ("quantity", quantity.as_str()),
        ]),
    );

    Ok(updated(save_and_render(cart, &session).await?))
}

/// Add one unit to a line.
#[instrument(skip(state, session))]
pub async fn increase(
    State(state): State<AppState>,
    scope: StorefrontScope,
    session: Session,
    Json(request): Json<LineRequest>,
) -> Result<Response> {
    let mut cart = load_cart(&state, &scope, &session).await?;
    if !cart.increase_quantity(&request.product_id, request.signature()) {
        debug!(product = %request.product_id, "Increase ignored");
    }
    Ok(updated(save_and_render(cart, &session).await?))
}

/// Remove one unit from a line, dropping it at zero.
#[instrument(skip(state, session))]
pub async fn decrease(
    State(state): State<AppState>,
    scope: StorefrontScope,
    session: Session,
    Json(request): Json<LineRequest>,
) -> Result<Response> {
    let mut cart = load_cart(&state, &scope, &session).await?;
    if !cart.decrease_quantity(&request.product_id, request.signature()) {
        debug!(product = %request.product_id, "Decrease ignored");
    }
    Ok(updated(save_and_render(cart, &session).await?))
}

/// Remove a line.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    scope: StorefrontScope,
    session: Session,
    Json(request): Json<LineRequest>,
) -> Result<Response> {
    let mut cart = load_cart(&state, &scope, &session).await?;
    let removed = cart.remove_from_cart(&request.product_id, request.signature());
    debug!(product = %request.product_id, removed, "Removed from cart");
    Ok(updated(save_and_render(cart, &session).await?))
}

/// Empty the cart.
#[instrument(skip(state, session))]
pub async fn clear(
    State(state): State<AppState>,
    scope: StorefrontScope,
    session: Session,
) -> Result<Response> {
    let mut cart = load_cart(&state, &scope, &session).await?;
    cart.clear_cart();
    Ok(updated(save_and_render(cart, &session).await?))
}

/// Open the cart drawer.
#[instrument(skip(state, session))]
pub async fn open(
    State(state): State<AppState>,
    scope: StorefrontScope,
    session: Session,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&state, &scope, &session).await?;
    cart.open_cart();
    Ok(Json(save_and_render(cart, &session).await?))
}

/// Close the cart drawer.
#[instrument(skip(state, session))]
pub async fn close(
    State(state): State<AppState>,
    scope: StorefrontScope,
    session: Session,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&state, &scope, &session).await?;
    cart.close_cart();
    Ok(Json(save_and_render(cart, &session).await?))
}
