//! Catalog route handlers.

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use bizvistar_core::ProductId;
use bizvistar_core::curation::{FeaturedItem, select_featured};
use serde::Deserialize;
use tracing::instrument;

use crate::middleware::StorefrontScope;
use crate::state::AppState;

/// Landing-page slots when the page does not ask for a count.
const DEFAULT_FEATURED_COUNT: usize = 8;

/// Upper bound on requested landing-page slots.
const MAX_FEATURED_COUNT: usize = 48;

/// Query of `GET featured`.
#[derive(Debug, Deserialize)]
pub struct FeaturedQuery {
    pub count: Option<usize>,
    /// Comma-separated product ids shown first. Numeric text pins numeric ids.
    pub pin: Option<String>,
}

impl FeaturedQuery {
    fn count(&self) -> usize {
        self.count
            .unwrap_or(DEFAULT_FEATURED_COUNT)
            .min(MAX_FEATURED_COUNT)
    }

    fn pinned(&self) -> Vec<ProductId> {
        self.pin
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .filter_map(|id| id.parse::<ProductId>().ok())
            .collect()
    }
}

/// The catalog the scope currently sees.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, scope: StorefrontScope) -> Response {
    let catalog = state.catalogs().snapshot(&scope.0).await;
    Json(catalog.as_ref()).into_response()
}

/// Landing-page selection of products and categories.
#[instrument(skip(state))]
pub async fn featured(
    State(state): State<AppState>,
    scope: StorefrontScope,
    Query(query): Query<FeaturedQuery>,
) -> Json<Vec<FeaturedItem>> {
    let catalog = state.catalogs().snapshot(&scope.0).await;
    Json(select_featured(
        &query.pinned(),
        catalog.products(),
        catalog.categories(),
        query.count(),
    ))
}
