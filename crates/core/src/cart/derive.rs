//! Values derived from a cart: item count, enriched lines and totals.
//!
//! Nothing here is stored. Every view recomputes from the cart lines and the
//! catalog snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CartLine;
use crate::catalog::{CatalogSnapshot, Product};
use crate::template::StorefrontTemplate;
use crate::variant::VariantSelection;

/// A cart line joined with its product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineDetail {
    /// The resolved product.
    #[serde(flatten)]
    pub product: Product,
    /// Units in the cart.
    pub quantity: u32,
    /// Chosen variants.
    #[serde(default, skip_serializing_if = "VariantSelection::is_empty")]
    pub selected_variants: VariantSelection,
    /// Canonical signature of `selected_variants`.
    #[serde(default)]
    pub variant_signature: String,
    /// `quantity × price`.
    #[serde(with = "rust_decimal::serde::float")]
    pub line_total: Decimal,
}

/// Subtotal, shipping and total of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedTotals {
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

impl DerivedTotals {
    /// Compute totals over resolved lines.
    ///
    /// The template's flat shipping fee applies only when the subtotal is
    /// positive.
    #[must_use]
    pub fn compute(details: &[CartLineDetail], template: StorefrontTemplate) -> Self {
        let subtotal: Decimal = details.iter().map(|detail| detail.line_total).sum();
        let shipping = if subtotal > Decimal::ZERO {
            template.shipping_fee()
        } else {
            Decimal::ZERO
        };
        Self {
            subtotal,
            shipping,
            total: subtotal + shipping,
        }
    }
}

/// Total number of units across all lines.
#[must_use]
pub fn cart_count(lines: &[CartLine]) -> u64 {
    lines.iter().map(|line| u64::from(line.quantity)).sum()
}

/// Join lines against the catalog, dropping lines whose product is gone.
#[must_use]
pub fn cart_details(lines: &[CartLine], catalog: &CatalogSnapshot) -> Vec<CartLineDetail> {
    lines
        .iter()
        .filter_map(|line| {
            let product = catalog.product(&line.product_id)?;
            Some(CartLineDetail {
                line_total: product.price * Decimal::from(line.quantity),
                product: product.clone(),
                quantity: line.quantity,
                variant_signature: line.selected_variants.signature(),
                selected_variants: line.selected_variants.clone(),
            })
        })
        .collect()
}
