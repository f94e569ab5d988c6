//! Cart store.
//!
//! [`CartStore`] owns the cart lines for one `(tenant, template)` scope and
//! writes the full line list back to [`Storage`] after every successful
//! mutation. It reads stock and prices from the injected catalog snapshot.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use bizvistar_core::cart::CartStore;
//! use bizvistar_core::catalog::CatalogSnapshot;
//! use bizvistar_core::storage::MemoryStorage;
//! use bizvistar_core::template::{StorageScope, StorefrontTemplate};
//!
//! let catalog = Arc::new(CatalogSnapshot::empty());
//! let scope = StorageScope::new(None, StorefrontTemplate::Aurora);
//! let cart = CartStore::load(catalog, scope, MemoryStorage::new());
//! assert_eq!(cart.count(), 0);
//! ```

mod derive;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use derive::{CartLineDetail, DerivedTotals, cart_count, cart_details};

use crate::catalog::{CatalogSnapshot, Product};
use crate::storage::Storage;
use crate::template::{StorageScope, StorefrontTemplate};
use crate::types::ProductId;
use crate::variant::{SelectionError, VariantSelection};

/// How long the "item added" notice stays visible.
pub const NOTICE_TTL_MS: i64 = 2000;

/// Errors that reject a cart mutation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The resulting quantity would pass the product's stock.
    #[error("only {available} of product {product} in stock, {requested} requested")]
    StockExceeded {
        product: ProductId,
        requested: u32,
        available: u32,
    },

    /// The product is not in the catalog.
    #[error("product {0} not found")]
    UnknownProduct(ProductId),

    /// The variant selection does not fit the product.
    #[error(transparent)]
    InvalidVariant(#[from] SelectionError),

    /// A zero quantity was requested.
    #[error("quantity must be at least 1")]
    ZeroQuantity,
}

/// One line of the cart.
///
/// Identity is the product id plus the variant signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "VariantSelection::is_empty")]
    pub selected_variants: VariantSelection,
}

impl CartLine {
    /// Canonical signature of this line's variant selection.
    #[must_use]
    pub fn signature(&self) -> String {
        self.selected_variants.signature()
    }

    fn matches(&self, product_id: &ProductId, signature: Option<&str>) -> bool {
        self.product_id == *product_id && signature.is_none_or(|sig| self.signature() == sig)
    }
}

/// The transient "item added" notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartNotice {
    pub message: String,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

impl CartNotice {
    /// Whether the notice is still visible at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at) < Duration::milliseconds(NOTICE_TTL_MS)
    }
}

/// Drawer visibility and notice, persisted next to the cart lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartUiState {
    #[serde(default)]
    is_open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notice: Option<CartNotice>,
}

/// Cart for one storefront scope.
#[derive(Debug)]
pub struct CartStore<S: Storage> {
    catalog: Arc<CatalogSnapshot>,
    scope: StorageScope,
    storage: S,
    lines: Vec<CartLine>,
    is_open: bool,
    notice: Option<CartNotice>,
}

impl<S: Storage> CartStore<S> {
    /// Hydrate a cart from storage.
    ///
    /// Missing or corrupt data yields an empty cart. Stored lines with a zero
    /// quantity are dropped, lines sharing an identity are merged, and each
    /// line is clamped to its product's stock.
    pub fn load(catalog: Arc<CatalogSnapshot>, scope: StorageScope, storage: S) -> Self {
        let key = scope.cart_key();
        let lines = match storage.get_item(&key) {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str::<Vec<CartLine>>(&raw) {
                Ok(stored) => normalize(stored, &catalog),
                Err(e) => {
                    warn!(key = %key, error = %e, "Discarding unreadable stored cart");
                    Vec::new()
                }
            },
        };

        let ui_key = scope.cart_ui_key();
        let ui = storage
            .get_item(&ui_key)
            .and_then(|raw| match serde_json::from_str::<CartUiState>(&raw) {
                Ok(ui) => Some(ui),
                Err(e) => {
                    warn!(key = %ui_key, error = %e, "Discarding unreadable cart UI state");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            catalog,
            scope,
            storage,
            lines,
            is_open: ui.is_open,
            notice: ui.notice,
        }
    }

    /// A cart holding `lines` as given, bypassing every check.
    #[cfg(test)]
    pub(crate) fn with_unchecked_lines(
        catalog: Arc<CatalogSnapshot>,
        scope: StorageScope,
        storage: S,
        lines: Vec<CartLine>,
    ) -> Self {
        Self {
            catalog,
            scope,
            storage,
            lines,
            is_open: false,
            notice: None,
        }
    }

    /// The storage scope of this cart.
    #[must_use]
    pub const fn scope(&self) -> &StorageScope {
        &self.scope
    }

    /// The template this cart belongs to.
    #[must_use]
    pub const fn template(&self) -> StorefrontTemplate {
        self.scope.template()
    }

    /// The catalog the cart reads from.
    #[must_use]
    pub fn catalog(&self) -> &CatalogSnapshot {
        &self.catalog
    }

    /// Lines in listing order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether the cart drawer is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.is_open
    }

    /// The "item added" notice, if still visible at `now`.
    #[must_use]
    pub fn active_notice(&self, now: DateTime<Utc>) -> Option<&CartNotice> {
        self.notice.as_ref().filter(|notice| notice.is_active(now))
    }

    /// Total units across all lines.
    #[must_use]
    pub fn count(&self) -> u64 {
        cart_count(&self.lines)
    }

    /// Lines joined with their products.
    #[must_use]
    pub fn details(&self) -> Vec<CartLineDetail> {
        cart_details(&self.lines, &self.catalog)
    }

    /// Subtotal, shipping and total.
    #[must_use]
    pub fn totals(&self) -> DerivedTotals {
        DerivedTotals::compute(&self.details(), self.template())
    }

    /// Give the storage back.
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Add `quantity` units of a product.
    ///
    /// Merges into an existing line with the same identity. Omitted variants
    /// take the product's defaults.
    ///
    /// # Errors
    ///
    /// Rejects the whole mutation on a zero quantity, an unknown product, an
    /// invalid variant selection, or when the line would pass the product's
    /// stock.
    pub fn add_to_cart(
        &mut self,
        product_id: &ProductId,
        quantity: u32,
        variants: Option<VariantSelection>,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        let product = self
            .catalog
            .product(product_id)
            .ok_or_else(|| CartError::UnknownProduct(product_id.clone()))?;
        let selection = VariantSelection::resolve(product, variants)?;
        let signature = selection.signature();

        let existing = self
            .lines
            .iter()
            .position(|line| line.matches(product_id, Some(signature.as_str())));
        let current = existing
            .and_then(|i| self.lines.get(i))
            .map_or(0, |line| line.quantity);
        let requested = current.saturating_add(quantity);
        check_stock(product, requested)?;

        let name = product.name.clone();
        match existing.and_then(|i| self.lines.get_mut(i)) {
            Some(line) => line.quantity = requested,
            None => self.lines.push(CartLine {
                product_id: product_id.clone(),
                quantity,
                selected_variants: selection,
            }),
        }

        debug!(product = %product_id, quantity = requested, "Added to cart");
        self.notice = Some(CartNotice {
            message: format!("{name} added to cart"),
            product_id: product_id.clone(),
            created_at: Utc::now(),
        });
        self.persist();
        self.persist_ui();
        Ok(())
    }

    /// Add a single unit with default variants.
    ///
    /// # Errors
    ///
    /// See [`Self::add_to_cart`].
    pub fn add_item(&mut self, product_id: &ProductId) -> Result<(), CartError> {
        self.add_to_cart(product_id, 1, None)
    }

    /// Increment a line by one.
    ///
    /// Without a signature the product's first line is targeted. Does nothing
    /// when no line matches, the product is gone from the catalog, or the
    /// increment would pass stock. Returns whether the cart changed.
    pub fn increase_quantity(&mut self, product_id: &ProductId, signature: Option<&str>) -> bool {
        let Some(product) = self.catalog.product(product_id) else {
            return false;
        };
        let stock = product.stock;
        let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.matches(product_id, signature))
        else {
            return false;
        };
        let next = line.quantity.saturating_add(1);
        if !stock.allows(next) {
            debug!(product = %product_id, quantity = line.quantity, "Increase blocked by stock");
            return false;
        }
        line.quantity = next;
        self.persist();
        true
    }

    /// Decrement a line by one, removing it at zero.
    ///
    /// Without a signature the product's first line is targeted. Returns
    /// whether the cart changed.
    pub fn decrease_quantity(&mut self, product_id: &ProductId, signature: Option<&str>) -> bool {
        let Some(index) = self
            .lines
            .iter()
            .position(|line| line.matches(product_id, signature))
        else {
            return false;
        };
        let remove = match self.lines.get_mut(index) {
            Some(line) if line.quantity > 1 => {
                line.quantity -= 1;
                false
            }
            Some(_) => true,
            None => return false,
        };
        if remove {
            self.lines.remove(index);
        }
        self.persist();
        true
    }

    /// Remove matching lines; every line of the product without a signature.
    ///
    /// Returns the number of lines removed.
    pub fn remove_from_cart(&mut self, product_id: &ProductId, signature: Option<&str>) -> usize {
        let before = self.lines.len();
        self.lines.retain(|line| !line.matches(product_id, signature));
        let removed = before - self.lines.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    /// Empty the cart.
    pub fn clear_cart(&mut self) {
        self.lines.clear();
        self.notice = None;
        self.persist();
        self.persist_ui();
    }

    /// Show the cart drawer.
    pub fn open_cart(&mut self) {
        self.is_open = true;
        self.persist_ui();
    }

    /// Hide the cart drawer.
    pub fn close_cart(&mut self) {
        self.is_open = false;
        self.persist_ui();
    }

    fn persist(&mut self) {
        let key = self.scope.cart_key();
        match serde_json::to_string(&self.lines) {
            Ok(json) => self.storage.set_item(&key, json),
            Err(e) => warn!(key = %key, error = %e, "Failed to serialize cart"),
        }
    }

    fn persist_ui(&mut self) {
        let key = self.scope.cart_ui_key();
        let ui = CartUiState {
            is_open: self.is_open,
            notice: self.notice.clone(),
        };
        match serde_json::to_string(&ui) {
            Ok(json) => self.storage.set_item(&key, json),
            Err(e) => warn!(key = %key, error = %e, "Failed to serialize cart UI state"),
        }
    }
}

fn check_stock(product: &Product, requested: u32) -> Result<(), CartError> {
    match product.stock.ceiling() {
        Some(available) if requested > available => Err(CartError::StockExceeded {
            product: product.id.clone(),
            requested,
            available,
        }),
        _ => Ok(()),
    }
}

/// Drop empty lines, merge lines that share an identity and clamp to stock.
fn normalize(stored: Vec<CartLine>, catalog: &CatalogSnapshot) -> Vec<CartLine> {
    let mut lines: Vec<CartLine> = Vec::with_capacity(stored.len());
    for line in stored {
        if line.quantity == 0 {
            continue;
        }
        let signature = line.signature();
        match lines
            .iter_mut()
            .find(|existing| existing.matches(&line.product_id, Some(signature.as_str())))
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => lines.push(line),
        }
    }
    for line in &mut lines {
        let ceiling = catalog
            .product(&line.product_id)
            .and_then(|product| product.stock.ceiling());
        if let Some(ceiling) = ceiling
            && line.quantity > ceiling
        {
            debug!(
                product = %line.product_id,
                quantity = line.quantity,
                ceiling,
                "Clamping stored line to stock"
            );
            line.quantity = ceiling;
        }
    }
    lines.retain(|line| line.quantity > 0);
    lines
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::catalog::{Stock, VariantKind, VariantSpec};
    use crate::storage::MemoryStorage;
    use crate::types::SiteSlug;

    fn product(id: i64, price: i64, stock: Stock) -> Product {
        Product {
            id: ProductId::from(id),
            name: format!("Product {id}"),
            price: Decimal::from(price),
            category: None,
            image: None,
            stock,
            description: None,
            variants: Vec::new(),
            sold: None,
        }
    }

    fn catalog() -> Arc<CatalogSnapshot> {
        let mut tee = product(4, 300, Stock::Limited(10));
        tee.variants = vec![VariantSpec {
            name: "Size".to_string(),
            kind: VariantKind::Text,
            values: "S, M, L".to_string(),
        }];
        Arc::new(
            CatalogSnapshot::new(
                vec![
                    product(1, 10, Stock::Limited(5)),
                    product(2, 25, Stock::Unlimited),
                    product(3, 40, Stock::Limited(3)),
                    tee,
                ],
                Vec::new(),
            )
            .unwrap(),
        )
    }

    fn scope() -> StorageScope {
        StorageScope::new(
            Some(SiteSlug::parse("acme").unwrap()),
            StorefrontTemplate::Aurora,
        )
    }

    fn cart() -> CartStore<MemoryStorage> {
        CartStore::load(catalog(), scope(), MemoryStorage::new())
    }

    fn id(n: i64) -> ProductId {
        ProductId::from(n)
    }

    #[test]
    fn test_add_first_item() {
        let mut cart = cart();
        cart.add_to_cart(&id(1), 1, None).unwrap();
        assert_eq!(cart.count(), 1);
        assert_eq!(cart.totals().subtotal, Decimal::from(10));
    }

    #[test]
    fn test_add_merges_same_identity() {
        let mut cart = cart();
        cart.add_to_cart(&id(1), 2, None).unwrap();
        cart.add_to_cart(&id(1), 3, None).unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 5);
    }

    #[test]
    fn test_add_rejects_over_stock_without_partial_update() {
        let mut cart = cart();
        cart.add_to_cart(&id(1), 4, None).unwrap();
        let err = cart.add_to_cart(&id(1), 2, None).unwrap_err();
        assert_eq!(
            err,
            CartError::StockExceeded {
                product: id(1),
                requested: 6,
                available: 5,
            }
        );
        assert_eq!(cart.lines()[0].quantity, 4);
    }

    #[test]
    fn test_add_rejects_zero_and_unknown() {
        let mut cart = cart();
        assert_eq!(cart.add_to_cart(&id(1), 0, None), Err(CartError::ZeroQuantity));
        assert_eq!(
            cart.add_to_cart(&id(42), 1, None),
            Err(CartError::UnknownProduct(id(42)))
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_text_id_is_not_numeric_id() {
        let mut cart = cart();
        assert!(matches!(
            cart.add_to_cart(&ProductId::from("1"), 1, None),
            Err(CartError::UnknownProduct(_))
        ));
    }

    #[test]
    fn test_variants_make_distinct_lines() {
        let mut cart = cart();
        cart.add_to_cart(&id(4), 1, None).unwrap();
        cart.add_to_cart(&id(4), 1, Some(VariantSelection::new().with("Size", "L")))
            .unwrap();
        cart.add_to_cart(&id(4), 1, Some(VariantSelection::new().with("Size", "S")))
            .unwrap();
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].selected_variants.get("Size"), Some("S"));
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_invalid_variant_rejected() {
        let mut cart = cart();
        let err = cart
            .add_to_cart(&id(4), 1, Some(VariantSelection::new().with("Size", "XL")))
            .unwrap_err();
        assert!(matches!(err, CartError::InvalidVariant(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_increase_stops_at_stock() {
        let mut cart = cart();
        cart.add_to_cart(&id(3), 3, None).unwrap();
        assert!(!cart.increase_quantity(&id(3), None));
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_increase_unlimited_and_missing() {
        let mut cart = cart();
        cart.add_item(&id(2)).unwrap();
        assert!(cart.increase_quantity(&id(2), None));
        assert_eq!(cart.count(), 2);
        assert!(!cart.increase_quantity(&id(1), None));
    }

    #[test]
    fn test_increase_targets_signature() {
        let mut cart = cart();
        let large = VariantSelection::new().with("Size", "L");
        cart.add_to_cart(&id(4), 1, None).unwrap();
        cart.add_to_cart(&id(4), 1, Some(large.clone())).unwrap();
        assert!(cart.increase_quantity(&id(4), Some(large.signature().as_str())));
        assert_eq!(cart.lines()[0].quantity, 1);
        assert_eq!(cart.lines()[1].quantity, 2);
    }

    #[test]
    fn test_line_mutations_without_signature_target_first_line() {
        let mut cart = cart();
        let large = VariantSelection::new().with("Size", "L");
        cart.add_to_cart(&id(4), 1, None).unwrap();
        cart.add_to_cart(&id(4), 2, Some(large)).unwrap();

        assert!(cart.increase_quantity(&id(4), None));
        assert_eq!(cart.lines()[0].quantity, 2);
        assert_eq!(cart.lines()[1].quantity, 2);

        assert!(cart.decrease_quantity(&id(4), None));
        assert!(cart.decrease_quantity(&id(4), None));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].selected_variants.get("Size"), Some("L"));
    }

    #[test]
    fn test_decrease_to_zero_removes_line() {
        let mut cart = cart();
        cart.add_item(&id(1)).unwrap();
        cart.add_item(&id(2)).unwrap();
        assert!(cart.decrease_quantity(&id(1), None));
        assert_eq!(cart.lines().len(), 1);
        assert!(!cart.decrease_quantity(&id(1), None));
    }

    #[test]
    fn test_remove_without_signature_removes_all_lines() {
        let mut cart = cart();
        cart.add_to_cart(&id(4), 1, None).unwrap();
        cart.add_to_cart(&id(4), 1, Some(VariantSelection::new().with("Size", "M")))
            .unwrap();
        cart.add_item(&id(1)).unwrap();
        assert_eq!(cart.remove_from_cart(&id(4), None), 2);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_open_close_keeps_contents() {
        let mut cart = cart();
        cart.add_item(&id(1)).unwrap();
        cart.open_cart();
        assert!(cart.is_open());
        cart.close_cart();
        assert!(!cart.is_open());
        assert_eq!(cart.count(), 1);
    }

    #[test]
    fn test_notice_expires() {
        let mut cart = cart();
        cart.add_item(&id(1)).unwrap();
        let created = cart.notice.as_ref().unwrap().created_at;
        assert!(cart.active_notice(created).is_some());
        assert!(
            cart.active_notice(created + Duration::milliseconds(NOTICE_TTL_MS))
                .is_none()
        );
    }

    #[test]
    fn test_persistence_round_trip() {
        let mut cart = cart();
        cart.add_to_cart(&id(4), 2, Some(VariantSelection::new().with("Size", "M")))
            .unwrap();
        cart.add_item(&id(2)).unwrap();
        cart.open_cart();
        let lines = cart.lines().to_vec();

        let reloaded = CartStore::load(catalog(), scope(), cart.into_storage());
        assert_eq!(reloaded.lines(), lines.as_slice());
        assert!(reloaded.is_open());
    }

    #[test]
    fn test_persisted_format() {
        let mut cart = cart();
        cart.add_item(&id(1)).unwrap();
        let storage = cart.into_storage();
        let raw = storage.get_item("acme:auroraCart").unwrap();
        assert_eq!(raw, r#"[{"id":1,"quantity":1}]"#);
    }

    #[test]
    fn test_corrupt_storage_yields_empty_cart() {
        let mut storage = MemoryStorage::new();
        storage.set_item("acme:auroraCart", "{not json".to_string());
        let cart = CartStore::load(catalog(), scope(), storage);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_hydration_normalizes() {
        let mut storage = MemoryStorage::new();
        storage.set_item(
            "acme:auroraCart",
            r#"[{"id":1,"quantity":2},{"id":2,"quantity":0},{"id":1,"quantity":1}]"#.to_string(),
        );
        let cart = CartStore::load(catalog(), scope(), storage);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_hydration_clamps_merged_lines_to_stock() {
        let mut storage = MemoryStorage::new();
        storage.set_item(
            "acme:auroraCart",
            r#"[{"id":3,"quantity":3},{"id":3,"quantity":3},{"id":2,"quantity":7}]"#.to_string(),
        );
        let cart = CartStore::load(catalog(), scope(), storage);
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.lines()[1].quantity, 7);
    }

    #[test]
    fn test_hydration_drops_sold_out_lines() {
        let sold_out = Arc::new(
            CatalogSnapshot::new(vec![product(1, 10, Stock::Limited(0))], Vec::new()).unwrap(),
        );
        let mut storage = MemoryStorage::new();
        storage.set_item("acme:auroraCart", r#"[{"id":1,"quantity":2}]"#.to_string());
        let cart = CartStore::load(sold_out, scope(), storage);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_scopes_do_not_share_carts() {
        let mut storage = MemoryStorage::new();
        let mut acme = CartStore::load(catalog(), scope(), &mut storage);
        acme.add_item(&id(1)).unwrap();

        let other = StorageScope::new(
            Some(SiteSlug::parse("zen").unwrap()),
            StorefrontTemplate::Aurora,
        );
        let zen = CartStore::load(catalog(), other, &mut storage);
        assert!(zen.is_empty());
    }

    #[test]
    fn test_clear_cart() {
        let mut cart = cart();
        cart.add_item(&id(1)).unwrap();
        cart.clear_cart();
        assert!(cart.is_empty());
        let storage = cart.into_storage();
        assert_eq!(storage.get_item("acme:auroraCart").as_deref(), Some("[]"));
    }
}
