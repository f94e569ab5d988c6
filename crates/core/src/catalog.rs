//! Read-only catalog snapshot for one storefront session.
//!
//! A snapshot comes either from the template's bundled catalog file or from
//! business data the shop owner pushed through the visual editor. It is
//! validated once when built and never mutated afterwards; carts hold it behind
//! an `Arc` and look stock and prices up by product id.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::types::{CategoryId, ProductId};

/// Errors found while validating catalog data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Two products share an id.
    #[error("duplicate product id {0}")]
    DuplicateProduct(ProductId),

    /// Two categories share an id.
    #[error("duplicate category id {0}")]
    DuplicateCategory(CategoryId),

    /// A product has a negative price.
    #[error("product {0} has a negative price")]
    NegativePrice(ProductId),

    /// A product references a category the catalog does not contain.
    #[error("product {product} references unknown category {category}")]
    UnknownCategory {
        /// Offending product.
        product: ProductId,
        /// Category that failed to resolve.
        category: CategoryId,
    },

    /// A variant spec is malformed.
    #[error("product {product} has an invalid variant spec {name:?}: {reason}")]
    InvalidVariant {
        /// Offending product.
        product: ProductId,
        /// Variant spec name.
        name: String,
        /// What is wrong with it.
        reason: &'static str,
    },
}

// =============================================================================
// Stock
// =============================================================================

/// Stock level of a product.
///
/// Catalog data distinguishes a missing `stock` field from the explicit `-1`
/// sentinel; both mean "no ceiling" but each round-trips to its own shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stock {
    /// No `stock` field at all.
    #[default]
    Untracked,
    /// Explicit `-1`.
    Unlimited,
    /// A finite number of units.
    Limited(u32),
}

impl Stock {
    /// Sentinel used in catalog data for unlimited stock.
    pub const UNLIMITED_SENTINEL: i64 = -1;

    /// Largest quantity a cart may hold, or `None` when unlimited.
    #[must_use]
    pub const fn ceiling(self) -> Option<u32> {
        match self {
            Self::Limited(n) => Some(n),
            Self::Untracked | Self::Unlimited => None,
        }
    }

    /// Whether a cart line may hold `quantity` units.
    #[must_use]
    pub fn allows(self, quantity: u32) -> bool {
        self.ceiling().is_none_or(|ceiling| quantity <= ceiling)
    }

    /// Whether the product is sold out.
    #[must_use]
    pub const fn is_out_of_stock(self) -> bool {
        matches!(self, Self::Limited(0))
    }

    /// Whether the field was absent from catalog data.
    #[must_use]
    pub const fn is_untracked(&self) -> bool {
        matches!(self, Self::Untracked)
    }
}

impl Serialize for Stock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Untracked => serializer.serialize_none(),
            Self::Unlimited => serializer.serialize_i64(Self::UNLIMITED_SENTINEL),
            Self::Limited(n) => serializer.serialize_u32(*n),
        }
    }
}

impl<'de> Deserialize<'de> for Stock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<i64>::deserialize(deserializer)? {
            None => Ok(Self::Untracked),
            Some(Self::UNLIMITED_SENTINEL) => Ok(Self::Unlimited),
            Some(n) => u32::try_from(n).map(Self::Limited).map_err(|_| {
                serde::de::Error::custom(format!("stock must be -1 or a non-negative count, got {n}"))
            }),
        }
    }
}

// =============================================================================
// Variants
// =============================================================================

/// How a variant's values are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    /// `values` holds `hex:label` pairs rendered as swatches.
    Color,
    /// `values` holds plain labels.
    Text,
}

/// A selectable product attribute as authored in catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSpec {
    /// Attribute name, e.g. "Color" or "Size".
    pub name: String,
    /// Presentation kind.
    #[serde(rename = "type")]
    pub kind: VariantKind,
    /// Comma-separated option list.
    pub values: String,
}

/// One option parsed from a [`VariantSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantOption {
    /// Value stored in a cart selection.
    pub value: String,
    /// Human-readable label.
    pub label: String,
    /// Swatch color for color variants.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swatch: Option<String>,
}

impl VariantSpec {
    /// Parse the option list.
    ///
    /// Tokens are trimmed and empty tokens dropped. A color token is split at
    /// its first `:` into swatch and label; the label is the stored value.
    #[must_use]
    pub fn options(&self) -> Vec<VariantOption> {
        self.values
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| match self.kind {
                VariantKind::Color => {
                    let (swatch, label) = token
                        .split_once(':')
                        .map_or((token, token), |(hex, label)| (hex.trim(), label.trim()));
                    VariantOption {
                        value: label.to_owned(),
                        label: label.to_owned(),
                        swatch: Some(swatch.to_owned()),
                    }
                }
                VariantKind::Text => VariantOption {
                    value: token.to_owned(),
                    label: token.to_owned(),
                    swatch: None,
                },
            })
            .collect()
    }

    /// The value preselected when a shopper has not chosen one.
    #[must_use]
    pub fn default_value(&self) -> Option<String> {
        self.options().into_iter().next().map(|option| option.value)
    }

    /// Whether `value` is one of this spec's options.
    #[must_use]
    pub fn accepts(&self, value: &str) -> bool {
        self.options().iter().any(|option| option.value == value)
    }
}

// =============================================================================
// Products and categories
// =============================================================================

/// A product as supplied by catalog data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product id.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Category the product belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
    /// Image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Stock level.
    #[serde(default, skip_serializing_if = "Stock::is_untracked")]
    pub stock: Stock,
    /// Long description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Selectable attributes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<VariantSpec>,
    /// Units sold, used to rank landing-page picks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold: Option<u64>,
}

impl Product {
    /// Whether the product has a non-empty image URL.
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.image.as_deref().is_some_and(|url| !url.trim().is_empty())
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category id.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// Image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Category {
    /// Whether the category has a non-empty image URL.
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.image.as_deref().is_some_and(|url| !url.trim().is_empty())
    }
}

/// Unvalidated catalog data as it appears in files and editor payloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogData {
    /// Products in listing order.
    #[serde(default)]
    pub products: Vec<Product>,
    /// Categories in listing order.
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// A validated, read-only catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "CatalogData")]
pub struct CatalogSnapshot {
    products: Vec<Product>,
    categories: Vec<Category>,
    #[serde(skip)]
    index: HashMap<ProductId, usize>,
}

impl CatalogSnapshot {
    /// Build a snapshot, validating product and category data.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] found: duplicate ids, negative
    /// prices, variant specs without a name or options, or (when the catalog
    /// lists categories) products referencing an unknown category.
    pub fn new(products: Vec<Product>, categories: Vec<Category>) -> Result<Self, CatalogError> {
        let mut category_ids = HashSet::with_capacity(categories.len());
        for category in &categories {
            if !category_ids.insert(&category.id) {
                return Err(CatalogError::DuplicateCategory(category.id.clone()));
            }
        }

        let mut index = HashMap::with_capacity(products.len());
        for (position, product) in products.iter().enumerate() {
            if index.insert(product.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateProduct(product.id.clone()));
            }
            if product.price < Decimal::ZERO {
                return Err(CatalogError::NegativePrice(product.id.clone()));
            }
            if !categories.is_empty()
                && let Some(category) = &product.category
                && !category_ids.contains(category)
            {
                return Err(CatalogError::UnknownCategory {
                    product: product.id.clone(),
                    category: category.clone(),
                });
            }
            for spec in &product.variants {
                let reason = if spec.name.trim().is_empty() {
                    Some("name is empty")
                } else if spec.options().is_empty() {
                    Some("no options")
                } else {
                    None
                };
                if let Some(reason) = reason {
                    return Err(CatalogError::InvalidVariant {
                        product: product.id.clone(),
                        name: spec.name.clone(),
                        reason,
                    });
                }
            }
        }

        Ok(Self {
            products,
            categories,
            index,
        })
    }

    /// An empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look a product up by id.
    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.index.get(id).and_then(|&i| self.products.get(i))
    }

    /// Products in listing order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Categories in listing order.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Whether the catalog has no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl TryFrom<CatalogData> for CatalogSnapshot {
    type Error = CatalogError;

    fn try_from(data: CatalogData) -> Result<Self, Self::Error> {
        Self::new(data.products, data.categories)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: i64, price: i64) -> Product {
        Product {
            id: ProductId::from(id),
            name: format!("Product {id}"),
            price: Decimal::from(price),
            category: None,
            image: None,
            stock: Stock::Untracked,
            description: None,
            variants: Vec::new(),
            sold: None,
        }
    }

    #[test]
    fn test_stock_shapes_round_trip() {
        let json = r#"[
            {"id": 1, "name": "a", "price": 10},
            {"id": 2, "name": "b", "price": 10, "stock": -1},
            {"id": 3, "name": "c", "price": 10, "stock": 4}
        ]"#;
        let products: Vec<Product> = serde_json::from_str(json).unwrap();
        assert_eq!(products[0].stock, Stock::Untracked);
        assert_eq!(products[1].stock, Stock::Unlimited);
        assert_eq!(products[2].stock, Stock::Limited(4));

        let back = serde_json::to_value(&products).unwrap();
        assert!(back[0].get("stock").is_none());
        assert_eq!(back[1]["stock"], -1);
        assert_eq!(back[2]["stock"], 4);
    }

    #[test]
    fn test_stock_rejects_other_negatives() {
        let result = serde_json::from_str::<Product>(r#"{"id":1,"name":"a","price":1,"stock":-2}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_stock_ceiling() {
        assert!(Stock::Untracked.allows(u32::MAX));
        assert!(Stock::Unlimited.allows(u32::MAX));
        assert!(Stock::Limited(3).allows(3));
        assert!(!Stock::Limited(3).allows(4));
        assert!(Stock::Limited(0).is_out_of_stock());
    }

    #[test]
    fn test_color_options_split_swatch_and_label() {
        let spec = VariantSpec {
            name: "Color".to_string(),
            kind: VariantKind::Color,
            values: "#ff0000:Red, #0000ff:Blue,, plain".to_string(),
        };
        let options = spec.options();
        assert_eq!(options.len(), 3);
        assert_eq!(options[0].value, "Red");
        assert_eq!(options[0].swatch.as_deref(), Some("#ff0000"));
        assert_eq!(options[2].value, "plain");
        assert_eq!(spec.default_value().as_deref(), Some("Red"));
        assert!(spec.accepts("Blue"));
        assert!(!spec.accepts("#0000ff"));
    }

    #[test]
    fn test_text_options() {
        let spec = VariantSpec {
            name: "Size".to_string(),
            kind: VariantKind::Text,
            values: "S,M , L".to_string(),
        };
        let values: Vec<String> = spec.options().into_iter().map(|o| o.value).collect();
        assert_eq!(values, vec!["S", "M", "L"]);
    }

    #[test]
    fn test_snapshot_rejects_duplicates() {
        let result = CatalogSnapshot::new(vec![product(1, 5), product(1, 6)], Vec::new());
        assert_eq!(
            result.unwrap_err(),
            CatalogError::DuplicateProduct(ProductId::from(1))
        );
    }

    #[test]
    fn test_snapshot_rejects_negative_price() {
        let result = CatalogSnapshot::new(vec![product(1, -5)], Vec::new());
        assert!(matches!(result, Err(CatalogError::NegativePrice(_))));
    }

    #[test]
    fn test_snapshot_checks_categories_when_listed() {
        let mut p = product(1, 5);
        p.category = Some(CategoryId::from(9));

        assert!(CatalogSnapshot::new(vec![p.clone()], Vec::new()).is_ok());

        let categories = vec![Category {
            id: CategoryId::from(1),
            name: "Shoes".to_string(),
            image: None,
        }];
        assert!(matches!(
            CatalogSnapshot::new(vec![p], categories),
            Err(CatalogError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_snapshot_rejects_empty_variant_spec() {
        let mut p = product(1, 5);
        p.variants.push(VariantSpec {
            name: "Size".to_string(),
            kind: VariantKind::Text,
            values: " , ".to_string(),
        });
        assert!(matches!(
            CatalogSnapshot::new(vec![p], Vec::new()),
            Err(CatalogError::InvalidVariant { reason: "no options", .. })
        ));
    }

    #[test]
    fn test_snapshot_deserializes_and_indexes() {
        let snapshot: CatalogSnapshot = serde_json::from_str(
            r#"{"products":[{"id":"tee","name":"Tee","price":499.5}],"categories":[]}"#,
        )
        .unwrap();
        let tee = snapshot.product(&ProductId::from("tee")).unwrap();
        assert_eq!(tee.price, Decimal::new(4995, 1));
        assert!(snapshot.product(&ProductId::from(1)).is_none());
    }

    #[test]
    fn test_snapshot_deserializes_from_yaml() {
        let yaml = "products:\n  - id: 1\n    name: Mug\n    price: 250\n    stock: 3\n";
        let snapshot: CatalogSnapshot = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            snapshot.product(&ProductId::from(1)).unwrap().stock,
            Stock::Limited(3)
        );
    }
}
