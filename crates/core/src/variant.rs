//! Variant selections and their canonical signature.
//!
//! A cart line is identified by its product id plus the signature of the
//! chosen variants, so "Tee / Red" and "Tee / Blue" are separate lines.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Product;
use crate::types::ProductId;

/// A selection that does not fit the product's variant specs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// The product has no variant with this name.
    #[error("product {product} has no variant named {name:?}")]
    UnknownVariant {
        /// Product the selection was made for.
        product: ProductId,
        /// Unknown variant name.
        name: String,
    },
    /// The value is not one of the variant's options.
    #[error("{value:?} is not an option of {name:?} on product {product}")]
    UnknownOption {
        /// Product the selection was made for.
        product: ProductId,
        /// Variant name.
        name: String,
        /// Rejected value.
        value: String,
    },
}

/// Mapping of variant name to chosen value, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantSelection(BTreeMap<String, String>);

impl VariantSelection {
    /// An empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variant value, returning the selection for chaining.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Chosen value for a variant.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Canonical serialization used as part of a cart line's identity.
    ///
    /// Compact JSON of the name-ordered map; the empty selection has the empty
    /// signature.
    #[must_use]
    pub fn signature(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    /// The selection made when a shopper does not choose: each variant's first
    /// option.
    #[must_use]
    pub fn defaults_for(product: &Product) -> Self {
        Self(
            product
                .variants
                .iter()
                .filter_map(|spec| spec.default_value().map(|value| (spec.name.clone(), value)))
                .collect(),
        )
    }

    /// Complete a (possibly partial) selection for `product`.
    ///
    /// Missing variants fall back to their default option. Every supplied
    /// entry must name one of the product's variants and one of its options.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectionError`] for an unknown variant name or option.
    pub fn resolve(product: &Product, chosen: Option<Self>) -> Result<Self, SelectionError> {
        let mut resolved = Self::defaults_for(product);
        let Some(chosen) = chosen else {
            return Ok(resolved);
        };

        for (name, value) in chosen.0 {
            let spec = product
                .variants
                .iter()
                .find(|spec| spec.name == name)
                .ok_or_else(|| SelectionError::UnknownVariant {
                    product: product.id.clone(),
                    name: name.clone(),
                })?;
            if !spec.accepts(&value) {
                return Err(SelectionError::UnknownOption {
                    product: product.id.clone(),
                    name,
                    value,
                });
            }
            resolved.0.insert(name, value);
        }

        Ok(resolved)
    }
}

impl FromIterator<(String, String)> for VariantSelection {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::catalog::{Stock, VariantKind, VariantSpec};

    fn tee() -> Product {
        Product {
            id: ProductId::from(7),
            name: "Tee".to_string(),
            price: Decimal::from(499),
            category: None,
            image: None,
            stock: Stock::Untracked,
            description: None,
            variants: vec![
                VariantSpec {
                    name: "Color".to_string(),
                    kind: VariantKind::Color,
                    values: "#f00:Red,#00f:Blue".to_string(),
                },
                VariantSpec {
                    name: "Size".to_string(),
                    kind: VariantKind::Text,
                    values: "S,M,L".to_string(),
                },
            ],
            sold: None,
        }
    }

    #[test]
    fn test_empty_signature() {
        assert_eq!(VariantSelection::new().signature(), "");
    }

    #[test]
    fn test_signature_is_order_independent() {
        let a = VariantSelection::new().with("Size", "M").with("Color", "Red");
        let b = VariantSelection::new().with("Color", "Red").with("Size", "M");
        assert_eq!(a.signature(), b.signature());
        assert_eq!(a.signature(), r#"{"Color":"Red","Size":"M"}"#);
    }

    #[test]
    fn test_defaults_pick_first_option() {
        let defaults = VariantSelection::defaults_for(&tee());
        assert_eq!(defaults.get("Color"), Some("Red"));
        assert_eq!(defaults.get("Size"), Some("S"));
    }

    #[test]
    fn test_resolve_fills_missing_from_defaults() {
        let chosen = VariantSelection::new().with("Size", "L");
        let resolved = VariantSelection::resolve(&tee(), Some(chosen)).unwrap();
        assert_eq!(resolved.get("Color"), Some("Red"));
        assert_eq!(resolved.get("Size"), Some("L"));
    }

    #[test]
    fn test_resolve_rejects_unknown_entries() {
        let unknown_name = VariantSelection::new().with("Fabric", "Silk");
        assert!(matches!(
            VariantSelection::resolve(&tee(), Some(unknown_name)),
            Err(SelectionError::UnknownVariant { .. })
        ));

        let unknown_value = VariantSelection::new().with("Size", "XXL");
        assert!(matches!(
            VariantSelection::resolve(&tee(), Some(unknown_value)),
            Err(SelectionError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_resolve_plain_product() {
        let mut plain = tee();
        plain.variants.clear();
        assert!(VariantSelection::resolve(&plain, None).unwrap().is_empty());
        assert!(VariantSelection::resolve(&plain, Some(VariantSelection::new())).unwrap().is_empty());
    }
}
