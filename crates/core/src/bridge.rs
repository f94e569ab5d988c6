//! Typed messages between the visual editor and a storefront preview.
//!
//! The editor and the storefront talk over a single channel carrying a closed
//! set of message kinds. `UPDATE_DATA` carries the shop owner's business data,
//! whose products and categories replace the template's bundled catalog.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::{CatalogData, CatalogError, CatalogSnapshot, Category, Product};
use crate::template::StorefrontTemplate;
use crate::types::SiteSlug;

/// Business data pushed by the editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessData {
    /// Replacement product list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<Product>>,
    /// Replacement category list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,
    /// Everything else the editor sends (hero copy, contact details, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BusinessData {
    /// The catalog this data overrides, if it carries products.
    ///
    /// Returns `None` when the payload has no product list.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] when the supplied catalog is invalid.
    pub fn catalog_override(&self) -> Option<Result<CatalogSnapshot, CatalogError>> {
        let products = self.products.clone()?;
        Some(CatalogSnapshot::try_from(CatalogData {
            products,
            categories: self.categories.clone().unwrap_or_default(),
        }))
    }
}

/// Payload of `SCROLL_TO_SECTION`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollTarget {
    pub section: String,
}

/// A message on the editor bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EditorMessage {
    /// The editor pushed new business data.
    UpdateData { payload: BusinessData },
    /// The preview frame finished loading.
    IframeReady,
    /// The editor wants the preview scrolled to a section.
    ScrollToSection { payload: ScrollTarget },
}

/// A message addressed to one tenant's storefront.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeEnvelope {
    pub site: SiteSlug,
    /// `None` addresses every template of the site.
    pub template: Option<StorefrontTemplate>,
    pub message: EditorMessage,
}

/// A single dispatch/subscribe pair for editor messages.
pub trait MessageChannel: Send + Sync {
    /// Receiving end handed to subscribers.
    type Subscription;

    /// Publish a message to every subscriber. Returns how many received it.
    fn dispatch(&self, envelope: BridgeEnvelope) -> usize;

    /// Start receiving messages.
    fn subscribe(&self) -> Self::Subscription;
}
