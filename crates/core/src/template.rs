//! Storefront templates and the policies that vary between them.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CurrencyCode, SiteSlug};

/// The template slug did not name a known template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown storefront template {0:?}")]
pub struct UnknownTemplate(pub String);

/// Which contact detail a template's checkout collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    /// 10-digit phone number.
    Phone,
    /// Email address.
    Email,
}

/// A prebuilt storefront template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorefrontTemplate {
    Aurora,
    Avenix,
    Flara,
    Blissly,
    Frostify,
}

impl StorefrontTemplate {
    /// Every template, in catalog order.
    pub const ALL: [Self; 5] = [
        Self::Aurora,
        Self::Avenix,
        Self::Flara,
        Self::Blissly,
        Self::Frostify,
    ];

    /// Lowercase slug used in URLs and catalog file names.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Aurora => "aurora",
            Self::Avenix => "avenix",
            Self::Flara => "flara",
            Self::Blissly => "blissly",
            Self::Frostify => "frostify",
        }
    }

    /// Name the cart is stored under, e.g. `flaraCart`.
    #[must_use]
    pub const fn cart_storage_name(self) -> &'static str {
        match self {
            Self::Aurora => "auroraCart",
            Self::Avenix => "avenixCart",
            Self::Flara => "flaraCart",
            Self::Blissly => "blisslyCart",
            Self::Frostify => "frostifyCart",
        }
    }

    /// Flat shipping fee charged on a non-empty order.
    #[must_use]
    pub fn shipping_fee(self) -> Decimal {
        match self {
            Self::Aurora | Self::Avenix | Self::Blissly => Decimal::ZERO,
            Self::Flara => Decimal::from(49),
            Self::Frostify => Decimal::from(99),
        }
    }

    /// Contact detail the checkout form requires.
    #[must_use]
    pub const fn contact_field(self) -> ContactField {
        match self {
            Self::Blissly => ContactField::Email,
            Self::Aurora | Self::Avenix | Self::Flara | Self::Frostify => ContactField::Phone,
        }
    }

    /// Currency prices are shown in.
    #[must_use]
    pub const fn currency(self) -> CurrencyCode {
        CurrencyCode::INR
    }
}

impl fmt::Display for StorefrontTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for StorefrontTemplate {
    type Err = UnknownTemplate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|template| template.slug().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTemplate(s.to_owned()))
    }
}

/// Storage keys for one `(tenant, template)` pair.
///
/// Keys are scoped by tenant so two shops built on the same template never
/// share a cart. Preview sessions (no tenant) use the `preview` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageScope {
    tenant: Option<SiteSlug>,
    template: StorefrontTemplate,
}

impl StorageScope {
    /// Prefix used when there is no tenant.
    pub const PREVIEW_PREFIX: &'static str = "preview";

    /// Create a scope.
    #[must_use]
    pub const fn new(tenant: Option<SiteSlug>, template: StorefrontTemplate) -> Self {
        Self { tenant, template }
    }

    /// The tenant, if this is a published site.
    #[must_use]
    pub const fn tenant(&self) -> Option<&SiteSlug> {
        self.tenant.as_ref()
    }

    /// The template.
    #[must_use]
    pub const fn template(&self) -> StorefrontTemplate {
        self.template
    }

    fn prefix(&self) -> &str {
        self.tenant
            .as_ref()
            .map_or(Self::PREVIEW_PREFIX, SiteSlug::as_str)
    }

    /// Key the cart is persisted under, e.g. `acme:flaraCart`.
    #[must_use]
    pub fn cart_key(&self) -> String {
        format!("{}:{}", self.prefix(), self.template.cart_storage_name())
    }

    /// Key the checkout state is persisted under.
    #[must_use]
    pub fn checkout_key(&self) -> String {
        format!("{}:{}Checkout", self.prefix(), self.template.slug())
    }

    /// Key the cart drawer state is persisted under.
    #[must_use]
    pub fn cart_ui_key(&self) -> String {
        format!("{}:{}CartUi", self.prefix(), self.template.slug())
    }
}
