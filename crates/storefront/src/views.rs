//! JSON views returned by the storefront routes.

use bizvistar_core::CurrencyCode;
use bizvistar_core::cart::{CartLineDetail, CartNotice, CartStore, DerivedTotals};
use bizvistar_core::checkout::{
    CheckoutController, CheckoutField, CheckoutForm, CheckoutPhase, FieldErrors, FormMessage,
};
use bizvistar_core::storage::Storage;
use bizvistar_core::template::{ContactField, StorefrontTemplate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The cart as a page renders it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub template: StorefrontTemplate,
    pub currency: CurrencyCode,
    /// Resolvable lines joined with their products.
    pub items: Vec<CartLineDetail>,
    /// Total units across all lines.
    pub count: u64,
    #[serde(flatten)]
    pub totals: DerivedTotals,
    pub is_open: bool,
    /// The "item added" notice while it is still visible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<CartNotice>,
}

impl CartView {
    /// Snapshot a cart at `now`.
    #[must_use]
    pub fn new<S: Storage>(cart: &CartStore<S>, now: DateTime<Utc>) -> Self {
        let items = cart.details();
        let totals = DerivedTotals::compute(&items, cart.template());
        Self {
            template: cart.template(),
            currency: cart.template().currency(),
            items,
            count: cart.count(),
            totals,
            is_open: cart.is_open(),
            notice: cart.active_notice(now).cloned(),
        }
    }
}

/// The checkout form as a page renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutView {
    pub template: StorefrontTemplate,
    /// Which contact field the template asks for.
    pub contact_field: ContactField,
    pub required_fields: Vec<CheckoutField>,
    pub form: CheckoutForm,
    pub errors: FieldErrors,
    pub phase: CheckoutPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<FormMessage>,
    pub is_submitting: bool,
}

impl From<&CheckoutController> for CheckoutView {
    fn from(checkout: &CheckoutController) -> Self {
        let template = checkout.template();
        Self {
            template,
            contact_field: template.contact_field(),
            required_fields: CheckoutField::required_for(template),
            form: checkout.form().clone(),
            errors: checkout.errors().clone(),
            phase: checkout.phase(),
            message: checkout.message().cloned(),
            is_submitting: checkout.is_submitting(),
        }
    }
}
