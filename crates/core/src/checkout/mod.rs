//! Checkout form, validation and the order-submission contract.
//!
//! The form is validated synchronously into a field → message map. A valid
//! form is normalized into [`CustomerDetails`] and sent, together with the
//! enriched cart lines and total, to an [`OrderSubmitter`]. The state machine
//! around a submission lives in [`CheckoutController`].

mod controller;

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use controller::{CheckoutController, CheckoutPhase, FormMessage, MessageKind};

use crate::cart::CartLineDetail;
use crate::template::{ContactField, StorageScope, StorefrontTemplate};
use crate::types::{Email, ProductId, SiteSlug};

/// Shown when validation blocks a submission.
pub const MSG_FIX_ERRORS: &str = "Please fix the errors in the form";
/// Shown when a preview session tries to order.
pub const MSG_PREVIEW_MODE: &str = "Cannot place real orders in preview mode";
/// Shown when the cart has nothing to order.
pub const MSG_EMPTY_CART: &str = "Your cart is empty";
/// Shown after the backend accepts an order.
pub const MSG_ORDER_PLACED: &str = "Order placed successfully!";
/// Shown on transport failures and timeouts.
pub const MSG_UNEXPECTED_FAILURE: &str =
    "Something went wrong while placing your order. Please try again.";

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{10}$").expect("Invalid regex"));
static PIN_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6}$").expect("Invalid regex"));

// =============================================================================
// Form
// =============================================================================

/// A checkout form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckoutField {
    FirstName,
    LastName,
    Email,
    Phone,
    Address,
    City,
    State,
    ZipCode,
    Note,
}

impl CheckoutField {
    /// Label used in validation messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FirstName => "First name",
            Self::LastName => "Last name",
            Self::Email => "Email",
            Self::Phone => "Phone number",
            Self::Address => "Address",
            Self::City => "City",
            Self::State => "State",
            Self::ZipCode => "PIN code",
            Self::Note => "Note",
        }
    }

    /// Fields a template's form requires, in display order.
    #[must_use]
    pub fn required_for(template: StorefrontTemplate) -> Vec<Self> {
        let contact = match template.contact_field() {
            ContactField::Phone => Self::Phone,
            ContactField::Email => Self::Email,
        };
        vec![
            Self::FirstName,
            Self::LastName,
            contact,
            Self::Address,
            Self::City,
            Self::State,
            Self::ZipCode,
        ]
    }
}

/// Field → message for every violated constraint.
pub type FieldErrors = BTreeMap<CheckoutField, String>;

/// Raw checkout form values as typed by the shopper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub note: String,
}

impl CheckoutForm {
    /// Current value of a field.
    #[must_use]
    pub fn get(&self, field: CheckoutField) -> &str {
        match field {
            CheckoutField::FirstName => &self.first_name,
            CheckoutField::LastName => &self.last_name,
            CheckoutField::Email => &self.email,
            CheckoutField::Phone => &self.phone,
            CheckoutField::Address => &self.address,
            CheckoutField::City => &self.city,
            CheckoutField::State => &self.state,
            CheckoutField::ZipCode => &self.zip_code,
            CheckoutField::Note => &self.note,
        }
    }

    /// Replace a field's value.
    pub fn set(&mut self, field: CheckoutField, value: String) {
        let slot = match field {
            CheckoutField::FirstName => &mut self.first_name,
            CheckoutField::LastName => &mut self.last_name,
            CheckoutField::Email => &mut self.email,
            CheckoutField::Phone => &mut self.phone,
            CheckoutField::Address => &mut self.address,
            CheckoutField::City => &mut self.city,
            CheckoutField::State => &mut self.state,
            CheckoutField::ZipCode => &mut self.zip_code,
            CheckoutField::Note => &mut self.note,
        };
        *slot = value;
    }
}

/// Validate a form for a template.
///
/// Reports every violation rather than stopping at the first. The result is
/// empty iff the form is valid.
#[must_use]
pub fn validate_form(form: &CheckoutForm, template: StorefrontTemplate) -> FieldErrors {
    let mut errors = FieldErrors::new();

    for field in CheckoutField::required_for(template) {
        let value = form.get(field).trim();
        if value.is_empty() {
            errors.insert(field, format!("{} is required", field.label()));
            continue;
        }
        let format_error = match field {
            CheckoutField::Phone if !PHONE_RE.is_match(value) => {
                Some("Phone number must be exactly 10 digits")
            }
            CheckoutField::ZipCode if !PIN_CODE_RE.is_match(value) => {
                Some("PIN code must be exactly 6 digits")
            }
            CheckoutField::Email if Email::parse(value).is_err() => {
                Some("Please enter a valid email address")
            }
            _ => None,
        };
        if let Some(message) = format_error {
            errors.insert(field, message.to_owned());
        }
    }

    errors
}

// =============================================================================
// Order contract
// =============================================================================

/// Normalized customer details sent with an order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CustomerDetails {
    /// Trim every field and keep only the template's contact field.
    ///
    /// An empty note is dropped.
    #[must_use]
    pub fn from_form(form: &CheckoutForm, template: StorefrontTemplate) -> Self {
        let trimmed = |value: &str| value.trim().to_owned();
        let note = form.note.trim();
        let (email, phone) = match template.contact_field() {
            ContactField::Email => (Some(trimmed(&form.email)), None),
            ContactField::Phone => (None, Some(trimmed(&form.phone))),
        };
        Self {
            first_name: trimmed(&form.first_name),
            last_name: trimmed(&form.last_name),
            email,
            phone,
            address: trimmed(&form.address),
            city: trimmed(&form.city),
            state: trimmed(&form.state),
            zip_code: trimmed(&form.zip_code),
            note: (!note.is_empty()).then(|| note.to_owned()),
        }
    }
}

/// Payload sent to the order service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub site_slug: Option<SiteSlug>,
    pub cart_details: Vec<CartLineDetail>,
    pub customer_details: CustomerDetails,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

/// Body returned by the order service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl OrderResponse {
    /// Interpret the response body.
    #[must_use]
    pub fn into_outcome(self) -> OrderOutcome {
        if self.success {
            OrderOutcome::Placed {
                order_id: self.order_id,
            }
        } else {
            OrderOutcome::Rejected(self.error.unwrap_or_else(|| "Unknown error".to_owned()))
        }
    }
}

/// What the order service decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    /// The order was created.
    Placed { order_id: Option<String> },
    /// The service refused the order with a reason.
    Rejected(String),
}

/// The order service could not be reached or answered nonsense.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("order service request failed: {0}")]
    Transport(String),

    #[error("order service did not respond within {0:?}")]
    Timeout(Duration),

    #[error("unreadable order service response: {0}")]
    Decode(String),
}

impl SubmitError {
    /// Whether trying again may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

/// Sends orders to the backend.
#[async_trait]
pub trait OrderSubmitter: Send + Sync {
    /// Submit one order.
    ///
    /// # Errors
    ///
    /// Returns a [`SubmitError`] when no usable answer was received.
    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderOutcome, SubmitError>;
}

/// Resolves which tenant a storefront session belongs to.
pub trait TenantContext {
    /// The tenant's site slug; `None` in preview mode.
    fn site_slug(&self) -> Option<&SiteSlug>;
}

impl TenantContext for StorageScope {
    fn site_slug(&self) -> Option<&SiteSlug> {
        self.tenant()
    }
}

impl TenantContext for Option<SiteSlug> {
    fn site_slug(&self) -> Option<&SiteSlug> {
        self.as_ref()
    }
}

/// Why a checkout step was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Please fix the errors in the form")]
    Invalid(FieldErrors),

    #[error("Cannot place real orders in preview mode")]
    PreviewMode,

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Only {available} of product {product} left in stock")]
    StockExceeded {
        product: ProductId,
        requested: u32,
        available: u32,
    },

    #[error("an order is already being submitted")]
    AlreadySubmitting,

    #[error("no order is being submitted")]
    NotSubmitting,

    #[error("Order failed: {0}")]
    Rejected(String),

    #[error(transparent)]
    Submission(#[from] SubmitError),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_form() -> CheckoutForm {
        CheckoutForm {
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: "9876543210".to_string(),
            address: "12 MG Road".to_string(),
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            zip_code: "411001".to_string(),
            note: String::new(),
        }
    }

    #[test]
    fn test_valid_form_has_no_errors() {
        assert!(validate_form(&valid_form(), StorefrontTemplate::Aurora).is_empty());
        assert!(validate_form(&valid_form(), StorefrontTemplate::Blissly).is_empty());
    }

    #[test]
    fn test_empty_form_reports_every_required_field() {
        let errors = validate_form(&CheckoutForm::default(), StorefrontTemplate::Flara);
        assert_eq!(errors.len(), 7);
        assert_eq!(errors[&CheckoutField::FirstName], "First name is required");
        assert!(errors.contains_key(&CheckoutField::Phone));
        assert!(!errors.contains_key(&CheckoutField::Email));
        assert!(!errors.contains_key(&CheckoutField::Note));
    }

    #[test]
    fn test_blissly_requires_email_not_phone() {
        let errors = validate_form(&CheckoutForm::default(), StorefrontTemplate::Blissly);
        assert!(errors.contains_key(&CheckoutField::Email));
        assert!(!errors.contains_key(&CheckoutField::Phone));
    }

    #[test]
    fn test_short_phone() {
        let form = CheckoutForm {
            phone: "12345".to_string(),
            ..valid_form()
        };
        let errors = validate_form(&form, StorefrontTemplate::Aurora);
        assert_eq!(
            errors.get(&CheckoutField::Phone).map(String::as_str),
            Some("Phone number must be exactly 10 digits")
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_pin_code_and_email_formats() {
        let form = CheckoutForm {
            zip_code: "41100".to_string(),
            email: "not-an-email".to_string(),
            ..valid_form()
        };
        let errors = validate_form(&form, StorefrontTemplate::Blissly);
        assert_eq!(
            errors[&CheckoutField::ZipCode],
            "PIN code must be exactly 6 digits"
        );
        assert_eq!(
            errors[&CheckoutField::Email],
            "Please enter a valid email address"
        );
    }

    #[test]
    fn test_padded_values_validate_after_trim() {
        let form = CheckoutForm {
            phone: " 9876543210 ".to_string(),
            zip_code: "411001\n".to_string(),
            ..valid_form()
        };
        assert!(validate_form(&form, StorefrontTemplate::Aurora).is_empty());
    }

    #[test]
    fn test_customer_details_are_normalized() {
        let form = CheckoutForm {
            first_name: "  Asha ".to_string(),
            note: "   ".to_string(),
            ..valid_form()
        };
        let details = CustomerDetails::from_form(&form, StorefrontTemplate::Aurora);
        assert_eq!(details.first_name, "Asha");
        assert_eq!(details.note, None);
        assert_eq!(details.email, None);
        assert_eq!(details.phone.as_deref(), Some("9876543210"));

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["zipCode"], "411001");
        assert!(json.get("note").is_none());
    }

    #[test]
    fn test_response_outcomes() {
        let rejected: OrderResponse =
            serde_json::from_str(r#"{"success":false,"error":"Out of stock"}"#).unwrap();
        assert_eq!(
            rejected.into_outcome(),
            OrderOutcome::Rejected("Out of stock".to_string())
        );

        let placed: OrderResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert_eq!(placed.into_outcome(), OrderOutcome::Placed { order_id: None });
    }

    #[test]
    fn test_retryable_errors() {
        assert!(SubmitError::Timeout(Duration::from_secs(10)).is_retryable());
        assert!(SubmitError::Transport("reset".to_string()).is_retryable());
        assert!(!SubmitError::Decode("eof".to_string()).is_retryable());
    }
}
