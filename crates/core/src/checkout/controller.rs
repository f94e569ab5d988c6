//! Checkout state machine.
//!
//! ```text
//! Editing ──submit──▶ Validating ──ok──▶ Submitting ──placed──▶ Succeeded
//!    ▲                    │                   │
//!    ├──── invalid ───────┘                   │
//!    └──────────── rejected/error ────────────┘
//! ```
//!
//! A failed order leaves the controller `Editing` with an error message set.
//! A submission is split into [`CheckoutController::begin_submit`] and
//! [`CheckoutController::finish_submit`] so callers can persist the
//! `Submitting` phase before awaiting the order service.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{
    CheckoutError, CheckoutField, CheckoutForm, CustomerDetails, FieldErrors, MSG_EMPTY_CART,
    MSG_FIX_ERRORS, MSG_ORDER_PLACED, MSG_PREVIEW_MODE, MSG_UNEXPECTED_FAILURE, OrderOutcome,
    OrderRequest, OrderSubmitter, SubmitError, TenantContext, validate_form,
};
use crate::cart::CartStore;
use crate::storage::Storage;
use crate::template::StorefrontTemplate;

/// Where the checkout is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckoutPhase {
    #[default]
    Editing,
    Validating,
    Submitting,
    Succeeded,
}

/// Tone of a form-level message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    Success,
    Error,
}

/// A form-level message shown above the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl FormMessage {
    fn success(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Success,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }
}

/// Checkout form state for one storefront scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutController {
    template: StorefrontTemplate,
    form: CheckoutForm,
    #[serde(default)]
    errors: FieldErrors,
    #[serde(default)]
    phase: CheckoutPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<FormMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    submitting_since: Option<DateTime<Utc>>,
}

impl CheckoutController {
    /// A blank form for a template.
    #[must_use]
    pub fn new(template: StorefrontTemplate) -> Self {
        Self {
            template,
            form: CheckoutForm::default(),
            errors: FieldErrors::new(),
            phase: CheckoutPhase::Editing,
            message: None,
            submitting_since: None,
        }
    }

    #[must_use]
    pub const fn template(&self) -> StorefrontTemplate {
        self.template
    }

    #[must_use]
    pub const fn form(&self) -> &CheckoutForm {
        &self.form
    }

    #[must_use]
    pub const fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    #[must_use]
    pub const fn phase(&self) -> CheckoutPhase {
        self.phase
    }

    #[must_use]
    pub const fn message(&self) -> Option<&FormMessage> {
        self.message.as_ref()
    }

    /// Whether an order is in flight.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.phase == CheckoutPhase::Submitting
    }

    /// Update a field and clear its error.
    pub fn handle_change(&mut self, field: CheckoutField, value: impl Into<String>) {
        self.form.set(field, value.into());
        self.errors.remove(&field);
        if self.phase == CheckoutPhase::Succeeded {
            self.phase = CheckoutPhase::Editing;
        }
    }

    /// Validate the form, recording and returning the field errors.
    pub fn validate(&mut self) -> FieldErrors {
        self.errors = validate_form(&self.form, self.template);
        self.errors.clone()
    }

    /// Validate, check the session can order and build the order payload.
    ///
    /// On success the controller is `Submitting` and the caller must send the
    /// returned request and pass the result to [`Self::finish_submit`].
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::AlreadySubmitting`] while another submission is in flight
    /// - [`CheckoutError::Invalid`] when the form has errors
    /// - [`CheckoutError::PreviewMode`] when there is no tenant
    /// - [`CheckoutError::EmptyCart`] when nothing resolvable is in the cart
    /// - [`CheckoutError::StockExceeded`] when a line holds more than is in stock
    pub fn begin_submit<S: Storage>(
        &mut self,
        cart: &CartStore<S>,
        tenant: &dyn TenantContext,
    ) -> Result<OrderRequest, CheckoutError> {
        if self.is_submitting() {
            return Err(CheckoutError::AlreadySubmitting);
        }

        self.phase = CheckoutPhase::Validating;
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(self.refuse(MSG_FIX_ERRORS, CheckoutError::Invalid(errors)));
        }

        let Some(site_slug) = tenant.site_slug() else {
            return Err(self.refuse(MSG_PREVIEW_MODE, CheckoutError::PreviewMode));
        };

        let cart_details = cart.details();
        if cart_details.is_empty() {
            return Err(self.refuse(MSG_EMPTY_CART, CheckoutError::EmptyCart));
        }

        if let Some(line) = cart_details
            .iter()
            .find(|line| !line.product.stock.allows(line.quantity))
        {
            let available = line.product.stock.ceiling().unwrap_or_default();
            return Err(self.refuse(
                &format!("Only {available} of {} left in stock", line.product.name),
                CheckoutError::StockExceeded {
                    product: line.product.id.clone(),
                    requested: line.quantity,
                    available,
                },
            ));
        }

        let request = OrderRequest {
            site_slug: Some(site_slug.clone()),
            customer_details: CustomerDetails::from_form(&self.form, self.template),
            total_amount: cart.totals().total,
            cart_details,
        };

        self.phase = CheckoutPhase::Submitting;
        self.message = None;
        self.submitting_since = Some(Utc::now());
        Ok(request)
    }

    /// Apply the order service's answer.
    ///
    /// A placed order clears the cart. Any failure keeps both the cart and
    /// the form.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::NotSubmitting`] when no submission was begun
    /// - [`CheckoutError::Rejected`] when the service refused the order
    /// - [`CheckoutError::Submission`] on transport failures and timeouts
    pub fn finish_submit<S: Storage>(
        &mut self,
        cart: &mut CartStore<S>,
        result: Result<OrderOutcome, SubmitError>,
    ) -> Result<OrderOutcome, CheckoutError> {
        if !self.is_submitting() {
            return Err(CheckoutError::NotSubmitting);
        }
        self.submitting_since = None;

        match result {
            Ok(OrderOutcome::Placed { order_id }) => {
                info!(order_id = ?order_id, template = %self.template, "Order placed");
                cart.clear_cart();
                self.phase = CheckoutPhase::Succeeded;
                self.message = Some(FormMessage::success(MSG_ORDER_PLACED));
                Ok(OrderOutcome::Placed { order_id })
            }
            Ok(OrderOutcome::Rejected(reason)) => {
                warn!(reason = %reason, template = %self.template, "Order rejected");
                self.phase = CheckoutPhase::Editing;
                self.message = Some(FormMessage::error(format!("Order failed: {reason}")));
                Err(CheckoutError::Rejected(reason))
            }
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "Order submission failed");
                self.phase = CheckoutPhase::Editing;
                self.message = Some(FormMessage::error(MSG_UNEXPECTED_FAILURE));
                Err(CheckoutError::Submission(e))
            }
        }
    }

    /// Validate, submit and apply the answer in one call.
    ///
    /// # Errors
    ///
    /// Any error of [`Self::begin_submit`] or [`Self::finish_submit`].
    pub async fn submit<S: Storage>(
        &mut self,
        cart: &mut CartStore<S>,
        tenant: &dyn TenantContext,
        submitter: &dyn OrderSubmitter,
    ) -> Result<OrderOutcome, CheckoutError> {
        let request = self.begin_submit(cart, tenant)?;
        let result = submitter.submit_order(&request).await;
        self.finish_submit(cart, result)
    }

    /// Give up on a submission that has been in flight longer than `max_age`.
    ///
    /// Covers requests that died without reporting back. Returns whether the
    /// controller was reset.
    pub fn abandon_stale(&mut self, now: DateTime<Utc>, max_age: Duration) -> bool {
        let stale = self.is_submitting()
            && self
                .submitting_since
                .is_none_or(|since| now.signed_duration_since(since) > max_age);
        if stale {
            warn!(template = %self.template, "Abandoning stale order submission");
            self.phase = CheckoutPhase::Editing;
            self.submitting_since = None;
            self.message = Some(FormMessage::error(MSG_UNEXPECTED_FAILURE));
        }
        stale
    }

    fn refuse(&mut self, message: &str, error: CheckoutError) -> CheckoutError {
        self.phase = CheckoutPhase::Editing;
        self.message = Some(FormMessage::error(message));
        error
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::cart::CartLine;
    use crate::catalog::{CatalogSnapshot, Product, Stock};
    use crate::storage::MemoryStorage;
    use crate::template::StorageScope;
    use crate::types::{ProductId, SiteSlug};
    use crate::variant::VariantSelection;

    struct ScriptedSubmitter {
        result: Result<OrderOutcome, SubmitError>,
        received: Mutex<Vec<OrderRequest>>,
    }

    impl ScriptedSubmitter {
        fn new(result: Result<OrderOutcome, SubmitError>) -> Self {
            Self {
                result,
                received: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.received.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl OrderSubmitter for ScriptedSubmitter {
        async fn submit_order(&self, order: &OrderRequest) -> Result<OrderOutcome, SubmitError> {
            self.received.lock().unwrap().push(order.clone());
            self.result.clone()
        }
    }

    fn scope(tenant: Option<&str>) -> StorageScope {
        StorageScope::new(
            tenant.map(|slug| SiteSlug::parse(slug).unwrap()),
            StorefrontTemplate::Flara,
        )
    }

    fn candles() -> Arc<CatalogSnapshot> {
        let product = Product {
            id: ProductId::from(1),
            name: "Candle".to_string(),
            price: Decimal::from(10),
            category: None,
            image: None,
            stock: Stock::Limited(5),
            description: None,
            variants: Vec::new(),
            sold: None,
        };
        Arc::new(CatalogSnapshot::new(vec![product], Vec::new()).unwrap())
    }

    fn cart(scope: StorageScope) -> CartStore<MemoryStorage> {
        let mut cart = CartStore::load(candles(), scope, MemoryStorage::new());
        cart.add_to_cart(&ProductId::from(1), 2, None).unwrap();
        cart
    }

    fn filled() -> CheckoutController {
        let mut checkout = CheckoutController::new(StorefrontTemplate::Flara);
        checkout.handle_change(CheckoutField::FirstName, "Asha");
        checkout.handle_change(CheckoutField::LastName, "Rao");
        checkout.handle_change(CheckoutField::Phone, "9876543210");
        checkout.handle_change(CheckoutField::Address, "12 MG Road");
        checkout.handle_change(CheckoutField::City, "Pune");
        checkout.handle_change(CheckoutField::State, "Maharashtra");
        checkout.handle_change(CheckoutField::ZipCode, "411001");
        checkout.handle_change(CheckoutField::Note, "  ");
        checkout
    }

    #[tokio::test]
    async fn test_successful_order_clears_cart() {
        let scope = scope(Some("acme"));
        let mut cart = cart(scope.clone());
        let mut checkout = filled();
        let submitter = ScriptedSubmitter::new(Ok(OrderOutcome::Placed {
            order_id: Some("ord_1".to_string()),
        }));

        checkout.submit(&mut cart, &scope, &submitter).await.unwrap();

        assert!(cart.is_empty());
        assert_eq!(checkout.phase(), CheckoutPhase::Succeeded);
        let message = checkout.message().unwrap();
        assert_eq!(message.kind, MessageKind::Success);
        assert!(message.text.contains("success"));

        let sent = submitter.received.lock().unwrap();
        assert_eq!(sent[0].site_slug.as_ref().map(SiteSlug::as_str), Some("acme"));
        assert_eq!(sent[0].total_amount, Decimal::from(69));
        assert_eq!(sent[0].customer_details.note, None);
        assert_eq!(sent[0].cart_details.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_order_keeps_cart() {
        let scope = scope(Some("acme"));
        let mut cart = cart(scope.clone());
        let mut checkout = filled();
        let submitter =
            ScriptedSubmitter::new(Ok(OrderOutcome::Rejected("Out of stock".to_string())));

        let err = checkout.submit(&mut cart, &scope, &submitter).await.unwrap_err();

        assert_eq!(err, CheckoutError::Rejected("Out of stock".to_string()));
        assert_eq!(cart.count(), 2);
        assert_eq!(checkout.phase(), CheckoutPhase::Editing);
        assert!(checkout.message().unwrap().text.contains("Out of stock"));
        assert_eq!(checkout.form().first_name, "Asha");
    }

    #[tokio::test]
    async fn test_transport_failure_shows_generic_message() {
        let scope = scope(Some("acme"));
        let mut cart = cart(scope.clone());
        let mut checkout = filled();
        let submitter = ScriptedSubmitter::new(Err(SubmitError::Timeout(
            std::time::Duration::from_secs(10),
        )));

        let err = checkout.submit(&mut cart, &scope, &submitter).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Submission(SubmitError::Timeout(_))));
        assert_eq!(checkout.message().unwrap().text, MSG_UNEXPECTED_FAILURE);
        assert_eq!(cart.count(), 2);

        // A failed checkout can be resubmitted.
        let retry = ScriptedSubmitter::new(Ok(OrderOutcome::Placed { order_id: None }));
        checkout.submit(&mut cart, &scope, &retry).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_form_never_calls_service() {
        let scope = scope(Some("acme"));
        let mut cart = cart(scope.clone());
        let mut checkout = filled();
        checkout.handle_change(CheckoutField::Phone, "12345");
        let submitter = ScriptedSubmitter::new(Ok(OrderOutcome::Placed { order_id: None }));

        let err = checkout.submit(&mut cart, &scope, &submitter).await.unwrap_err();

        let CheckoutError::Invalid(errors) = err else {
            panic!("expected validation failure");
        };
        assert_eq!(
            errors[&CheckoutField::Phone],
            "Phone number must be exactly 10 digits"
        );
        assert_eq!(checkout.message().unwrap().text, MSG_FIX_ERRORS);
        assert_eq!(checkout.phase(), CheckoutPhase::Editing);
        assert_eq!(submitter.calls(), 0);
    }

    #[tokio::test]
    async fn test_preview_mode_never_calls_service() {
        let scope = scope(None);
        let mut cart = cart(scope.clone());
        let mut checkout = filled();
        let submitter = ScriptedSubmitter::new(Ok(OrderOutcome::Placed { order_id: None }));

        let err = checkout.submit(&mut cart, &scope, &submitter).await.unwrap_err();

        assert_eq!(err, CheckoutError::PreviewMode);
        assert_eq!(checkout.message().unwrap().text, MSG_PREVIEW_MODE);
        assert_eq!(submitter.calls(), 0);
        assert_eq!(cart.count(), 2);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let scope = scope(Some("acme"));
        let mut cart = cart(scope.clone());
        cart.clear_cart();
        let mut checkout = filled();
        let submitter = ScriptedSubmitter::new(Ok(OrderOutcome::Placed { order_id: None }));

        let err = checkout.submit(&mut cart, &scope, &submitter).await.unwrap_err();

        assert_eq!(err, CheckoutError::EmptyCart);
        assert_eq!(submitter.calls(), 0);
    }

    #[test]
    fn test_concurrent_submit_rejected() {
        let scope = scope(Some("acme"));
        let cart = cart(scope.clone());
        let mut checkout = filled();

        checkout.begin_submit(&cart, &scope).unwrap();
        assert_eq!(
            checkout.begin_submit(&cart, &scope),
            Err(CheckoutError::AlreadySubmitting)
        );
    }

    #[test]
    fn test_finish_without_begin() {
        let scope = scope(Some("acme"));
        let mut cart = cart(scope);
        let mut checkout = filled();
        assert_eq!(
            checkout.finish_submit(&mut cart, Ok(OrderOutcome::Placed { order_id: None })),
            Err(CheckoutError::NotSubmitting)
        );
    }

    #[test]
    fn test_change_clears_field_error() {
        let mut checkout = CheckoutController::new(StorefrontTemplate::Aurora);
        checkout.validate();
        assert!(checkout.errors().contains_key(&CheckoutField::City));
        checkout.handle_change(CheckoutField::City, "Pune");
        assert!(!checkout.errors().contains_key(&CheckoutField::City));
        assert!(checkout.errors().contains_key(&CheckoutField::State));
    }

    #[test]
    fn test_line_over_stock_is_not_submitted() {
        let scope = scope(Some("acme"));
        let line = CartLine {
            product_id: ProductId::from(1),
            quantity: 9,
            selected_variants: VariantSelection::default(),
        };
        let cart = CartStore::with_unchecked_lines(
            candles(),
            scope.clone(),
            MemoryStorage::new(),
            vec![line],
        );
        let mut checkout = filled();

        let err = checkout.begin_submit(&cart, &scope).unwrap_err();

        assert_eq!(
            err,
            CheckoutError::StockExceeded {
                product: ProductId::from(1),
                requested: 9,
                available: 5,
            }
        );
        assert!(!checkout.is_submitting());
        assert!(checkout.message().unwrap().text.contains("Candle"));
    }

    #[test]
    fn test_stale_submission_is_abandoned() {
        let scope = scope(Some("acme"));
        let cart = cart(scope.clone());
        let mut checkout = filled();
        checkout.begin_submit(&cart, &scope).unwrap();

        assert!(!checkout.abandon_stale(Utc::now(), Duration::seconds(20)));
        assert!(checkout.abandon_stale(Utc::now() + Duration::seconds(30), Duration::seconds(20)));
        assert_eq!(checkout.phase(), CheckoutPhase::Editing);
    }

    #[test]
    fn test_state_survives_serialization() {
        let mut checkout = filled();
        checkout.handle_change(CheckoutField::ZipCode, "123");
        checkout.validate();
        let json = serde_json::to_string(&checkout).unwrap();
        let restored: CheckoutController = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, checkout);
    }
}
