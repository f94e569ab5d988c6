//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`. Error bodies are JSON: `{ "error": message }`, plus
//! `fieldErrors` for validation failures and `checkout` for failed orders.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bizvistar_core::SiteSlugError;
use bizvistar_core::cart::CartError;
use bizvistar_core::catalog::CatalogError;
use bizvistar_core::checkout::{CheckoutError, FieldErrors, MSG_UNEXPECTED_FAILURE};
use bizvistar_core::template::UnknownTemplate;
use serde::Serialize;
use thiserror::Error;

use crate::views::CheckoutView;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// A cart mutation was rejected.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// A checkout step was refused.
    #[error("{error}")]
    Checkout {
        error: CheckoutError,
        /// Form state to send back with the error.
        checkout: Option<Box<CheckoutView>>,
    },

    /// The template segment named no template.
    #[error(transparent)]
    UnknownTemplate(#[from] UnknownTemplate),

    /// The site segment is not a valid site slug.
    #[error("Unknown site: {0}")]
    InvalidSite(#[from] SiteSlugError),

    /// Editor-supplied catalog data is invalid.
    #[error("Invalid catalog: {0}")]
    Catalog(#[from] CatalogError),

    /// Session storage failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or wrong credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// No editor token is configured, so editor messages are refused.
    #[error("Editor bridge is not configured")]
    EditorDisabled,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CheckoutError> for AppError {
    fn from(error: CheckoutError) -> Self {
        Self::Checkout {
            error,
            checkout: None,
        }
    }
}

impl AppError {
    /// Attach the checkout form state to a checkout error.
    #[must_use]
    pub fn checkout(error: CheckoutError, view: CheckoutView) -> Self {
        Self::Checkout {
            error,
            checkout: Some(Box::new(view)),
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Cart(err) => match err {
                CartError::StockExceeded { .. } => StatusCode::CONFLICT,
                CartError::UnknownProduct(_) => StatusCode::NOT_FOUND,
                CartError::InvalidVariant(_) | CartError::ZeroQuantity => StatusCode::BAD_REQUEST,
            },
            Self::Checkout { error, .. } => match error {
                CheckoutError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutError::PreviewMode => StatusCode::FORBIDDEN,
                CheckoutError::EmptyCart => StatusCode::BAD_REQUEST,
                CheckoutError::StockExceeded { .. }
                | CheckoutError::AlreadySubmitting
                | CheckoutError::NotSubmitting => StatusCode::CONFLICT,
                CheckoutError::Rejected(_) | CheckoutError::Submission(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
            Self::UnknownTemplate(_) | Self::InvalidSite(_) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Catalog(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::EditorDisabled => StatusCode::SERVICE_UNAVAILABLE,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Session(_)
                | Self::Internal(_)
                | Self::Checkout {
                    error: CheckoutError::Submission(_),
                    ..
                }
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field_errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checkout: Option<Box<CheckoutView>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let body = match self {
            Self::Session(_) | Self::Internal(_) => ErrorBody {
                error: "Internal server error".to_string(),
                field_errors: None,
                checkout: None,
            },
            Self::Checkout { error, checkout } => {
                let message = match &error {
                    CheckoutError::Submission(_) => MSG_UNEXPECTED_FAILURE.to_string(),
                    other => other.to_string(),
                };
                let field_errors = match error {
                    CheckoutError::Invalid(errors) => Some(errors),
                    _ => None,
                };
                ErrorBody {
                    error: message,
                    field_errors,
                    checkout,
                }
            }
            other => ErrorBody {
                error: other.to_string(),
                field_errors: None,
                checkout: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
