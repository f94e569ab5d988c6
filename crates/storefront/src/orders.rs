//! HTTP client for the order service.
//!
//! Orders are POSTed as camelCase JSON. The service answers
//! `{ "success": true, "orderId": ... }` or `{ "success": false, "error": ... }`;
//! that shape is honoured on 2xx and 4xx responses. Anything else is a
//! transport failure the shopper may retry.

use std::time::Duration;

use async_trait::async_trait;
use bizvistar_core::checkout::{
    OrderOutcome, OrderRequest, OrderResponse, OrderSubmitter, SubmitError,
};
use secrecy::SecretString;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::{OrdersConfig, bearer};

/// Longest response body echoed into error messages.
const MAX_ERROR_BODY: usize = 200;

/// Order service client.
#[derive(Clone)]
pub struct HttpOrderClient {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<SecretString>,
    timeout: Duration,
}

impl HttpOrderClient {
    /// Create a client for the configured order endpoint.
    #[must_use]
    pub fn new(config: &OrdersConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.api_url.clone(),
            token: config.api_token.clone(),
            timeout: config.timeout,
        }
    }

    fn map_send_error(&self, error: &reqwest::Error) -> SubmitError {
        if error.is_timeout() {
            SubmitError::Timeout(self.timeout)
        } else {
            SubmitError::Transport(error.to_string())
        }
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((end, _)) => body.get(..end).unwrap_or(body),
        None => body,
    }
}

#[async_trait]
impl OrderSubmitter for HttpOrderClient {
    #[instrument(
        skip(self, order),
        fields(
            endpoint = %self.endpoint,
            site = ?order.site_slug,
            lines = order.cart_details.len(),
        )
    )]
    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderOutcome, SubmitError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .json(order);
        if let Some(token) = &self.token {
            request = request.header("Authorization", bearer(token));
        }

        let response = request.send().await.map_err(|e| self.map_send_error(&e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(&e))?;

        if !(status.is_success() || status.is_client_error()) {
            warn!(status = %status, body = %truncate(&body), "Order service error");
            return Err(SubmitError::Transport(format!("HTTP {status}")));
        }

        let parsed: OrderResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(status = %status, error = %e, body = %truncate(&body), "Undecodable order response");
            if status.is_success() {
                SubmitError::Decode(e.to_string())
            } else {
                SubmitError::Transport(format!("HTTP {status}"))
            }
        })?;

        debug!(status = %status, success = parsed.success, "Order service answered");
        Ok(parsed.into_outcome())
    }
}
