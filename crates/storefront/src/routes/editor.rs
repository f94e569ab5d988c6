//! Editor bridge endpoint.
//!
//! The visual editor posts its messages here; they are dispatched on the
//! storefront's bridge channel. The editor must send `EDITOR_API_TOKEN` as a
//! bearer token; without a configured token the endpoint is disabled.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
};
use bizvistar_core::SiteSlug;
use bizvistar_core::bridge::{BridgeEnvelope, EditorMessage, MessageChannel};
use bizvistar_core::template::StorefrontTemplate;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{info, instrument};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Query of `POST /sites/{site}/editor/messages`.
#[derive(Debug, Deserialize)]
pub struct EditorTarget {
    /// Limit the message to one template; all templates when absent.
    pub template: Option<StorefrontTemplate>,
}

/// Answer to a dispatched message.
#[derive(Debug, Serialize)]
pub struct Dispatched {
    /// Subscribers that received the message.
    pub delivered: usize,
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let Some(expected) = &state.config().editor_token else {
        return Err(AppError::EditorDisabled);
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or_default();
    if bool::from(presented.as_bytes().ct_eq(expected.expose_secret().as_bytes())) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

/// Dispatch one editor message to the site's storefronts.
#[instrument(skip(state, headers, message), fields(kind))]
pub async fn dispatch(
    State(state): State<AppState>,
    Path(site): Path<String>,
    Query(target): Query<EditorTarget>,
    headers: HeaderMap,
    Json(message): Json<EditorMessage>,
) -> Result<(StatusCode, Json<Dispatched>)> {
    authorize(&state, &headers)?;
    let site = SiteSlug::parse(&site)?;

    let kind = match &message {
        EditorMessage::UpdateData { .. } => "UPDATE_DATA",
        EditorMessage::IframeReady => "IFRAME_READY",
        EditorMessage::ScrollToSection { .. } => "SCROLL_TO_SECTION",
    };
    tracing::Span::current().record("kind", kind);

    // Reject a bad catalog up front instead of letting subscribers drop it
    if let EditorMessage::UpdateData { payload } = &message
        && let Some(Err(e)) = payload.catalog_override()
    {
        return Err(AppError::Catalog(e));
    }

    let delivered = state.bridge().dispatch(BridgeEnvelope {
        site,
        template: target.template,
        message,
    });
    info!(delivered, "Editor message dispatched");

    Ok((StatusCode::ACCEPTED, Json(Dispatched { delivered })))
}
