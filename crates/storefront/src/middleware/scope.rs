//! Storefront scope extractor.
//!
//! Every cart and checkout route lives under `/sites/{site}/{template}` for a
//! published tenant site or `/preview/{template}` for a template preview with
//! no tenant. The scope decides which storage keys, catalog and checkout rules
//! apply to the request.

use std::collections::HashMap;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use bizvistar_core::SiteSlug;
use bizvistar_core::template::{StorageScope, StorefrontTemplate};
use tracing::Span;

use crate::error::AppError;

/// The `(tenant, template)` scope of a storefront request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontScope(pub StorageScope);

impl StorefrontScope {
    /// Resolve a scope from raw path segments.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidSite`] or [`AppError::UnknownTemplate`] for
    /// unusable segments.
    pub fn resolve(site: Option<&str>, template: &str) -> Result<Self, AppError> {
        let tenant = site.map(SiteSlug::parse).transpose()?;
        let template: StorefrontTemplate = template.parse()?;
        Ok(Self(StorageScope::new(tenant, template)))
    }

    /// Whether this is a template preview without a tenant.
    #[must_use]
    pub const fn is_preview(&self) -> bool {
        self.0.tenant().is_none()
    }
}

impl<S> FromRequestParts<S> for StorefrontScope
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let template = params
            .get("template")
            .ok_or_else(|| AppError::NotFound("template".to_string()))?;
        let scope = Self::resolve(params.get("site").map(String::as_str), template)?;

        let span = Span::current();
        span.record("template", scope.0.template().slug());
        if let Some(site) = scope.0.tenant() {
            span.record("site", site.as_str());
        }

        Ok(scope)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_tenant_scope() {
        let scope = StorefrontScope::resolve(Some("acme"), "Flara").unwrap();
        assert!(!scope.is_preview());
        assert_eq!(scope.0.cart_key(), "acme:flaraCart");
    }

    #[test]
    fn test_resolve_preview_scope() {
        let scope = StorefrontScope::resolve(None, "blissly").unwrap();
        assert!(scope.is_preview());
        assert_eq!(scope.0.template(), StorefrontTemplate::Blissly);
    }

    #[test]
    fn test_resolve_rejects_unknown_template() {
        let err = StorefrontScope::resolve(Some("acme"), "nova").unwrap_err();
        assert!(matches!(err, AppError::UnknownTemplate(_)));
    }

    #[test]
    fn test_resolve_rejects_bad_site() {
        let err = StorefrontScope::resolve(Some("Not A Slug!"), "aurora").unwrap_err();
        assert!(matches!(err, AppError::InvalidSite(_)));
    }
}
