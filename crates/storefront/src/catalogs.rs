//! Catalogs served to each storefront scope.
//!
//! Every template ships a bundled catalog (`<slug>.json` or `<slug>.yaml` in
//! the catalog directory). A tenant's editor can replace it with the shop
//! owner's own products; those overrides are cached per site and template.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bizvistar_core::SiteSlug;
use bizvistar_core::catalog::{CatalogData, CatalogError, CatalogSnapshot};
use bizvistar_core::template::{StorageScope, StorefrontTemplate};
use moka::future::Cache;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// How long an editor override lives without being refreshed.
const OVERRIDE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors loading bundled catalogs.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid catalog {path}: {source}")]
    Invalid {
        path: PathBuf,
        source: CatalogError,
    },
}

/// Parse a catalog file, choosing the format by extension.
///
/// # Errors
///
/// Returns [`CatalogLoadError`] if the file cannot be read, parsed or
/// validated.
pub fn read_catalog_file(path: &Path) -> Result<CatalogSnapshot, CatalogLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CatalogLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let data: CatalogData = if is_yaml {
        serde_yaml::from_str(&raw).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&raw).map_err(|e| e.to_string())
    }
    .map_err(|message| CatalogLoadError::Parse {
        path: path.to_path_buf(),
        message,
    })?;

    CatalogSnapshot::try_from(data).map_err(|source| CatalogLoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

/// Bundled catalogs plus per-tenant editor overrides.
#[derive(Clone)]
pub struct CatalogRegistry {
    bundled: Arc<HashMap<StorefrontTemplate, Arc<CatalogSnapshot>>>,
    overrides: Cache<(SiteSlug, StorefrontTemplate), Arc<CatalogSnapshot>>,
}

impl CatalogRegistry {
    /// Build a registry from already loaded bundled catalogs.
    ///
    /// Templates without an entry get an empty catalog.
    #[must_use]
    pub fn from_snapshots(
        snapshots: impl IntoIterator<Item = (StorefrontTemplate, CatalogSnapshot)>,
    ) -> Self {
        let mut bundled: HashMap<_, _> = snapshots
            .into_iter()
            .map(|(template, snapshot)| (template, Arc::new(snapshot)))
            .collect();
        for template in StorefrontTemplate::ALL {
            bundled
                .entry(template)
                .or_insert_with(|| Arc::new(CatalogSnapshot::empty()));
        }

        let overrides = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(OVERRIDE_TTL)
            .build();

        Self {
            bundled: Arc::new(bundled),
            overrides,
        }
    }

    /// Load every template's bundled catalog from `dir`.
    ///
    /// A template with no catalog file serves an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogLoadError`] if a catalog file exists but is unusable.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn load_dir(dir: &Path) -> Result<Self, CatalogLoadError> {
        let mut snapshots = Vec::with_capacity(StorefrontTemplate::ALL.len());

        for template in StorefrontTemplate::ALL {
            let found = ["json", "yaml", "yml"]
                .iter()
                .map(|ext| dir.join(format!("{}.{ext}", template.slug())))
                .find(|path| path.is_file());

            let Some(path) = found else {
                warn!(template = %template, "No bundled catalog, serving an empty one");
                continue;
            };

            let snapshot = read_catalog_file(&path)?;
            info!(
                template = %template,
                products = snapshot.products().len(),
                categories = snapshot.categories().len(),
                "Loaded bundled catalog"
            );
            snapshots.push((template, snapshot));
        }

        Ok(Self::from_snapshots(snapshots))
    }

    /// The bundled catalog of a template.
    #[must_use]
    pub fn bundled(&self, template: StorefrontTemplate) -> Arc<CatalogSnapshot> {
        self.bundled
            .get(&template)
            .cloned()
            .unwrap_or_else(|| Arc::new(CatalogSnapshot::empty()))
    }

    /// The catalog a scope currently sees.
    ///
    /// A tenant's editor override wins over the bundled catalog; preview
    /// scopes always see the bundled catalog.
    pub async fn snapshot(&self, scope: &StorageScope) -> Arc<CatalogSnapshot> {
        if let Some(site) = scope.tenant()
            && let Some(snapshot) = self
                .overrides
                .get(&(site.clone(), scope.template()))
                .await
        {
            return snapshot;
        }
        self.bundled(scope.template())
    }

    /// Replace a tenant's catalog.
    ///
    /// `template: None` applies the catalog to every template of the site.
    #[instrument(skip(self, snapshot), fields(site = %site))]
    pub async fn install_override(
        &self,
        site: &SiteSlug,
        template: Option<StorefrontTemplate>,
        snapshot: CatalogSnapshot,
    ) {
        let snapshot = Arc::new(snapshot);
        let templates = template.map_or_else(|| StorefrontTemplate::ALL.to_vec(), |t| vec![t]);
        for template in templates {
            self.overrides
                .insert((site.clone(), template), Arc::clone(&snapshot))
                .await;
        }
        info!(
            products = snapshot.products().len(),
            "Installed editor catalog override"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    fn catalog(products: &str) -> CatalogSnapshot {
        serde_json::from_str(&format!(r#"{{"products": {products}}}"#)).unwrap()
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "bizvistar-catalogs-{name}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_override_wins_for_tenant_only() {
        let registry = CatalogRegistry::from_snapshots([(
            StorefrontTemplate::Flara,
            catalog(r#"[{"id": 1, "name": "Bundled", "price": 10}]"#),
        )]);
        let site = SiteSlug::parse("acme").unwrap();

        registry
            .install_override(
                &site,
                Some(StorefrontTemplate::Flara),
                catalog(r#"[{"id": 7, "name": "Owner", "price": 99}]"#),
            )
            .await;

        let tenant = StorageScope::new(Some(site.clone()), StorefrontTemplate::Flara);
        let preview = StorageScope::new(None, StorefrontTemplate::Flara);
        let other_template = StorageScope::new(Some(site), StorefrontTemplate::Aurora);

        assert_eq!(registry.snapshot(&tenant).await.products()[0].name, "Owner");
        assert_eq!(registry.snapshot(&preview).await.products()[0].name, "Bundled");
        assert!(registry.snapshot(&other_template).await.is_empty());
    }

    #[tokio::test]
    async fn test_site_wide_override() {
        let registry = CatalogRegistry::from_snapshots([]);
        let site = SiteSlug::parse("acme").unwrap();
        registry
            .install_override(&site, None, catalog(r#"[{"id": 1, "name": "Mug", "price": 5}]"#))
            .await;

        for template in StorefrontTemplate::ALL {
            let scope = StorageScope::new(Some(site.clone()), template);
            assert_eq!(registry.snapshot(&scope).await.products().len(), 1);
        }
    }

    #[test]
    fn test_load_dir_reads_json_and_yaml() {
        let dir = temp_dir("load");
        std::fs::write(
            dir.join("aurora.json"),
            r#"{"products": [{"id": 1, "name": "Lamp", "price": 1200, "stock": 3}]}"#,
        )
        .unwrap();
        let mut yaml = std::fs::File::create(dir.join("flara.yaml")).unwrap();
        writeln!(yaml, "products:\n  - id: p-1\n    name: Vase\n    price: 450").unwrap();

        let registry = CatalogRegistry::load_dir(&dir).unwrap();
        assert_eq!(registry.bundled(StorefrontTemplate::Aurora).products().len(), 1);
        assert_eq!(
            registry.bundled(StorefrontTemplate::Flara).products()[0].name,
            "Vase"
        );
        assert!(registry.bundled(StorefrontTemplate::Blissly).is_empty());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_load_dir_rejects_invalid_catalog() {
        let dir = temp_dir("invalid");
        std::fs::write(
            dir.join("avenix.json"),
            r#"{"products": [{"id": 1, "name": "A", "price": 1}, {"id": 1, "name": "B", "price": 2}]}"#,
        )
        .unwrap();

        let err = CatalogRegistry::load_dir(&dir).err().unwrap();
        assert!(matches!(err, CatalogLoadError::Invalid { .. }));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_bundled_catalogs_are_valid() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("catalogs");
        let registry = CatalogRegistry::load_dir(&dir).unwrap();
        for template in StorefrontTemplate::ALL {
            assert!(!registry.bundled(template).is_empty(), "{template}");
        }
    }
}
