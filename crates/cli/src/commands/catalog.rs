//! Catalog file commands.
//!
//! These read a catalog the same way the storefront loads its bundled
//! catalogs, so a file that passes `check` will load at start-up.

use std::path::Path;

use tracing::info;

use bizvistar_core::ProductId;
use bizvistar_core::curation::select_featured;
use bizvistar_storefront::catalogs::read_catalog_file;

/// Validate a catalog file and summarize it.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or validated.
pub fn check(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = read_catalog_file(path)?;

    let out_of_stock = catalog
        .products()
        .iter()
        .filter(|product| product.stock.is_out_of_stock())
        .count();
    let with_variants = catalog
        .products()
        .iter()
        .filter(|product| !product.variants.is_empty())
        .count();

    info!(
        path = %path.display(),
        products = catalog.products().len(),
        categories = catalog.categories().len(),
        out_of_stock,
        with_variants,
        "Catalog is valid"
    );
    Ok(())
}

/// Print the landing-page selection of a catalog.
///
/// Numeric pins match numeric product ids, anything else matches text ids.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub fn featured(path: &Path, count: usize, pins: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = read_catalog_file(path)?;
    let pinned: Vec<ProductId> = pins.iter().filter_map(|pin| pin.parse().ok()).collect();

    let selection = select_featured(&pinned, catalog.products(), catalog.categories(), count);

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&selection)?);
    }
    Ok(())
}
