//! Landing-page selection of products and categories.
//!
//! Deterministic: the same inputs always produce the same list.

use std::cmp::Reverse;
use std::collections::HashSet;

use serde::Serialize;

use crate::catalog::{Category, Product, Stock};
use crate::types::ProductId;

/// One slot on the landing page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeaturedItem {
    Product(Product),
    Category(Category),
}

trait HasImageKey {
    fn image_key(&self) -> Option<&str>;
}

impl HasImageKey for Product {
    fn image_key(&self) -> Option<&str> {
        self.image.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }
}

impl HasImageKey for Category {
    fn image_key(&self) -> Option<&str> {
        self.image.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }
}

/// Ranking tier by stock: in-stock limited items first, sold-out last.
const fn stock_tier(stock: Stock) -> u8 {
    match stock {
        Stock::Limited(0) => 2,
        Stock::Limited(_) => 0,
        Stock::Unlimited | Stock::Untracked => 1,
    }
}

/// Next item from `items` whose image has not been used yet.
fn take_fresh<'a, T: HasImageKey>(
    items: &mut impl Iterator<Item = &'a T>,
    used_images: &mut HashSet<&'a str>,
) -> Option<&'a T> {
    items.find(|item| item.image_key().is_none_or(|url| used_images.insert(url)))
}

/// Pick up to `count` items for a landing page.
///
/// Pinned products come first in pinned order; unknown ids are skipped. The
/// remaining products are ranked (image first, then stock tier, then units
/// sold, then catalog order) and interleaved with categories. An item whose
/// image URL was already used is skipped.
#[must_use]
pub fn select_featured(
    pinned: &[ProductId],
    products: &[Product],
    categories: &[Category],
    count: usize,
) -> Vec<FeaturedItem> {
    let mut selected = Vec::with_capacity(count);
    let mut used_images: HashSet<&str> = HashSet::new();
    let mut pinned_ids: HashSet<&ProductId> = HashSet::new();

    for id in pinned {
        if selected.len() >= count {
            return selected;
        }
        if !pinned_ids.insert(id) {
            continue;
        }
        if let Some(product) = products.iter().find(|product| product.id == *id) {
            if let Some(url) = product.image_key() {
                used_images.insert(url);
            }
            selected.push(FeaturedItem::Product(product.clone()));
        }
    }

    let mut ranked: Vec<(usize, &Product)> = products
        .iter()
        .enumerate()
        .filter(|(_, product)| !pinned_ids.contains(&product.id))
        .collect();
    ranked.sort_by_key(|&(position, product)| {
        (
            !product.has_image(),
            stock_tier(product.stock),
            Reverse(product.sold.unwrap_or(0)),
            position,
        )
    });

    let mut ranked = ranked.into_iter().map(|(_, product)| product);
    let mut categories = categories.iter();
    let (mut products_done, mut categories_done) = (false, false);
    let mut product_turn = true;

    while selected.len() < count && !(products_done && categories_done) {
        if product_turn && !products_done {
            match take_fresh(&mut ranked, &mut used_images) {
                Some(product) => selected.push(FeaturedItem::Product(product.clone())),
                None => products_done = true,
            }
        } else if !categories_done {
            match take_fresh(&mut categories, &mut used_images) {
                Some(category) => selected.push(FeaturedItem::Category(category.clone())),
                None => categories_done = true,
            }
        }
        product_turn = !product_turn;
    }

    selected
}
