//! BizVistar Core - cart, catalog and checkout logic shared by every storefront template.
//!
//! Each BizVistar storefront template (Aurora, Avenix, Flara, Blissly, Frostify)
//! runs the same cart state machine and checkout pipeline. Only a handful of
//! policies vary per template (storage name, shipping fee, contact field); those
//! live in [`template`].
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure logic - no network or
//! database I/O. Storage and order submission are collaborators expressed as
//! traits ([`storage::Storage`], [`checkout::OrderSubmitter`]) so the storefront
//! binary decides where carts live and how orders are sent.
//!
//! # Modules
//!
//! - [`types`] - Ids, prices and email addresses
//! - [`catalog`] - Read-only catalog snapshot (products, categories, variants)
//! - [`variant`] - Variant selections and their canonical signature
//! - [`template`] - Per-template policies and storage keys
//! - [`storage`] - Key/value storage the cart persists into
//! - [`cart`] - Cart store and derived totals
//! - [`checkout`] - Checkout form validation and the submission state machine
//! - [`curation`] - Landing-page product/category selection
//! - [`bridge`] - Typed editor-bridge messages

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bridge;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod curation;
pub mod storage;
pub mod template;
pub mod types;
pub mod variant;

pub use types::*;
