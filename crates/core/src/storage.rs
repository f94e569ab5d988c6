//! Key/value storage the cart persists into.
//!
//! Mirrors browser local storage: string keys, string values, synchronous
//! access. The storefront adapts its HTTP session to this trait.

use std::collections::HashMap;

/// Synchronous string key/value storage.
pub trait Storage {
    /// Read a value.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    fn set_item(&mut self, key: &str, value: String);

    /// Delete a value.
    fn remove_item(&mut self, key: &str);
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn get_item(&self, key: &str) -> Option<String> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: String) {
        (**self).set_item(key, value);
    }

    fn remove_item(&mut self, key: &str) {
        (**self).remove_item(key);
    }
}

/// In-memory [`Storage`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    /// Create an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.items.insert(key.to_owned(), value);
    }

    fn remove_item(&mut self, key: &str) {
        self.items.remove(key);
    }
}
