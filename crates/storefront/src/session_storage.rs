//! The shopper's session as cart [`Storage`].
//!
//! The cart and checkout run synchronously against [`Storage`]; the session
//! store is async. `SessionStorage` reads the keys a request needs up front,
//! buffers writes, and flushes only the changed keys back to the session.

use std::collections::{BTreeSet, HashMap};

use bizvistar_core::storage::Storage;
use tower_sessions::Session;

/// Session-backed key/value storage for one request.
#[derive(Debug, Default)]
pub struct SessionStorage {
    values: HashMap<String, Option<String>>,
    dirty: BTreeSet<String>,
}

impl SessionStorage {
    /// Read `keys` from the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn load<K: AsRef<str>>(
        session: &Session,
        keys: &[K],
    ) -> Result<Self, tower_sessions::session::Error> {
        let mut values = HashMap::with_capacity(keys.len());
        for key in keys {
            let key = key.as_ref();
            let value: Option<String> = session.get(key).await?;
            values.insert(key.to_owned(), value);
        }
        Ok(Self {
            values,
            dirty: BTreeSet::new(),
        })
    }

    /// Whether any key was written since loading.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Write changed keys back to the session and mark them clean.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn flush(&mut self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        for key in std::mem::take(&mut self.dirty) {
            match self.values.get(&key).cloned().flatten() {
                Some(value) => session.insert(&key, value).await?,
                None => {
                    session.remove_value(&key).await?;
                }
            }
        }
        Ok(())
    }
}

impl Storage for SessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned().flatten()
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.values.insert(key.to_owned(), Some(value));
        self.dirty.insert(key.to_owned());
    }

    fn remove_item(&mut self, key: &str) {
        self.values.insert(key.to_owned(), None);
        self.dirty.insert(key.to_owned());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_round_trip_through_session() {
        let session = session();
        session
            .insert("acme:flaraCart", r#"[{"id":1,"quantity":2}]"#.to_string())
            .await
            .unwrap();

        let mut storage = SessionStorage::load(&session, &["acme:flaraCart", "acme:flaraCartUi"])
            .await
            .unwrap();
        assert_eq!(
            storage.get_item("acme:flaraCart").as_deref(),
            Some(r#"[{"id":1,"quantity":2}]"#)
        );
        assert!(storage.get_item("acme:flaraCartUi").is_none());
        assert!(!storage.is_dirty());

        storage.set_item("acme:flaraCart", "[]".to_string());
        storage.set_item("acme:flaraCartUi", r#"{"isOpen":true}"#.to_string());
        storage.flush(&session).await.unwrap();
        assert!(!storage.is_dirty());

        let cart: Option<String> = session.get("acme:flaraCart").await.unwrap();
        assert_eq!(cart.as_deref(), Some("[]"));
        let ui: Option<String> = session.get("acme:flaraCartUi").await.unwrap();
        assert_eq!(ui.as_deref(), Some(r#"{"isOpen":true}"#));
    }

    #[tokio::test]
    async fn test_remove_deletes_session_key() {
        let session = session();
        session.insert("k", "v".to_string()).await.unwrap();

        let mut storage = SessionStorage::load(&session, &["k"]).await.unwrap();
        storage.remove_item("k");
        assert!(storage.get_item("k").is_none());
        storage.flush(&session).await.unwrap();

        let value: Option<String> = session.get("k").await.unwrap();
        assert!(value.is_none());
    }
}
