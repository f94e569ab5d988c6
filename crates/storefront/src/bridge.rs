//! In-process editor bridge.
//!
//! The editor posts messages to the storefront over HTTP; they are fanned out
//! on a broadcast channel. The catalog subscriber installs `UPDATE_DATA`
//! catalogs as per-tenant overrides.

use bizvistar_core::bridge::{BridgeEnvelope, EditorMessage, MessageChannel};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalogs::CatalogRegistry;

/// Messages buffered per subscriber before slow ones start lagging.
const CHANNEL_CAPACITY: usize = 64;

/// Editor message channel backed by `tokio::sync::broadcast`.
#[derive(Clone)]
pub struct BroadcastChannel {
    sender: broadcast::Sender<BridgeEnvelope>,
}

impl BroadcastChannel {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageChannel for BroadcastChannel {
    type Subscription = broadcast::Receiver<BridgeEnvelope>;

    fn dispatch(&self, envelope: BridgeEnvelope) -> usize {
        // Sending only fails when nobody is listening
        self.sender.send(envelope).unwrap_or(0)
    }

    fn subscribe(&self) -> Self::Subscription {
        self.sender.subscribe()
    }
}

/// Apply one bridge message to the catalogs.
///
/// Returns whether a catalog override was installed.
pub async fn apply_message(catalogs: &CatalogRegistry, envelope: BridgeEnvelope) -> bool {
    let BridgeEnvelope {
        site,
        template,
        message,
    } = envelope;

    match message {
        EditorMessage::UpdateData { payload } => match payload.catalog_override() {
            Some(Ok(snapshot)) => {
                catalogs.install_override(&site, template, snapshot).await;
                true
            }
            Some(Err(e)) => {
                warn!(site = %site, error = %e, "Ignoring invalid editor catalog");
                false
            }
            None => {
                debug!(site = %site, "Editor data carries no catalog");
                false
            }
        },
        EditorMessage::IframeReady => {
            debug!(site = %site, "Editor preview ready");
            false
        }
        EditorMessage::ScrollToSection { payload } => {
            debug!(site = %site, section = %payload.section, "Editor scroll request");
            false
        }
    }
}

/// Spawn the task that keeps catalogs in sync with editor messages.
pub fn spawn_catalog_sync(channel: &BroadcastChannel, catalogs: CatalogRegistry) -> JoinHandle<()> {
    let mut receiver = channel.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(envelope) => {
                    apply_message(&catalogs, envelope).await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Catalog sync fell behind editor messages");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Editor bridge closed, stopping catalog sync");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bizvistar_core::SiteSlug;
    use bizvistar_core::bridge::{BusinessData, ScrollTarget};
    use bizvistar_core::template::{StorageScope, StorefrontTemplate};
    use serde_json::json;

    use super::*;

    fn update(site: &str, data: serde_json::Value) -> BridgeEnvelope {
        BridgeEnvelope {
            site: SiteSlug::parse(site).unwrap(),
            template: Some(StorefrontTemplate::Blissly),
            message: EditorMessage::UpdateData {
                payload: serde_json::from_value::<BusinessData>(data).unwrap(),
            },
        }
    }

    #[test]
    fn test_dispatch_without_subscribers() {
        let channel = BroadcastChannel::new();
        assert_eq!(channel.dispatch(update("acme", json!({}))), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_dispatch() {
        let channel = BroadcastChannel::new();
        let mut first = channel.subscribe();
        let mut second = channel.subscribe();

        let envelope = BridgeEnvelope {
            site: SiteSlug::parse("acme").unwrap(),
            template: None,
            message: EditorMessage::ScrollToSection {
                payload: ScrollTarget {
                    section: "contact".to_string(),
                },
            },
        };
        assert_eq!(channel.dispatch(envelope.clone()), 2);
        assert_eq!(first.recv().await.unwrap(), envelope);
        assert_eq!(second.recv().await.unwrap(), envelope);
    }

    #[tokio::test]
    async fn test_apply_update_installs_override() {
        let catalogs = CatalogRegistry::from_snapshots([]);
        let installed = apply_message(
            &catalogs,
            update(
                "acme",
                json!({ "products": [{ "id": 3, "name": "Candle", "price": 299 }] }),
            ),
        )
        .await;
        assert!(installed);

        let scope = StorageScope::new(
            Some(SiteSlug::parse("acme").unwrap()),
            StorefrontTemplate::Blissly,
        );
        assert_eq!(catalogs.snapshot(&scope).await.products()[0].name, "Candle");
    }

    #[tokio::test]
    async fn test_invalid_update_is_ignored() {
        let catalogs = CatalogRegistry::from_snapshots([]);
        let installed = apply_message(
            &catalogs,
            update(
                "acme",
                json!({ "products": [{ "id": 3, "name": "Candle", "price": -1 }] }),
            ),
        )
        .await;
        assert!(!installed);
    }
}
