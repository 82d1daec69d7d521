use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::logger::warn_if_slow;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::model::{Subscriber, SubscriberId};
use crate::store::KvStore;

/// In-memory live set of subscribers, persisted 1:1 into one store namespace.
///
/// The map lock only guards the map and is released before any store I/O.
/// Mutations hold `writes` across both steps, so store writes land in the
/// same order as the in-memory changes.
///
/// Write ordering is memory first, store second. A failed store write is
/// logged and the in-memory change stands for the rest of the process.
pub struct SubscriberRegistry {
    namespace: String,
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
    writes: Mutex<()>,
    store: Arc<dyn KvStore>,
}

impl SubscriberRegistry {
    /// Build a registry and rehydrate it from `namespace` (full scan).
    ///
    /// Rows with a non-numeric key or undecodable value are skipped.
    pub async fn load(namespace: &str, store: Arc<dyn KvStore>) -> anyhow::Result<Self> {
        let rows = store
            .scan_all(namespace)
            .await
            .with_context(|| format!("failed to scan namespace {namespace}"))?;

        let mut map = HashMap::with_capacity(rows.len());
        for (key, value) in rows {
            match decode_row(&key, &value) {
                Ok(s) => {
                    map.insert(s.id, s);
                }
                Err(e) => {
                    warn!(namespace, key = %key, error = %e, "skipping malformed subscriber row");
                }
            }
        }

        info!(namespace, count = map.len(), "subscriber registry restored");

        Ok(Self {
            namespace: namespace.to_string(),
            subscribers: Mutex::new(map),
            writes: Mutex::new(()),
            store,
        })
    }

    /// Returns `true` when `subscriber` was newly inserted.
    ///
    /// Re-adding a known id is a no-op: the stored display name is kept and
    /// nothing is written.
    #[instrument(skip(self, subscriber), fields(ns = %self.namespace, subscriber_id = subscriber.id))]
    pub async fn add_subscriber(&self, subscriber: Subscriber) -> bool {
        let _write = self.writes.lock().await;
        {
            let mut guard = self.subscribers.lock().await;
            if guard.contains_key(&subscriber.id) {
                debug!("subscriber already registered");
                return false;
            }
            guard.insert(subscriber.id, subscriber.clone());
        }

        info!(display_name = %subscriber.display_name, "subscriber added");

        if let Err(e) = self.persist(&subscriber).await {
            warn!(error = ?e, "subscriber kept in memory but not persisted");
        }

        true
    }

    /// Returns `true` when a subscriber was removed. Removing an unknown id
    /// is a successful no-op.
    #[instrument(skip(self), fields(ns = %self.namespace))]
    pub async fn remove_subscriber(&self, id: SubscriberId) -> bool {
        let _write = self.writes.lock().await;
        let removed = self.subscribers.lock().await.remove(&id);

        if removed.is_none() {
            debug!("subscriber not registered; nothing to remove");
            return false;
        }

        info!("subscriber removed");

        if let Err(e) = self.unpersist(id).await {
            warn!(error = ?e, "subscriber removed from memory but not from store");
        }

        true
    }

    /// Independent copy of the current set, ordered by id.
    pub async fn list_subscribers(&self) -> Vec<Subscriber> {
        let mut out: Vec<Subscriber> = self.subscribers.lock().await.values().cloned().collect();
        out.sort_by_key(|s| s.id);
        out
    }

    pub async fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn persist(&self, subscriber: &Subscriber) -> anyhow::Result<()> {
        let value = serde_json::to_string(subscriber)?;

        warn_if_slow("kv_put_subscriber", Duration::from_millis(100), async {
            self.store
                .put(&self.namespace, &subscriber.key(), &value)
                .await
        })
        .await
        .context("failed to persist subscriber")
    }

    async fn unpersist(&self, id: SubscriberId) -> anyhow::Result<()> {
        warn_if_slow("kv_delete_subscriber", Duration::from_millis(100), async {
            self.store.delete(&self.namespace, &id.to_string()).await
        })
        .await
        .context("failed to delete subscriber")
    }
}

fn decode_row(key: &str, value: &str) -> anyhow::Result<Subscriber> {
    let id: SubscriberId = key.parse().context("non-numeric key")?;
    let mut subscriber: Subscriber = serde_json::from_str(value).context("invalid json")?;
    // the key is authoritative for identity
    subscriber.id = id;
    Ok(subscriber)
}
