use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::KvStore;

/// Volatile `KvStore`, used by tests and dry runs.
#[derive(Default)]
pub struct InMemoryKvStore {
    namespaces: Mutex<HashMap<String, BTreeMap<String, String>>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, namespace: &str, key: &str) -> Option<String> {
        self.namespaces
            .lock()
            .await
            .get(namespace)
            .and_then(|ns| ns.get(key).cloned())
    }

    pub async fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .lock()
            .await
            .get(namespace)
            .map_or(0, |ns| ns.len())
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn put(&self, namespace: &str, key: &str, value: &str) -> anyhow::Result<()> {
        self.namespaces
            .lock()
            .await
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> anyhow::Result<()> {
        if let Some(ns) = self.namespaces.lock().await.get_mut(namespace) {
            ns.remove(key);
        }
        Ok(())
    }

    async fn scan_all(&self, namespace: &str) -> anyhow::Result<Vec<(String, String)>> {
        Ok(self
            .namespaces
            .lock()
            .await
            .get(namespace)
            .map(|ns| ns.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}
