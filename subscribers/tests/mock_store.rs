#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use subscribers::store::{InMemoryKvStore, KvStore};

/// Store whose writes always fail; scans return `rows`.
#[derive(Default)]
pub struct FailingKvStore {
    pub rows: Vec<(String, String)>,
    pub write_attempts: AtomicUsize,
}

impl FailingKvStore {
    pub fn attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvStore for FailingKvStore {
    async fn put(&self, _: &str, _: &str, _: &str) -> anyhow::Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("disk full"))
    }

    async fn delete(&self, _: &str, _: &str) -> anyhow::Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("disk full"))
    }

    async fn scan_all(&self, _: &str) -> anyhow::Result<Vec<(String, String)>> {
        Ok(self.rows.clone())
    }
}

/// In-memory store whose `put` takes `delay` before landing.
pub struct SlowPutKvStore {
    pub inner: Arc<InMemoryKvStore>,
    pub delay: Duration,
}

#[async_trait]
impl KvStore for SlowPutKvStore {
    async fn put(&self, namespace: &str, key: &str, value: &str) -> anyhow::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.put(namespace, key, value).await
    }

    async fn delete(&self, namespace: &str, key: &str) -> anyhow::Result<()> {
        self.inner.delete(namespace, key).await
    }

    async fn scan_all(&self, namespace: &str) -> anyhow::Result<Vec<(String, String)>> {
        self.inner.scan_all(namespace).await
    }
}
