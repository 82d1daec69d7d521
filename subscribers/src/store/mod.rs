pub mod memory_store;
pub mod sqlite_store;

pub use memory_store::InMemoryKvStore;
pub use sqlite_store::SqliteKvStore;

/// Namespaced durable key-value persistence.
///
/// Registries and the broadcast gate rehydrate from `scan_all` at startup and
/// write through `put` / `delete` afterwards.
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    /// Insert or overwrite `key` inside `namespace`.
    async fn put(&self, namespace: &str, key: &str, value: &str) -> anyhow::Result<()>;
    /// Deleting a missing key is not an error.
    async fn delete(&self, namespace: &str, key: &str) -> anyhow::Result<()>;
    /// Every `(key, value)` pair of `namespace`, ordered by key.
    async fn scan_all(&self, namespace: &str) -> anyhow::Result<Vec<(String, String)>>;
}
