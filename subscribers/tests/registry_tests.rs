use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::test;

use subscribers::store::{InMemoryKvStore, KvStore};
use subscribers::{Subscriber, SubscriberRegistry};

mod mock_store;
use mock_store::{FailingKvStore, SlowPutKvStore};

const NS: &str = "chats";

async fn fresh() -> (Arc<InMemoryKvStore>, SubscriberRegistry) {
    let store = Arc::new(InMemoryKvStore::new());
    let registry = SubscriberRegistry::load(NS, store.clone()).await.unwrap();
    (store, registry)
}

#[test]
async fn add_twice_yields_single_entry() {
    let (store, reg) = fresh().await;

    assert!(reg.add_subscriber(Subscriber::new(1, "alpha")).await);
    assert!(!reg.add_subscriber(Subscriber::new(1, "alpha")).await);

    assert_eq!(reg.len().await, 1);
    assert_eq!(store.len(NS).await, 1);
}

#[test]
async fn re_add_keeps_original_display_name() {
    let (store, reg) = fresh().await;

    reg.add_subscriber(Subscriber::new(1, "first")).await;
    reg.add_subscriber(Subscriber::new(1, "renamed")).await;

    assert_eq!(reg.list_subscribers().await, vec![Subscriber::new(1, "first")]);
    let stored = store.get(NS, "1").await.unwrap();
    assert!(stored.contains("first"));
}

#[test]
async fn remove_absent_is_noop() {
    let (store, reg) = fresh().await;
    reg.add_subscriber(Subscriber::new(5, "kept")).await;

    assert!(!reg.remove_subscriber(42).await);

    assert_eq!(reg.list_subscribers().await, vec![Subscriber::new(5, "kept")]);
    assert_eq!(store.len(NS).await, 1);
}

#[test]
async fn remove_deletes_from_memory_and_store() {
    let (store, reg) = fresh().await;
    reg.add_subscriber(Subscriber::new(5, "gone")).await;

    assert!(reg.remove_subscriber(5).await);

    assert!(!reg.contains(5).await);
    assert_eq!(store.get(NS, "5").await, None);
}

#[test]
async fn load_rehydrates_and_skips_malformed_rows() -> anyhow::Result<()> {
    let store = Arc::new(InMemoryKvStore::new());
    store
        .put(NS, "10", &serde_json::to_string(&Subscriber::new(10, "ten"))?)
        .await?;
    store.put(NS, "bogus", r#"{"id":1,"display_name":"x"}"#).await?;
    store.put(NS, "11", "{not json").await?;
    store
        .put("users", "12", &serde_json::to_string(&Subscriber::new(12, "other ns"))?)
        .await?;

    let reg = SubscriberRegistry::load(NS, store).await?;

    assert_eq!(reg.list_subscribers().await, vec![Subscriber::new(10, "ten")]);
    Ok(())
}

#[test]
async fn snapshot_is_independent_of_later_mutation() {
    let (_store, reg) = fresh().await;
    reg.add_subscriber(Subscriber::new(1, "a")).await;
    reg.add_subscriber(Subscriber::new(2, "b")).await;

    let snapshot = reg.list_subscribers().await;
    reg.remove_subscriber(1).await;

    assert_eq!(snapshot.len(), 2);
    assert_eq!(reg.len().await, 1);
}

#[test]
async fn persistence_failure_keeps_memory_authoritative() {
    let store = Arc::new(FailingKvStore::default());
    let reg = SubscriberRegistry::load(NS, store.clone()).await.unwrap();

    assert!(reg.add_subscriber(Subscriber::new(3, "c")).await);
    assert!(reg.contains(3).await);

    assert!(reg.remove_subscriber(3).await);
    assert!(reg.is_empty().await);

    assert_eq!(store.attempts(), 2);
}

#[test]
async fn registries_in_separate_namespaces_do_not_mix() {
    let store: Arc<InMemoryKvStore> = Arc::new(InMemoryKvStore::new());
    let chats = SubscriberRegistry::load("chats", store.clone()).await.unwrap();
    let users = SubscriberRegistry::load("users", store.clone()).await.unwrap();

    chats.add_subscriber(Subscriber::new(1, "chat")).await;
    users.add_subscriber(Subscriber::new(2, "user")).await;

    assert_eq!(store.len("chats").await, 1);
    assert_eq!(store.len("users").await, 1);
    assert!(!chats.contains(2).await);
}

#[test]
async fn concurrent_adds_of_same_id_insert_once() {
    let (store, reg) = fresh().await;
    let reg = Arc::new(reg);
    let mut set = JoinSet::new();

    for _ in 0..16 {
        let r = Arc::clone(&reg);
        set.spawn(async move { r.add_subscriber(Subscriber::new(9, "dup")).await });
    }

    let mut inserted = 0;
    while let Some(res) = set.join_next().await {
        if res.expect("task panicked") {
            inserted += 1;
        }
    }

    assert_eq!(inserted, 1);
    assert_eq!(reg.len().await, 1);
    assert_eq!(store.len(NS).await, 1);
}

#[test]
async fn remove_during_slow_add_keeps_store_in_step() {
    let inner = Arc::new(InMemoryKvStore::new());
    let slow = Arc::new(SlowPutKvStore {
        inner: inner.clone(),
        delay: std::time::Duration::from_millis(50),
    });
    let reg = Arc::new(SubscriberRegistry::load(NS, slow.clone()).await.unwrap());

    let adder = {
        let reg = reg.clone();
        tokio::spawn(async move { reg.add_subscriber(Subscriber::new(5, "x")).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    assert!(reg.remove_subscriber(5).await);
    assert!(adder.await.unwrap());

    assert!(!reg.contains(5).await);
    assert_eq!(inner.get(NS, "5").await, None);

    let reloaded = SubscriberRegistry::load(NS, slow).await.unwrap();
    assert!(!reloaded.contains(5).await);
}
