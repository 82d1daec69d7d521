
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use market::{Asset, AssetBook};
use scheduler::{
    BroadcastGate, BroadcastScheduler, DeliveryOutcome, SchedulerConfig, TransportError, Trigger,
};
use subscribers::store::{InMemoryKvStore, KvStore};
use subscribers::{Subscriber, SubscriberRegistry};

use mock_transport::{ScriptedTransport, chat_not_found, too_many_requests};

struct Harness {
    store: Arc<InMemoryKvStore>,
    gate: Arc<BroadcastGate>,
    chats: Arc<SubscriberRegistry>,
    transport: Arc<ScriptedTransport>,
    scheduler: BroadcastScheduler,
}

fn btc() -> Asset {
    Asset::new("BTC", "USD")
}

fn local(day: u32, hour: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 5, day, hour, 0, 30)
        .unwrap()
}

async fn harness(transport: ScriptedTransport, ids: &[i64]) -> Harness {
    let store = Arc::new(InMemoryKvStore::new());
    let gate = Arc::new(BroadcastGate::load(store.clone()).await.unwrap());
    let chats = Arc::new(SubscriberRegistry::load("chats", store.clone()).await.unwrap());
    for id in ids {
        chats
            .add_subscriber(Subscriber::new(*id, format!("chat {id}")))
            .await;
    }

    let book = Arc::new(AssetBook::new(vec![btc()], 3));
    book.record(&[(btc(), 10.0)]);
    book.record(&[(btc(), 20.0)]);
    book.record(&[(btc(), 30.0)]);
    book.record(&[(btc(), 25.0)]);

    let transport = Arc::new(transport);
    let scheduler = BroadcastScheduler::new(
        SchedulerConfig {
            target_hour: 6,
            ..SchedulerConfig::default()
        },
        gate.clone(),
        chats.clone(),
        book,
        transport.clone(),
    );

    Harness {
        store,
        gate,
        chats,
        transport,
        scheduler,
    }
}

#[tokio::test]
async fn scheduled_broadcast_reaches_everyone_and_advances_gate() {
    let h = harness(ScriptedTransport::default(), &[1, 2, 3]).await;
    let now = local(10, 6);

    let report = h.scheduler.evaluate(Trigger::Scheduled, now).await;

    assert!(report.fired);
    assert_eq!(report.delivered, 3);
    assert_eq!(h.transport.recipients().await, vec![1, 2, 3]);
    assert_eq!(h.gate.last_sent_at().await, Some(now.with_timezone(&Utc)));

    let stored = h.store.scan_all("send_date").await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn message_uses_latest_sample_and_window_median() {
    let h = harness(ScriptedTransport::default(), &[1]).await;

    h.scheduler.evaluate(Trigger::Forced, local(10, 12)).await;

    // window holds 20, 30, 25 -> median 25, latest 25
    let sent = h.transport.sent.lock().await;
    assert_eq!(sent[0].1, "BTC price is: 25.00$, Diff: 0.00%");
}

#[tokio::test]
async fn second_scheduled_pass_same_day_is_gated() {
    let h = harness(ScriptedTransport::default(), &[1]).await;

    assert!(h.scheduler.evaluate(Trigger::Scheduled, local(10, 6)).await.fired);
    let again = h
        .scheduler
        .evaluate(Trigger::Scheduled, local(10, 6) + chrono::Duration::minutes(1))
        .await;

    assert!(!again.fired);
    assert_eq!(h.transport.recipients().await, vec![1]);
}

#[tokio::test]
async fn next_day_at_target_hour_fires_again() {
    let h = harness(ScriptedTransport::default(), &[1]).await;

    h.scheduler.evaluate(Trigger::Scheduled, local(10, 6)).await;
    let next = h.scheduler.evaluate(Trigger::Scheduled, local(11, 6)).await;

    assert!(next.fired);
    assert_eq!(h.gate.last_sent_at().await, Some(local(11, 6).with_timezone(&Utc)));
}

#[tokio::test]
async fn wrong_hour_changes_nothing() {
    let h = harness(ScriptedTransport::default(), &[1]).await;

    let report = h.scheduler.evaluate(Trigger::Scheduled, local(10, 9)).await;

    assert!(!report.fired);
    assert!(h.transport.sent.lock().await.is_empty());
    assert_eq!(h.gate.last_sent_at().await, None);
}

#[tokio::test]
async fn forced_fires_anytime_and_leaves_gate_untouched() {
    let h = harness(ScriptedTransport::default(), &[1, 2]).await;
    h.scheduler.evaluate(Trigger::Scheduled, local(10, 6)).await;
    let before = h.gate.last_sent_at().await;

    let report = h.scheduler.evaluate(Trigger::Forced, local(10, 7)).await;

    assert!(report.fired);
    assert_eq!(report.delivered, 2);
    assert_eq!(h.gate.last_sent_at().await, before);
}

#[tokio::test]
async fn permanent_failure_prunes_only_that_subscriber() {
    let transport = ScriptedTransport::default().failing(2, chat_not_found());
    let h = harness(transport, &[1, 2, 3]).await;

    let report = h.scheduler.evaluate(Trigger::Scheduled, local(10, 6)).await;

    assert_eq!(report.pruned, vec![2]);
    assert_eq!(report.delivered, 2);
    assert_eq!(h.transport.recipients().await, vec![1, 3]);
    assert!(!h.chats.contains(2).await);
    assert_eq!(h.chats.len().await, 2);
    assert_eq!(h.store.get("chats", "2").await, None);
}

#[tokio::test]
async fn transient_failure_keeps_subscriber() {
    let transport = ScriptedTransport::default()
        .failing(1, too_many_requests())
        .failing(3, TransportError::Network("connection reset".into()));
    let h = harness(transport, &[1, 2, 3]).await;

    let report = h.scheduler.evaluate(Trigger::Scheduled, local(10, 6)).await;

    assert_eq!(report.transient_failures, 2);
    assert_eq!(report.delivered, 1);
    assert!(report.pruned.is_empty());
    assert_eq!(h.chats.len().await, 3);
    // the pass still counts as sent
    assert!(h.gate.last_sent_at().await.is_some());
}

#[tokio::test]
async fn slow_subscriber_does_not_block_others() {
    let transport = ScriptedTransport::default().slow(1, Duration::from_millis(200));
    let h = harness(transport, &[1, 2, 3, 4]).await;

    let report = h.scheduler.evaluate(Trigger::Forced, local(10, 6)).await;

    assert_eq!(report.delivered, 4);
    let order: Vec<_> = h.transport.sent.lock().await.iter().map(|(id, _)| *id).collect();
    assert_eq!(order.last(), Some(&1));
}

#[tokio::test]
async fn empty_registry_still_advances_gate() {
    let h = harness(ScriptedTransport::default(), &[]).await;

    let report = h.scheduler.evaluate(Trigger::Scheduled, local(10, 6)).await;

    assert!(report.fired);
    assert_eq!(report.delivered, 0);
    assert!(h.gate.last_sent_at().await.is_some());
}

#[tokio::test]
async fn nothing_to_render_skips_the_pass() {
    let store = Arc::new(InMemoryKvStore::new());
    let gate = Arc::new(BroadcastGate::load(store.clone()).await.unwrap());
    let chats = Arc::new(SubscriberRegistry::load("chats", store.clone()).await.unwrap());
    chats.add_subscriber(Subscriber::new(1, "one")).await;
    let transport = Arc::new(ScriptedTransport::default());

    let scheduler = BroadcastScheduler::new(
        SchedulerConfig::default(),
        gate.clone(),
        chats,
        Arc::new(AssetBook::new(vec![btc()], 3)),
        transport.clone(),
    );

    let report = scheduler.evaluate(Trigger::Scheduled, local(10, 6)).await;

    assert!(!report.fired);
    assert!(transport.sent.lock().await.is_empty());
    assert_eq!(gate.last_sent_at().await, None);
}

#[tokio::test]
async fn deliver_classifies_single_target() {
    let transport = ScriptedTransport::default().failing(7, chat_not_found());
    let h = harness(transport, &[7, 8]).await;

    let gone = h.scheduler.deliver(&Subscriber::new(7, "chat 7"), "hi").await;
    let ok = h.scheduler.deliver(&Subscriber::new(8, "chat 8"), "hi").await;

    assert_eq!(gone, DeliveryOutcome::Permanent);
    assert_eq!(ok, DeliveryOutcome::Delivered);
    assert_eq!(h.chats.list_subscribers().await, vec![Subscriber::new(8, "chat 8")]);
}
