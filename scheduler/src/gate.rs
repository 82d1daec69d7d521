//! Persisted "last broadcast" timestamp guarding the daily send.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, FixedOffset, Utc};
use common::logger::warn_if_slow;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use subscribers::store::KvStore;

use crate::eligibility::{Eligibility, check_gate};
use crate::types::{SchedulerConfig, Trigger};

pub const GATE_NAMESPACE: &str = "send_date";
pub const LAST_SENT_KEY: &str = "last_sent_at";

pub struct BroadcastGate {
    last_sent_at: Mutex<Option<DateTime<Utc>>>,
    store: Arc<dyn KvStore>,
}

impl BroadcastGate {
    /// Rehydrate from the store.
    ///
    /// A stored value that fails to parse is treated as "sent just now".
    pub async fn load(store: Arc<dyn KvStore>) -> anyhow::Result<Self> {
        let rows = store
            .scan_all(GATE_NAMESPACE)
            .await
            .context("failed to read broadcast gate")?;

        let last_sent_at = rows
            .into_iter()
            .find(|(k, _)| k == LAST_SENT_KEY)
            .map(|(_, v)| match DateTime::parse_from_rfc3339(v.trim()) {
                Ok(ts) => ts.with_timezone(&Utc),
                Err(e) => {
                    warn!(value = %v, error = %e, "unreadable last_sent_at; assuming sent now");
                    Utc::now()
                }
            });

        info!(last_sent_at = ?last_sent_at, "broadcast gate restored");

        Ok(Self {
            last_sent_at: Mutex::new(last_sent_at),
            store,
        })
    }

    pub async fn last_sent_at(&self) -> Option<DateTime<Utc>> {
        *self.last_sent_at.lock().await
    }

    pub async fn check(
        &self,
        trigger: Trigger,
        now: DateTime<FixedOffset>,
        cfg: &SchedulerConfig,
    ) -> Eligibility {
        let last = self.last_sent_at().await;
        check_gate(trigger, now, last, cfg)
    }

    /// Advance the gate to `sent_at`. Never moves it backwards.
    ///
    /// Returns `false` when `sent_at` is older than the current value.
    pub async fn record_sent(&self, sent_at: DateTime<Utc>) -> bool {
        {
            let mut guard = self.last_sent_at.lock().await;
            if matches!(*guard, Some(current) if current > sent_at) {
                debug!(%sent_at, "ignoring older broadcast timestamp");
                return false;
            }
            *guard = Some(sent_at);
        }

        let value = sent_at.to_rfc3339();
        let persisted = warn_if_slow("kv_put_gate", Duration::from_millis(100), async {
            self.store.put(GATE_NAMESPACE, LAST_SENT_KEY, &value).await
        })
        .await;

        match persisted {
            Ok(()) => info!(%sent_at, "broadcast gate advanced"),
            Err(e) => warn!(error = ?e, %sent_at, "broadcast gate advanced in memory only"),
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use subscribers::store::InMemoryKvStore;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn empty_store_means_never_sent() {
        let gate = BroadcastGate::load(Arc::new(InMemoryKvStore::new())).await.unwrap();
        assert_eq!(gate.last_sent_at().await, None);
    }

    #[tokio::test]
    async fn record_sent_persists_and_reloads() {
        let store = Arc::new(InMemoryKvStore::new());
        let gate = BroadcastGate::load(store.clone()).await.unwrap();

        assert!(gate.record_sent(ts(6)).await);

        let reloaded = BroadcastGate::load(store.clone()).await.unwrap();
        assert_eq!(reloaded.last_sent_at().await, Some(ts(6)));
    }

    #[tokio::test]
    async fn never_moves_backwards() {
        let store = Arc::new(InMemoryKvStore::new());
        let gate = BroadcastGate::load(store.clone()).await.unwrap();

        gate.record_sent(ts(6)).await;
        assert!(!gate.record_sent(ts(6) - ChronoDuration::hours(1)).await);

        assert_eq!(gate.last_sent_at().await, Some(ts(6)));
        let stored = store.get(GATE_NAMESPACE, LAST_SENT_KEY).await.unwrap();
        assert_eq!(DateTime::parse_from_rfc3339(&stored).unwrap(), ts(6));
    }

    #[tokio::test]
    async fn corrupt_value_blocks_the_next_day() {
        let store = Arc::new(InMemoryKvStore::new());
        store
            .put(GATE_NAMESPACE, LAST_SENT_KEY, "Tue Jan  2 06:00:00 UTC 2024")
            .await
            .unwrap();

        let before = Utc::now();
        let gate = BroadcastGate::load(store).await.unwrap();
        let last = gate.last_sent_at().await.unwrap();
        assert!(last >= before);
    }
}
