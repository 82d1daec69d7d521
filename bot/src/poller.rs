//! Price poller
//!
//! Samples every tracked asset on a fixed cadence, feeds the samples into
//! the asset book and lets the broadcast scheduler decide whether today's
//! message is due.
//!
//! Data flow:
//! PriceSource → Poller → AssetBook → BroadcastScheduler

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use common::shutdown::Shutdown;
use market::{Asset, AssetBook, PriceSource, SourceError, fetch_all};
use scheduler::{BroadcastReport, BroadcastScheduler, Trigger};

use crate::time::now_local;

pub struct PricePoller {
    source: Arc<dyn PriceSource>,
    book: Arc<AssetBook>,
    scheduler: Arc<BroadcastScheduler>,
    poll_every: Duration,
}

impl PricePoller {
    pub fn new(
        source: Arc<dyn PriceSource>,
        book: Arc<AssetBook>,
        scheduler: Arc<BroadcastScheduler>,
        poll_every: Duration,
    ) -> Self {
        Self {
            source,
            book,
            scheduler,
            poll_every,
        }
    }

    /// One cycle: fetch every asset, record, evaluate the scheduled gate.
    ///
    /// Any fetch error (or a zero price) skips the cycle with the book and
    /// the gate untouched.
    pub async fn poll_once(
        &self,
        now: DateTime<FixedOffset>,
    ) -> Result<BroadcastReport, SourceError> {
        let assets: Vec<Asset> = self.book.assets().cloned().collect();
        let prices = fetch_all(self.source.as_ref(), assets.iter()).await?;

        self.book.record(&prices);

        for q in self.book.quotes(&prices) {
            debug!(
                asset = %q.asset,
                price = q.price,
                median = ?q.median,
                deviation_pct = ?q.deviation_pct(),
                "sample recorded"
            );
        }

        Ok(self.scheduler.evaluate(Trigger::Scheduled, now).await)
    }

    /// Runs until `shutdown` fires. Shutdown is only checked between cycles,
    /// so a broadcast pass in flight always completes and records the gate.
    pub async fn run(self, shutdown: Shutdown) {
        let mut ticker = interval(self.poll_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let stop = shutdown.wait();
        tokio::pin!(stop);

        info!(
            every_ms = self.poll_every.as_millis() as u64,
            assets = self.book.assets().count(),
            "price poller started"
        );

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => {}
            }

            match self.poll_once(now_local()).await {
                Ok(report) if report.fired => info!(
                    delivered = report.delivered,
                    pruned = report.pruned.len(),
                    "scheduled broadcast sent"
                ),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "price fetch failed; cycle skipped"),
            }
        }

        info!("price poller stopped");
    }
}
