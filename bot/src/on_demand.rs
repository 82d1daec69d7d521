//! Ad-hoc "send now" requests.
//!
//! Each request gets a fresh price (independent of the poller), is compared
//! against the current medians and answered to the requester only. The
//! broadcast gate is never consulted nor advanced.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{Instrument, info, warn};

use common::logger::{TraceId, root_span};
use common::shutdown::Shutdown;
use market::{Asset, AssetBook, PriceSource, fetch_all};
use scheduler::message::render_update;
use scheduler::{BroadcastScheduler, DeliveryOutcome};
use subscribers::Subscriber;

#[derive(Debug, Clone)]
pub struct OnDemandRequest {
    pub subscriber: Subscriber,
}

pub struct OnDemandWorker {
    source: Arc<dyn PriceSource>,
    book: Arc<AssetBook>,
    scheduler: Arc<BroadcastScheduler>,
}

impl OnDemandWorker {
    pub fn new(
        source: Arc<dyn PriceSource>,
        book: Arc<AssetBook>,
        scheduler: Arc<BroadcastScheduler>,
    ) -> Self {
        Self {
            source,
            book,
            scheduler,
        }
    }

    /// Serves one request. `None` when the fresh fetch failed and nothing
    /// was sent.
    pub async fn handle(&self, req: OnDemandRequest) -> Option<DeliveryOutcome> {
        let trace_id = TraceId::new();
        let span = root_span("on_demand", &trace_id);
        span.record("subscriber_id", req.subscriber.id);

        async {
            let assets: Vec<Asset> = self.book.assets().cloned().collect();
            let prices = match fetch_all(self.source.as_ref(), assets.iter()).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "fresh price fetch failed; request dropped");
                    return None;
                }
            };

            let text = render_update(&self.book.quotes(&prices));
            let outcome = self.scheduler.deliver(&req.subscriber, &text).await;

            info!(?outcome, "on-demand update handled");
            Some(outcome)
        }
        .instrument(span)
        .await
    }

    /// Drains `rx` until shutdown or until every sender is gone.
    pub async fn run(self, mut rx: mpsc::Receiver<OnDemandRequest>, shutdown: Shutdown) {
        let stop = shutdown.wait();
        tokio::pin!(stop);

        info!("on-demand worker started");

        loop {
            tokio::select! {
                _ = &mut stop => break,
                next = rx.recv() => match next {
                    Some(req) => {
                        self.handle(req).await;
                    }
                    None => break,
                },
            }
        }

        info!("on-demand worker stopped");
    }
}
