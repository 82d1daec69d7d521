//! The broadcast engine.
//!
//! For each trigger it:
//!   1. Asks the gate whether a broadcast may fire.
//!   2. Renders one message from every asset's latest sample and median.
//!   3. Fans the message out to a snapshot of the chat registry.
//!   4. Prunes subscribers whose delivery failed permanently.
//!   5. Advances the gate, for scheduled triggers only.
//!
//! Deliveries are independent: a failing or slow subscriber never aborts the
//! rest of the pass.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use common::logger::{TraceId, child_span, root_span};
use futures::{StreamExt, stream};
use tracing::{Instrument, debug, info, instrument, warn};

use market::AssetBook;
use subscribers::{Subscriber, SubscriberId, SubscriberRegistry};

use crate::gate::BroadcastGate;
use crate::message::render_update;
use crate::policy::classify;
use crate::transport::MessagingTransport;
use crate::types::{BroadcastReport, DeliveryOutcome, SchedulerConfig, Trigger};

pub struct BroadcastScheduler {
    cfg: SchedulerConfig,
    gate: Arc<BroadcastGate>,
    chats: Arc<SubscriberRegistry>,
    book: Arc<AssetBook>,
    transport: Arc<dyn MessagingTransport>,
}

impl BroadcastScheduler {
    pub fn new(
        cfg: SchedulerConfig,
        gate: Arc<BroadcastGate>,
        chats: Arc<SubscriberRegistry>,
        book: Arc<AssetBook>,
        transport: Arc<dyn MessagingTransport>,
    ) -> Self {
        Self {
            cfg,
            gate,
            chats,
            book,
            transport,
        }
    }

    /// Runs one gate check and, when eligible, a full broadcast pass.
    ///
    /// `now` carries the local offset the target hour is expressed in.
    #[instrument(skip(self, now), target = "scheduler")]
    pub async fn evaluate(&self, trigger: Trigger, now: DateTime<FixedOffset>) -> BroadcastReport {
        let eligibility = self.gate.check(trigger, now, &self.cfg).await;
        if !eligibility.is_eligible() {
            debug!(?eligibility, "broadcast not due");
            return BroadcastReport::skipped();
        }

        let quotes = self.book.latest_quotes();
        if quotes.is_empty() {
            warn!("no price samples yet; nothing to broadcast");
            return BroadcastReport::skipped();
        }

        let text = render_update(&quotes);
        let trace_id = TraceId::new();

        let report = self
            .fan_out(&text)
            .instrument(root_span("broadcast", &trace_id))
            .await;

        if !trigger.is_forced() {
            self.gate.record_sent(now.with_timezone(&Utc)).await;
        }

        info!(
            trace_id = %trace_id,
            delivered = report.delivered,
            transient_failures = report.transient_failures,
            pruned = report.pruned.len(),
            "broadcast pass complete"
        );

        report
    }

    /// Sends `text` to one subscriber and applies the pruning rule.
    ///
    /// Shared by broadcast passes and on-demand replies.
    pub async fn deliver(&self, subscriber: &Subscriber, text: &str) -> DeliveryOutcome {
        let result = self.transport.send(subscriber.id, text).await;
        let outcome = classify(&result);

        match (&result, outcome) {
            (Ok(()), _) => {
                debug!(subscriber_id = subscriber.id, "delivered");
            }
            (Err(e), DeliveryOutcome::Permanent) => {
                warn!(
                    subscriber_id = subscriber.id,
                    display_name = %subscriber.display_name,
                    error = %e,
                    "subscriber unreachable; pruning"
                );
                self.chats.remove_subscriber(subscriber.id).await;
            }
            (Err(e), _) => {
                warn!(subscriber_id = subscriber.id, error = %e, "delivery failed; will retry next pass");
            }
        }

        outcome
    }

    async fn fan_out(&self, text: &str) -> BroadcastReport {
        let targets = self.chats.list_subscribers().await;
        let concurrency = self.cfg.delivery_concurrency.max(1);

        debug!(targets = targets.len(), concurrency, "fanning out");

        let outcomes: Vec<(SubscriberId, DeliveryOutcome)> = stream::iter(targets)
            .map(|s| {
                let span = child_span("deliver");
                span.record("subscriber_id", s.id);
                async move {
                    let outcome = self.deliver(&s, text).await;
                    (s.id, outcome)
                }
                .instrument(span)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut report = BroadcastReport {
            fired: true,
            ..BroadcastReport::default()
        };

        for (id, outcome) in outcomes {
            match outcome {
                DeliveryOutcome::Delivered => report.delivered += 1,
                DeliveryOutcome::Transient => report.transient_failures += 1,
                DeliveryOutcome::Permanent => report.pruned.push(id),
            }
        }
        report.pruned.sort_unstable();

        report
    }
}
