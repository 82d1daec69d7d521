//! Shared types used by the broadcast subsystem.

use subscribers::SubscriberId;

/// Configuration knobs for scheduled broadcasts.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Local hour of day (0..=23) at which the daily broadcast may fire.
    pub target_hour: u32,

    /// A scheduled broadcast fires only when strictly more than this many
    /// hours passed since the last one.
    pub min_hours_between: f64,

    /// Upper bound on deliveries in flight during one pass.
    pub delivery_concurrency: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            target_hour: 6,
            min_hours_between: 23.0,
            delivery_concurrency: 8,
        }
    }
}

/// What asked for a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Poller tick; subject to the gate and advances it.
    Scheduled,
    /// Operator request; bypasses the gate and never advances it.
    Forced,
}

impl Trigger {
    pub fn is_forced(&self) -> bool {
        matches!(self, Trigger::Forced)
    }
}

/// Classified result of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Failed for a reason that may go away; subscriber kept.
    Transient,
    /// Target no longer exists or refuses the bot; subscriber pruned.
    Permanent,
}

/// Summary of one `evaluate` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub fired: bool,
    pub delivered: usize,
    pub transient_failures: usize,
    /// Ids removed from the registry during this pass.
    pub pruned: Vec<SubscriberId>,
}

impl BroadcastReport {
    pub fn skipped() -> Self {
        Self::default()
    }
}
