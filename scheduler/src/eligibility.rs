//! Decides whether a broadcast may fire right now.
//
//  This module is deliberately pure: no async, no IO.

use chrono::{DateTime, FixedOffset, Timelike, Utc};

use super::types::{SchedulerConfig, Trigger};

/// Result of a gate check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Eligibility {
    /// Operator request; gate bypassed.
    Forced,
    /// Target hour reached and the last broadcast is old enough.
    Due,
    /// Not the configured hour yet.
    WrongHour { hour: u32 },
    /// Already broadcast within the minimum spacing.
    SentRecently { hours_since: f64 },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Forced | Eligibility::Due)
    }
}

/// Fractional hours between `last_sent_at` and `now`.
///
/// `None` (never sent) counts as infinitely long ago.
pub fn hours_since(last_sent_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    match last_sent_at {
        Some(last) => (now - last).num_milliseconds() as f64 / 3_600_000.0,
        None => f64::INFINITY,
    }
}

/// `eligible = forced OR (hour(now) == target_hour AND hours_since(last) > min_hours_between)`
///
/// `now` carries the local offset the target hour is expressed in.
pub fn check_gate(
    trigger: Trigger,
    now: DateTime<FixedOffset>,
    last_sent_at: Option<DateTime<Utc>>,
    cfg: &SchedulerConfig,
) -> Eligibility {
    if trigger.is_forced() {
        return Eligibility::Forced;
    }

    let hour = now.hour();
    if hour != cfg.target_hour {
        return Eligibility::WrongHour { hour };
    }

    let elapsed = hours_since(last_sent_at, now.with_timezone(&Utc));
    if elapsed > cfg.min_hours_between {
        Eligibility::Due
    } else {
        Eligibility::SentRecently {
            hours_since: elapsed,
        }
    }
}
