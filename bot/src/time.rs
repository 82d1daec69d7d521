use chrono::{DateTime, FixedOffset, Local};

/// Wall-clock time in the host's local offset; the broadcast hour is local.
pub fn now_local() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}
