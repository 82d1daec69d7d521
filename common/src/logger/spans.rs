use tracing::{Span, field};

use super::TraceId;

/// Root span for one unit of work (a broadcast pass, an on-demand request).
///
/// `subscriber_id` is left empty so callers can record it once known.
pub fn root_span(name: &'static str, trace_id: &TraceId) -> Span {
    tracing::info_span!(
        "root",
        name = %name,
        trace_id = %trace_id,
        subscriber_id = field::Empty
    )
}

pub fn child_span(name: &'static str) -> Span {
    tracing::info_span!("child", name = %name, subscriber_id = field::Empty)
}
