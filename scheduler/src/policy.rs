//! Delivery classification: decides whether a failed send means the
//! subscriber is gone for good.

use crate::transport::TransportError;
use crate::types::DeliveryOutcome;

/// API descriptions (lower-case substrings) that mean the target will never
/// accept a message again.
const PERMANENT_MARKERS: &[&str] = &[
    "chat not found",
    "no such user",
    "user not found",
    "bot was blocked by the user",
    "user is deactivated",
    "bot was kicked from the",
    "group chat was deleted",
    "have no rights to send a message",
];

/// HTTP-style code for "forbidden": the bot may not write to this chat.
const FORBIDDEN: i64 = 403;

pub fn classify(result: &Result<(), TransportError>) -> DeliveryOutcome {
    match result {
        Ok(()) => DeliveryOutcome::Delivered,
        Err(err) if is_permanent(err) => DeliveryOutcome::Permanent,
        Err(_) => DeliveryOutcome::Transient,
    }
}

pub fn is_permanent(err: &TransportError) -> bool {
    match err {
        TransportError::Api { code, description } => {
            if *code == Some(FORBIDDEN) {
                return true;
            }
            let description = description.to_lowercase();
            PERMANENT_MARKERS.iter().any(|m| description.contains(m))
        }
        TransportError::Network(_) => false,
    }
}
