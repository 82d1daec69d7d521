use async_trait::async_trait;
use thiserror::Error;

use subscribers::SubscriberId;

/// Failure reported by a messaging transport.
///
/// The transport only reports; `policy::classify` decides whether the
/// failure is permanent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The messaging API answered with an error.
    #[error("api error: {description}")]
    Api {
        code: Option<i64>,
        description: String,
    },

    /// The request never got a usable answer (timeout, connection, decode).
    #[error("network error: {0}")]
    Network(String),
}

/// Outbound channel to subscribers.
#[async_trait]
pub trait MessagingTransport: Send + Sync {
    async fn send(&self, chat_id: SubscriberId, text: &str) -> Result<(), TransportError>;
}
