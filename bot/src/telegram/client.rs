use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use scheduler::{MessagingTransport, TransportError};
use subscribers::SubscriberId;

use super::types::{ApiResponse, GetUpdates, SendMessage, Update};

/// Minimal Telegram Bot API client: `sendMessage` and `getUpdates`.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    /// `{api}/bot{token}`; never logged.
    base: String,
    request_timeout: Duration,
}

impl TelegramClient {
    /// `request_timeout` bounds ordinary calls; long polls add their own
    /// server-side wait on top of it.
    pub fn new(
        api_url: &str,
        token: &str,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(network)?;

        Ok(Self {
            http,
            base: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
            request_timeout,
        })
    }

    #[instrument(skip(self, text), level = "debug")]
    pub async fn send_message(&self, chat_id: SubscriberId, text: &str) -> Result<(), TransportError> {
        let _: serde_json::Value = self
            .call("sendMessage", &SendMessage { chat_id, text }, self.request_timeout)
            .await?;
        debug!("message accepted");
        Ok(())
    }

    /// Long-polls for updates after `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        long_poll: Duration,
    ) -> Result<Vec<Update>, TransportError> {
        let body = GetUpdates {
            offset,
            timeout: long_poll.as_secs(),
            allowed_updates: ["message"],
        };
        self.call("getUpdates", &body, self.request_timeout + long_poll)
            .await
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Duration) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .http
            .post(format!("{}/{}", self.base, method))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(network)?;

        let status = resp.status();
        let envelope: ApiResponse<T> = resp.json().await.map_err(|e| {
            TransportError::Network(format!("{method}: undecodable response (http {status}): {}", e.without_url()))
        })?;

        into_result(envelope)
    }
}

/// Maps the API envelope onto the transport error model.
pub fn into_result<T>(envelope: ApiResponse<T>) -> Result<T, TransportError> {
    match envelope {
        ApiResponse {
            ok: true,
            result: Some(result),
            ..
        } => Ok(result),
        ApiResponse {
            ok: true,
            result: None,
            ..
        } => Err(TransportError::Network("ok response without result".into())),
        ApiResponse {
            description,
            error_code,
            ..
        } => Err(TransportError::Api {
            code: error_code,
            description: description.unwrap_or_else(|| "unknown error".into()),
        }),
    }
}

/// reqwest errors carry the request URL, which embeds the bot token.
fn network(e: reqwest::Error) -> TransportError {
    TransportError::Network(e.without_url().to_string())
}

#[async_trait]
impl MessagingTransport for TelegramClient {
    async fn send(&self, chat_id: SubscriberId, text: &str) -> Result<(), TransportError> {
        self.send_message(chat_id, text).await
    }
}
