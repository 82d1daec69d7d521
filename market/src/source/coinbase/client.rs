use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::types::PriceEnvelope;
use crate::source::{PriceSource, SourceError};
use crate::types::Asset;

/// Coinbase v2 spot-price client.
#[derive(Clone)]
pub struct CoinbaseClient {
    http: Client,
    url: String,
}

impl CoinbaseClient {
    /// `timeout` bounds every request.
    pub fn new(url: String, timeout: Duration) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
        })
    }

    fn price_url(&self, asset: &Asset) -> String {
        format!("{}/prices/{}/buy", self.url, asset.id())
    }
}

/// Extracts a positive-or-zero price from a decoded envelope.
pub fn parse_envelope(envelope: PriceEnvelope) -> Result<f64, SourceError> {
    let amount: f64 = envelope.data.amount.trim().parse()?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(SourceError::InvalidResponse(format!(
            "amount out of range: {}",
            envelope.data.amount
        )));
    }
    Ok(amount)
}

#[async_trait]
impl PriceSource for CoinbaseClient {
    #[instrument(skip(self, asset), fields(asset = %asset), level = "debug")]
    async fn fetch(&self, asset: &Asset) -> Result<f64, SourceError> {
        let resp = self
            .http
            .get(self.price_url(asset))
            .send()
            .await?
            .error_for_status()?;

        let envelope: PriceEnvelope = resp.json().await?;

        debug!(
            base = %envelope.data.base,
            currency = %envelope.data.currency,
            amount = %envelope.data.amount,
            "spot price fetched"
        );

        parse_envelope(envelope)
    }
}
